mod client;
mod types;


pub use client::{AdoInventory, DEFAULT_SERVER_URL};
