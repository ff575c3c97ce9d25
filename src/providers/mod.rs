pub mod ado;
pub mod github;
