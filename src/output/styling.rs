use std::fmt::Display;

use console::{style, StyledObject};

/// In-flight work, warnings and the values worth a second look.
pub fn attention(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn success(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn failure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

/// Names the user typed or will need to copy: orgs, paths.
pub fn highlight(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn brand(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
