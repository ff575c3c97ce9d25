use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Green when the organization can have its pipelines rewired, yellow otherwise.
pub fn integration_cell(service_connection: Option<&str>) -> Cell {
    match service_connection {
        Some(id) => Cell::new(id).fg(TableColor::Green),
        None => Cell::new("none").fg(TableColor::Yellow),
    }
}

pub fn count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count).fg(TableColor::DarkGrey)
    } else {
        Cell::new(count)
    }
}
