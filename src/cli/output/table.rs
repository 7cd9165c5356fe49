//! Table output using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{Decision, Outcome};

/// Table with UTF-8 borders, bold headers and dynamic width.
pub fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

pub fn outcome_cell(outcome: Outcome) -> Cell {
    let cell = Cell::new(outcome.as_str());
    if !supports_color() {
        return cell;
    }
    match outcome {
        Outcome::MutualInterest | Outcome::InterestedNextSteps => cell.fg(Color::Green),
        Outcome::NeedsMoreInfo | Outcome::FollowUpLater => cell.fg(Color::Yellow),
        Outcome::NotAFit => cell.fg(Color::Red),
    }
}

pub fn decision_cell(decision: Decision) -> Cell {
    let cell = Cell::new(decision.as_str());
    if !supports_color() {
        return cell;
    }
    match decision {
        Decision::Proceed => cell.fg(Color::Green),
        Decision::MoreInfo => cell.fg(Color::Yellow),
        Decision::NotAFit => cell.fg(Color::Red),
    }
}

/// Honour `NO_COLOR`.
fn supports_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_table_renders_headers() {
        let mut table = base_table(&["ID", "Score"]);
        table.add_row(vec!["p1", "0.91"]);
        let rendered = table.to_string();
        assert!(rendered.contains("ID"));
        assert!(rendered.contains("0.91"));
    }
}
