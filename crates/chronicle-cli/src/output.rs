// Output formatting for CLI

use serde::Serialize;

use chronicle_core::{Event, GroupKind};

#[derive(Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value).unwrap());
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value).unwrap());
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// One timeline line: timestamp, type, and a compact payload rendering
pub fn print_event(event: &Event) {
    let payload = if event.payload.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&event.payload).unwrap_or_default()
    };
    println!(
        "{}  {:<20} {}",
        event.created_on.format("%Y-%m-%d %H:%M:%S%.6f"),
        event.event_type,
        payload
    );
}

pub fn kind_label(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Conversation => "conversation",
        GroupKind::Flow => "flow",
        GroupKind::Ticket => "ticket",
        GroupKind::Verbose => "verbose",
    }
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header);
}

/// Print a table row
pub fn print_table_row(values: &[(&str, usize)]) {
    let row: String = values
        .iter()
        .map(|(val, width)| format!("{:<width$}", fit(val, *width), width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row);
}

/// Truncate a cell value to its column width with an ellipsis,
/// counting characters so a multibyte value never splits mid-char
fn fit(val: &str, width: usize) -> String {
    if val.chars().count() > width {
        let cut: String = val.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        val.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_leaves_short_values_alone() {
        assert_eq!(fit("open", 8), "open");
        assert_eq!(fit("12345678", 8), "12345678");
    }

    #[test]
    fn fit_truncates_long_values_with_ellipsis() {
        assert_eq!(fit("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn fit_truncates_multibyte_values_on_char_boundaries() {
        assert_eq!(fit("éééééééééé", 8), "ééééé...");
        assert_eq!(fit("日本語の名前です", 6), "日本語...");
    }
}
