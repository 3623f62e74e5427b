//! Table formatting and stdout helpers for CLI output.

use std::io::Write;

use comfy_table::{ContentArrangement, Table};

use crate::error::CliError;

/// Create a plain table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Create a GitHub-flavoured Markdown table.
pub fn markdown_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::ASCII_MARKDOWN);
    table.set_header(headers);
    table
}

/// Escape a cell for a Markdown table.
pub fn markdown_cell(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!("`{}`", text.replace('|', "\\|"))
}

/// Write `text` to stdout, newline-terminated. Failures are system errors.
pub fn print(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table_has_separator_row() {
        let mut table = markdown_table(&["Key", "Value"]);
        table.add_row(vec!["a", "b"]);
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('|'));
        assert!(lines[1].contains("---"));
    }

    #[test]
    fn test_markdown_cell() {
        assert_eq!(markdown_cell(""), "");
        assert_eq!(markdown_cell("a|b"), "`a\\|b`");
    }
}
