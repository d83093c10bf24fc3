//! Plain-text tables for command output.

use std::fmt;

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Short rows are padded with empty cells.
    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(&format!("{cell:<width$}"));
    }
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_row(f, &self.header, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(f, &rule, &widths)?;
        for row in &self.rows {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

/// Two-column `field  value` listing for a single object.
pub fn detail_table<'a>(fields: impl IntoIterator<Item = (&'a str, String)>) -> Table {
    let mut table = Table::new(["Field", "Value"]);
    for (field, value) in fields {
        table.push([field.to_string(), value]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_aligned() {
        let mut table = Table::new(["Name", "Port"]);
        table.push(["machine-learning", "5433"]);
        table.push(["ml", "5434"]);
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Name              Port");
        assert_eq!(lines[1], "----------------  ----");
        assert_eq!(lines[2], "machine-learning  5433");
        assert_eq!(lines[3], "ml                5434");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(["A", "B"]);
        table.push(["x"]);
        assert_eq!(table.to_string().lines().nth(2), Some("x"));
    }

    #[test]
    fn test_detail_table() {
        let table = detail_table([("Id", "abc".to_string()), ("Status", "PENDING".to_string())]);
        let rendered = table.to_string();
        assert!(rendered.contains("Id      abc"));
        assert!(rendered.contains("Status  PENDING"));
        assert!(!table.is_empty());
    }
}
