//! Output formatting for query results
//!
//! Supports multiple output formats:
//! - Table: Pretty-printed ASCII table (default)
//! - CSV: Comma-separated values
//! - Vertical: One column per line (useful for wide results)

use crate::table::Table;
use crate::value::Value;
use std::io::{self, Write};

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed ASCII table
    #[default]
    Table,
    /// Comma-separated values
    Csv,
    /// Vertical format (one column per line)
    Vertical,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" | "t" => Some(Self::Table),
            "csv" | "c" => Some(Self::Csv),
            "vertical" | "v" => Some(Self::Vertical),
            _ => None,
        }
    }

    /// Get format name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Csv => "csv",
            Self::Vertical => "vertical",
        }
    }

    /// Get all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &["table", "csv", "vertical"]
    }
}

/// Formatter for outputting query results in various formats
pub struct OutputFormatter {
    format: OutputFormat,
    max_rows: Option<usize>,
}

impl OutputFormatter {
    /// Create a new formatter with the given format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            max_rows: None,
        }
    }

    /// Set maximum rows to display
    pub fn with_max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    /// Get the current format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Set the format
    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// Format a result table and write to stdout
    pub fn print(&self, table: &Table) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.write(&mut stdout, table)
    }

    /// Format a result table and write to the given writer
    pub fn write<W: Write>(&self, writer: &mut W, table: &Table) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(writer, table),
            OutputFormat::Csv => self.write_csv(writer, table),
            OutputFormat::Vertical => self.write_vertical(writer, table),
        }
    }

    /// Format as string
    pub fn format_to_string(&self, table: &Table) -> String {
        let mut buffer = Vec::new();
        let _ = self.write(&mut buffer, table);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn shown_rows(&self, table: &Table) -> usize {
        match self.max_rows {
            Some(max) => table.row_count().min(max),
            None => table.row_count(),
        }
    }

    /// Write as pretty-printed table
    fn write_table<W: Write>(&self, writer: &mut W, table: &Table) -> io::Result<()> {
        let headers = table.schema().column_names();
        let shown = self.shown_rows(table);

        // Column widths over the header and every shown row
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &table.rows()[..shown] {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(display_value(value).len());
            }
        }

        let border: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .chain(std::iter::once("+".to_string()))
            .collect();

        writeln!(writer, "{}", border)?;
        for (i, header) in headers.iter().enumerate() {
            write!(writer, "| {:width$} ", header, width = widths[i])?;
        }
        writeln!(writer, "|")?;
        writeln!(writer, "{}", border)?;

        for row in &table.rows()[..shown] {
            for (i, value) in row.iter().enumerate() {
                write!(writer, "| {:width$} ", display_value(value), width = widths[i])?;
            }
            writeln!(writer, "|")?;
        }
        writeln!(writer, "{}", border)?;

        if shown < table.row_count() {
            writeln!(writer, "... ({} more rows)", table.row_count() - shown)?;
        }
        Ok(())
    }

    /// Write as CSV
    fn write_csv<W: Write>(&self, writer: &mut W, table: &Table) -> io::Result<()> {
        writeln!(writer, "{}", table.schema().column_names().join(","))?;

        let shown = self.shown_rows(table);
        for row in &table.rows()[..shown] {
            let values: Vec<String> = row.iter().map(csv_value).collect();
            writeln!(writer, "{}", values.join(","))?;
        }
        Ok(())
    }

    /// Write in vertical format (one column per line)
    fn write_vertical<W: Write>(&self, writer: &mut W, table: &Table) -> io::Result<()> {
        let headers = table.schema().column_names();
        let max_name_len = headers.iter().map(|n| n.len()).max().unwrap_or(0);

        let shown = self.shown_rows(table);
        for (row_count, row) in table.rows()[..shown].iter().enumerate() {
            writeln!(
                writer,
                "*************************** {} ***************************",
                row_count + 1
            )?;
            for (i, header) in headers.iter().enumerate() {
                writeln!(
                    writer,
                    "{:>width$}: {}",
                    header,
                    display_value(&row[i]),
                    width = max_name_len
                )?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Format a single value for display
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

/// Format a single value for CSV output. Nulls become empty fields, values
/// containing a comma, quote or newline are quoted.
fn csv_value(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    let value = value.to_string();
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::value::SchemaType;

    fn create_test_table() -> Table {
        Table::new(
            Schema::new(
                "t",
                vec![
                    ("id".to_string(), SchemaType::Int),
                    ("name".to_string(), SchemaType::Varchar),
                    ("score".to_string(), SchemaType::Float),
                ],
            ),
            vec![
                vec![
                    Value::Int(1),
                    Value::Varchar("Alice".to_string()),
                    Value::float(95.5),
                ],
                vec![
                    Value::Int(2),
                    Value::Varchar("Bob".to_string()),
                    Value::float(87.0),
                ],
                vec![Value::Int(3), Value::Null, Value::float(92.3)],
            ],
        )
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("t"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::parse("c"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::parse("vertical"), Some(OutputFormat::Vertical));
        assert_eq!(OutputFormat::parse("v"), Some(OutputFormat::Vertical));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    #[test]
    fn test_csv_output() {
        let formatter = OutputFormatter::new(OutputFormat::Csv);
        let output = formatter.format_to_string(&create_test_table());

        assert!(output.contains("t.id,t.name,t.score"));
        assert!(output.contains("1,Alice,95.5"));
        assert!(output.contains("2,Bob,87"));
        assert!(output.contains("3,,92.3")); // NULL becomes empty
    }

    #[test]
    fn test_csv_quoting() {
        let table = Table::new(
            Schema::new("t", vec![("text".to_string(), SchemaType::Varchar)]),
            vec![
                vec![Value::Varchar("hello, world".to_string())],
                vec![Value::Varchar("say \"hi\"".to_string())],
                vec![Value::Varchar("normal".to_string())],
            ],
        );

        let formatter = OutputFormatter::new(OutputFormat::Csv);
        let output = formatter.format_to_string(&table);

        assert!(output.contains("\"hello, world\"")); // Quoted due to comma
        assert!(output.contains("\"say \"\"hi\"\"\"")); // Escaped quotes
        assert!(output.contains("\nnormal\n")); // Not quoted
    }

    #[test]
    fn test_vertical_output() {
        let formatter = OutputFormatter::new(OutputFormat::Vertical);
        let output = formatter.format_to_string(&create_test_table());

        assert!(output.contains("*** 1 ***"));
        assert!(output.contains("*** 3 ***"));
        assert!(output.contains("t.id: 1"));
        assert!(output.contains("t.name: Alice"));
        assert!(output.contains("t.name: NULL"));
    }

    #[test]
    fn test_table_output() {
        let formatter = OutputFormatter::new(OutputFormat::Table);
        let output = formatter.format_to_string(&create_test_table());

        assert!(output.contains("+"));
        assert!(output.contains("t.id"));
        assert!(output.contains("Alice"));
        assert!(output.contains("NULL"));
    }

    #[test]
    fn test_max_rows() {
        let formatter = OutputFormatter::new(OutputFormat::Csv).with_max_rows(2);
        let output = formatter.format_to_string(&create_test_table());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 data rows

        let formatter = OutputFormatter::new(OutputFormat::Table).with_max_rows(2);
        let output = formatter.format_to_string(&create_test_table());
        assert!(output.contains("... (1 more rows)"));
    }

    #[test]
    fn test_empty_table() {
        let formatter = OutputFormatter::new(OutputFormat::Csv);
        let table = Table::new(
            Schema::new("t", vec![("id".to_string(), SchemaType::Int)]),
            Vec::new(),
        );
        let output = formatter.format_to_string(&table);
        assert_eq!(output, "t.id\n");
    }

    #[test]
    fn test_set_format() {
        let mut formatter = OutputFormatter::new(OutputFormat::Table);
        assert_eq!(formatter.format(), OutputFormat::Table);

        formatter.set_format(OutputFormat::Csv);
        assert_eq!(formatter.format(), OutputFormat::Csv);
    }
}
