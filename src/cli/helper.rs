//! REPL helper providing completion, highlighting, and hints

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Keywords of the query language, for completion and highlighting
pub const KEYWORDS: &[&str] = &[
    // Operators
    "pi",
    "sigma",
    "gamma",
    "tau",
    "explain",
    "distinct",
    "aggregate",
    "as",
    // Joins
    "join",
    "left",
    "cross",
    "natural",
    "hash",
    "merge",
    // Set operations
    "union",
    "intersect",
    "except",
    // Predicates
    "and",
    "or",
    "null",
];

/// Dot commands for the REPL
pub const DOT_COMMANDS: &[&str] = &[
    ".help", ".h", ".quit", ".exit", ".q", ".tables", ".schema", ".index", ".optimize",
];

const AGGREGATE_FUNCTIONS: &[&str] = &["sum", "avg", "min", "max", "count"];

/// REPL helper that provides completion, highlighting, and hints
#[derive(Clone)]
pub struct ReplHelper {
    /// Known table names (updated dynamically)
    tables: Arc<RwLock<HashSet<String>>>,
    /// Known column names per table (updated dynamically)
    columns: Arc<RwLock<HashMap<String, Vec<String>>>>,
    /// Whether to enable syntax highlighting
    highlighting_enabled: bool,
}

impl ReplHelper {
    /// Create a new REPL helper
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashSet::new())),
            columns: Arc::new(RwLock::new(HashMap::new())),
            highlighting_enabled: true,
        }
    }

    /// Register a table for completion
    pub fn register_table(&self, name: &str, columns: Vec<String>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(name.to_string());
        }
        if let Ok(mut cols) = self.columns.write() {
            cols.insert(name.to_string(), columns);
        }
    }

    /// Get all known completions for the current context
    fn get_completions(&self, word: &str, line: &str) -> Vec<Pair> {
        let mut completions = Vec::new();

        // Dot commands only at start of line
        if line.trim_start().starts_with('.') {
            for cmd in DOT_COMMANDS {
                if cmd.starts_with(word) {
                    completions.push(Pair {
                        display: cmd.to_string(),
                        replacement: cmd.to_string(),
                    });
                }
            }
            return completions;
        }

        for &kw in KEYWORDS {
            if kw.starts_with(word) {
                completions.push(Pair {
                    display: kw.to_string(),
                    replacement: kw.to_string(),
                });
            }
        }

        // Relations can appear anywhere an operand is expected, so table
        // names are always candidates.
        if let Ok(tables) = self.tables.read() {
            for table in tables.iter() {
                if table.starts_with(word) {
                    completions.push(Pair {
                        display: table.clone(),
                        replacement: table.clone(),
                    });
                }
            }
        }

        // Column names from the tables mentioned so far
        let tables_in_query = self.extract_tables_from_query(line);
        if let Ok(cols) = self.columns.read() {
            for table in &tables_in_query {
                if let Some(columns) = cols.get(table) {
                    for col in columns {
                        if col.starts_with(word)
                            && !completions.iter().any(|p| p.replacement == *col)
                        {
                            completions.push(Pair {
                                display: col.clone(),
                                replacement: col.clone(),
                            });
                        }
                    }
                }
            }
        }

        completions
    }

    /// Extract the known table names mentioned in a query
    fn extract_tables_from_query(&self, query: &str) -> Vec<String> {
        let mut tables = Vec::new();
        if let Ok(known_tables) = self.tables.read() {
            for word in query.split_whitespace() {
                let word = word.trim_matches(|c| c == '(' || c == ')' || c == ',');
                if known_tables.contains(word) && !tables.contains(&word.to_string()) {
                    tables.push(word.to_string());
                }
            }
        }
        tables
    }

    /// Check if a word is a language keyword
    fn is_keyword(word: &str) -> bool {
        KEYWORDS.contains(&word)
    }

    /// Check if a word is an aggregate function name
    fn is_function(word: &str) -> bool {
        AGGREGATE_FUNCTIONS
            .iter()
            .any(|f| f.eq_ignore_ascii_case(word))
    }
}

impl Default for ReplHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Find the start of the current word
        let line_to_cursor = &line[..pos];
        let word_start = line_to_cursor
            .rfind(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
            .map(|i| i + 1)
            .unwrap_or(0);

        let word = &line[word_start..pos];
        let completions = self.get_completions(word, line_to_cursor);

        Ok((word_start, completions))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !self.highlighting_enabled || line.trim().is_empty() {
            return Cow::Borrowed(line);
        }

        // Dot commands - highlight in cyan
        if line.trim_start().starts_with('.') {
            return Cow::Owned(format!("\x1b[36m{}\x1b[0m", line));
        }

        let mut result = String::with_capacity(line.len() * 2);
        let mut chars = line.char_indices().peekable();
        let mut in_string = false;

        while let Some((_, c)) = chars.next() {
            if in_string {
                result.push(c);
                if c == '"' {
                    result.push_str("\x1b[0m");
                    in_string = false;
                }
            } else if c == '"' {
                // String literal - green
                in_string = true;
                result.push_str("\x1b[32m");
                result.push(c);
            } else if c.is_ascii_digit() {
                // Number - magenta
                result.push_str("\x1b[35m");
                result.push(c);
                while let Some(&(_, nc)) = chars.peek() {
                    if nc.is_ascii_digit() || nc == '.' {
                        result.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                result.push_str("\x1b[0m");
            } else if c.is_alphabetic() || c == '_' {
                let mut word = String::new();
                word.push(c);
                while let Some(&(_, nc)) = chars.peek() {
                    if nc.is_alphanumeric() || nc == '_' {
                        word.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }

                if Self::is_keyword(&word) {
                    // Keyword - bold blue
                    result.push_str("\x1b[1;34m");
                    result.push_str(&word);
                    result.push_str("\x1b[0m");
                } else if Self::is_function(&word) {
                    // Aggregate function - yellow
                    result.push_str("\x1b[33m");
                    result.push_str(&word);
                    result.push_str("\x1b[0m");
                } else {
                    result.push_str(&word);
                }
            } else {
                result.push(c);
            }
        }

        // Close any unclosed string
        if in_string {
            result.push_str("\x1b[0m");
        }

        Cow::Owned(result)
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        // Cyan prompt
        Cow::Owned(format!("\x1b[1;36m{}\x1b[0m", prompt))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        // Dim gray for hints
        Cow::Owned(format!("\x1b[2;37m{}\x1b[0m", hint))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        // Return true to trigger re-highlighting
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        // Hints disabled - using tab completion instead
        None
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_detection() {
        assert!(ReplHelper::is_keyword("pi"));
        assert!(ReplHelper::is_keyword("sigma"));
        assert!(ReplHelper::is_keyword("natural"));
        assert!(!ReplHelper::is_keyword("professoren"));
        assert!(!ReplHelper::is_keyword("MatrNr"));
    }

    #[test]
    fn test_function_detection() {
        assert!(ReplHelper::is_function("count"));
        assert!(ReplHelper::is_function("sum"));
        assert!(!ReplHelper::is_function("pi"));
        assert!(!ReplHelper::is_function("mytable"));
    }

    #[test]
    fn test_keyword_completions() {
        let helper = ReplHelper::new();

        let completions = helper.get_completions("si", "si");
        assert!(completions.iter().any(|p| p.replacement == "sigma"));

        let completions = helper.get_completions("nat", "studenten nat");
        assert!(completions.iter().any(|p| p.replacement == "natural"));
    }

    #[test]
    fn test_table_completions() {
        let helper = ReplHelper::new();
        helper.register_table("studenten", vec![]);
        helper.register_table("hoeren", vec![]);

        let completions = helper.get_completions("st", "pi Name st");
        assert!(completions.iter().any(|p| p.replacement == "studenten"));

        let completions = helper.get_completions("h", "studenten natural join h");
        assert!(completions.iter().any(|p| p.replacement == "hoeren"));
    }

    #[test]
    fn test_column_completions() {
        let helper = ReplHelper::new();
        helper.register_table(
            "studenten",
            vec!["MatrNr".to_string(), "Name".to_string()],
        );

        let completions = helper.get_completions("Na", "sigma Na studenten");
        assert!(completions.iter().any(|p| p.replacement == "Name"));
    }

    #[test]
    fn test_dot_command_completions() {
        let helper = ReplHelper::new();

        let completions = helper.get_completions(".t", ".t");
        assert!(completions.iter().any(|p| p.replacement == ".tables"));

        let completions = helper.get_completions(".h", ".h");
        assert!(completions.iter().any(|p| p.replacement == ".help"));
    }

    #[test]
    fn test_highlighting_keywords() {
        let helper = ReplHelper::new();
        let highlighted = helper.highlight("pi Name sigma Semester > 4 studenten", 0);

        assert!(highlighted.contains("\x1b[1;34m"));
        assert!(highlighted.contains("pi"));
        assert!(highlighted.contains("sigma"));
    }

    #[test]
    fn test_highlighting_strings() {
        let helper = ReplHelper::new();
        let highlighted = helper.highlight("sigma Rang = \"C4\" professoren", 0);

        assert!(highlighted.contains("\x1b[32m"));
        assert!(highlighted.contains("C4"));
    }

    #[test]
    fn test_highlighting_numbers() {
        let helper = ReplHelper::new();
        let highlighted = helper.highlight("sigma Semester > 4 studenten", 0);

        assert!(highlighted.contains("\x1b[35m"));
    }

    #[test]
    fn test_highlighting_dot_commands() {
        let helper = ReplHelper::new();
        let highlighted = helper.highlight(".tables", 0);

        assert!(highlighted.contains("\x1b[36m"));
    }

    #[test]
    fn test_extract_tables_from_query() {
        let helper = ReplHelper::new();
        helper.register_table("studenten", vec![]);
        helper.register_table("hoeren", vec![]);

        let tables = helper
            .extract_tables_from_query("studenten join studenten.MatrNr = hoeren.MatrNr hoeren");
        assert!(tables.contains(&"studenten".to_string()));
        assert!(tables.contains(&"hoeren".to_string()));
    }
}
