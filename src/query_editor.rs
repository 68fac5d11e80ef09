/// Query Editor Module for pgsh
///
/// Groups raw input lines into one logical unit: a meta-command, a shortcut
/// keyword, or a semicolon-terminated SQL statement. Meta-commands are only
/// recognised at the start of a unit; once a statement is under way every
/// line belongs to it.

use crate::core::Result;
use crate::input::{LineSource, ReadOutcome};

/// Prefix that introduces a meta-command.
pub const META_PREFIX: char = '\\';

/// Keywords accepted as complete units on their own, case-insensitively.
pub const SHORTCUT_KEYWORDS: [&str; 3] = ["exit", "quit", "help"];

/// One accumulated unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A meta-command, shortcut keyword or terminated SQL statement
    Statement(String),
    /// Nothing to process (blank line or interrupted input); prompt again
    Empty,
    /// The line source is exhausted
    EndOfInput,
}

/// Accumulates lines into units.
#[derive(Debug, Default)]
pub struct QueryEditor {
    query_buffer: Vec<String>,
}

impl QueryEditor {
    /// Creates a new instance of QueryEditor.
    pub fn new() -> Self {
        QueryEditor {
            query_buffer: Vec::new(),
        }
    }

    /// Whether a statement is partially entered.
    pub fn is_accumulating(&self) -> bool {
        !self.query_buffer.is_empty()
    }

    /// Clears the query buffer.
    pub fn clear(&mut self) {
        self.query_buffer.clear();
    }

    /// Reads from `source` until one unit is complete.
    ///
    /// The source's prompt is switched to `continuation_prompt` while a
    /// statement spans several lines. A statement still open when input
    /// runs out is discarded.
    pub fn read_unit<L: LineSource>(
        &mut self,
        source: &mut L,
        continuation_prompt: &str,
    ) -> Result<Unit> {
        self.clear();
        loop {
            let line = match source.read_line()? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    self.clear();
                    return Ok(Unit::Empty);
                }
                ReadOutcome::EndOfInput => {
                    self.clear();
                    return Ok(Unit::EndOfInput);
                }
            };

            let trimmed = line.trim();
            if !self.is_accumulating() {
                if trimmed.is_empty() {
                    return Ok(Unit::Empty);
                }
                if trimmed.starts_with(META_PREFIX) || is_shortcut_keyword(trimmed) {
                    return Ok(Unit::Statement(trimmed.to_string()));
                }
            } else if trimmed.starts_with(META_PREFIX) {
                // Mid-statement, a backslash line is statement text and never ends it.
                self.query_buffer.push(line);
                continue;
            }

            let terminated = line.trim_end().ends_with(';');
            self.query_buffer.push(line);
            if terminated {
                let statement = self.query_buffer.join("\n");
                self.clear();
                return Ok(Unit::Statement(statement));
            }
            source.set_prompt(continuation_prompt);
        }
    }
}

/// Whether `input` is one of the shortcut keywords.
pub fn is_shortcut_keyword(input: &str) -> bool {
    SHORTCUT_KEYWORDS
        .iter()
        .any(|k| input.eq_ignore_ascii_case(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedInput;

    fn unit(lines: &[&str]) -> (Unit, ScriptedInput) {
        let mut input = ScriptedInput::new(lines);
        let mut editor = QueryEditor::new();
        let unit = editor.read_unit(&mut input, "db-> ").unwrap();
        (unit, input)
    }

    #[test]
    fn test_meta_command_returns_immediately() {
        let (u, input) = unit(&["  \\dt  ", "select 1;"]);
        assert_eq!(u, Unit::Statement("\\dt".to_string()));
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn test_shortcut_keywords_case_insensitive() {
        let (u, _) = unit(&["QUIT"]);
        assert_eq!(u, Unit::Statement("QUIT".to_string()));
        let (u, _) = unit(&["Help"]);
        assert_eq!(u, Unit::Statement("Help".to_string()));
    }

    #[test]
    fn test_blank_first_line_is_empty_unit() {
        let (u, input) = unit(&["   ", "select 1;"]);
        assert_eq!(u, Unit::Empty);
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn test_multi_line_statement() {
        let (u, input) = unit(&["select a,", "  b", "from t;  "]);
        assert_eq!(u, Unit::Statement("select a,\n  b\nfrom t;  ".to_string()));
        assert_eq!(input.prompts(), &["db-> ".to_string(), "db-> ".to_string()]);
    }

    #[test]
    fn test_interior_semicolon_does_not_terminate() {
        let (u, _) = unit(&["select ';' as x", "from t;"]);
        assert_eq!(u, Unit::Statement("select ';' as x\nfrom t;".to_string()));
    }

    #[test]
    fn test_backslash_line_mid_statement_is_literal() {
        let (u, _) = unit(&["select 1", "\\dt;", "as one;"]);
        assert_eq!(u, Unit::Statement("select 1\n\\dt;\nas one;".to_string()));
    }

    #[test]
    fn test_end_of_input_discards_partial_statement() {
        let (u, _) = unit(&["select 1"]);
        assert_eq!(u, Unit::EndOfInput);
    }

    #[test]
    fn test_interrupt_discards_partial_statement() {
        let mut input = ScriptedInput::new(&["select 1"]);
        input.push_interrupt();
        input.push_line("select 2;");
        let mut editor = QueryEditor::new();
        assert_eq!(editor.read_unit(&mut input, "db-> ").unwrap(), Unit::Empty);
        assert!(!editor.is_accumulating());
        assert_eq!(
            editor.read_unit(&mut input, "db-> ").unwrap(),
            Unit::Statement("select 2;".to_string())
        );
    }
}
