//! Property-based tests for input accumulation, statement classification
//! and session toggles
//!
//! These tests check that:
//! - A statement spread over several lines is returned joined and intact
//! - A meta-command on the first line is returned without further reads
//! - Classification depends only on the leading keyword, not its case
//! - Toggling a display setting twice is a no-op

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use pgsh::config::SessionConfig;
    use pgsh::query_editor::{QueryEditor, Unit};
    use pgsh::results_grid::{render_table, RenderOptions, MAX_COLUMN_WIDTH};
    use pgsh::core::db::{ResultSet, Value};
    use pgsh::session::SessionState;
    use pgsh::sql::{classify, StatementKind};
    use pgsh::test_utils::ScriptedInput;

    /// Lines that neither end a statement nor look like a meta-command.
    fn arb_body_line() -> impl Strategy<Value = String> {
        "[a-z0-9 ,()=';]{0,20}[a-z0-9,()=]"
    }

    fn mixed_case(word: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
            word.chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect()
        })
    }

    proptest! {
        /// Every line up to the terminated one is part of the statement
        #[test]
        fn prop_statement_lines_are_joined(
            body in proptest::collection::vec(arb_body_line(), 0..6),
            last in "[a-z0-9 ]{1,20}",
        ) {
            let first = format!("select {}", last);
            let mut lines: Vec<String> = vec![first];
            lines.extend(body);
            lines.push(format!("{};", last));

            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let mut input = ScriptedInput::new(&refs);
            let unit = QueryEditor::new().read_unit(&mut input, "db-> ").unwrap();

            prop_assert_eq!(unit, Unit::Statement(lines.join("\n")));
            prop_assert_eq!(input.remaining(), 0);
            prop_assert_eq!(input.prompts().len(), lines.len() - 1);
        }

        /// A first line starting with a backslash is a complete unit
        #[test]
        fn prop_meta_command_first_line_is_unit(
            command in "[a-z+]{1,8}",
            rest in proptest::collection::vec("[a-z ;]{0,10}", 0..4),
        ) {
            let first = format!("\\{}", command);
            let mut lines: Vec<&str> = vec![first.as_str()];
            lines.extend(rest.iter().map(String::as_str));

            let mut input = ScriptedInput::new(&lines);
            let unit = QueryEditor::new().read_unit(&mut input, "db-> ").unwrap();

            prop_assert_eq!(unit, Unit::Statement(first.clone()));
            prop_assert_eq!(input.remaining(), rest.len());
        }

        /// Query-shaped keywords are recognised in any letter case
        #[test]
        fn prop_query_keywords_any_case(
            keyword in prop_oneof![
                mixed_case("select"),
                mixed_case("show"),
                mixed_case("with"),
                mixed_case("values"),
                mixed_case("explain"),
            ],
            indent in " {0,4}",
            tail in "[a-z0-9 *]{0,20}",
        ) {
            let sql = format!("{}{} {}", indent, keyword, tail);
            prop_assert_eq!(classify(&sql), StatementKind::Query);
        }

        /// Anything else is executed for effect
        #[test]
        fn prop_other_keywords_are_commands(
            keyword in prop_oneof![
                mixed_case("insert"),
                mixed_case("update"),
                mixed_case("vacuum"),
                mixed_case("grant"),
            ],
            tail in "[a-z0-9 ]{0,20}",
        ) {
            let sql = format!("{} {}", keyword, tail);
            prop_assert_eq!(classify(&sql), StatementKind::Command);
        }

        /// Toggling twice restores the original setting
        #[test]
        fn prop_toggle_twice_is_identity(expanded in any::<bool>(), timing in any::<bool>()) {
            let settings = SessionConfig { expanded, timing, ..SessionConfig::default() };
            let mut state = SessionState::new("db", &settings);
            let before = state.clone();

            state.toggle_expanded();
            state.toggle_expanded();
            state.toggle_timing();
            state.toggle_timing();

            prop_assert_eq!(state, before);
        }

        /// No rendered grid line is wider than the widest column allows
        #[test]
        fn prop_grid_lines_are_bounded(values in proptest::collection::vec("[a-z]{0,80}", 1..8)) {
            let mut rs = ResultSet::with_columns(&["v"]);
            for v in &values {
                rs = rs.row(vec![Value::Text(v.clone())]);
            }
            let options = RenderOptions { expanded: false, max_rows: 1000, elapsed: None };
            let out = render_table(&rs, &options);
            for line in out.lines() {
                prop_assert!(line.chars().count() <= MAX_COLUMN_WIDTH + 2);
            }
        }
    }
}
