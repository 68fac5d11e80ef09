#[cfg(test)]
mod results_grid_tests {
    use chrono::NaiveDate;
    use pgsh::core::db::{ResultSet, Value};
    use pgsh::results_grid::{render, render_describe, RenderOptions};
    use std::time::Duration;

    fn options(expanded: bool) -> RenderOptions {
        RenderOptions {
            expanded,
            max_rows: 1000,
            elapsed: None,
        }
    }

    fn users() -> ResultSet {
        ResultSet::with_columns(&["id", "name"])
            .row(vec![Value::Integer(1), "ab".into()])
            .row(vec![Value::Integer(2), Value::Null])
    }

    #[test]
    fn test_table_layout() {
        let out = render(&users(), &options(false));
        assert_eq!(
            out,
            " id   | name \n\
             -----+------\n \
             1    | ab   \n \
             2    |      \n\
             (2 rows)\n\n"
        );
    }

    #[test]
    fn test_table_single_and_zero_rows() {
        let one = ResultSet::with_columns(&["n"]).row(vec![Value::Integer(7)]);
        assert!(render(&one, &options(false)).ends_with("(1 row)\n\n"));

        let none = ResultSet::with_columns(&["n"]);
        assert_eq!(render(&none, &options(false)), " n    \n-----\n(0 rows)\n\n");
    }

    #[test]
    fn test_table_value_formatting() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let rs = ResultSet::with_columns(&["flag", "at", "raw"]).row(vec![
            Value::Boolean(false),
            Value::Timestamp(ts),
            Value::Binary(b"xyz".to_vec()),
        ]);
        let out = render(&rs, &options(false));
        assert!(out.contains(" f    | 2024-01-02 03:04:05 | xyz  \n"));
    }

    #[test]
    fn test_table_truncates_long_values() {
        let long = "a".repeat(60);
        let rs = ResultSet::with_columns(&["v"]).row(vec![long.into()]);
        let out = render(&rs, &options(false));
        let expected = format!(" {}... \n", "a".repeat(47));
        assert!(out.contains(&expected));
        assert!(out.contains(&format!("{}\n", "-".repeat(51))));
    }

    #[test]
    fn test_table_with_timing() {
        let mut opts = options(false);
        opts.elapsed = Some(Duration::from_millis(2));
        assert!(render(&users(), &opts).ends_with("(2 rows)\nTime: 2.000 ms\n\n"));
    }

    #[test]
    fn test_expanded_layout() {
        let out = render(&users(), &options(true));
        let header = |n: usize| {
            let h = format!("-[ RECORD {} ]", n);
            format!("{}{}\n", h, "-".repeat(50 - h.len()))
        };
        let expected = format!(
            "{}id   | 1\nname | ab\n{}id   | 2\nname | \n\n",
            header(1),
            header(2)
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_expanded_does_not_truncate() {
        let long = "b".repeat(80);
        let rs = ResultSet::with_columns(&["v"]).row(vec![long.clone().into()]);
        assert!(render(&rs, &options(true)).contains(&format!("v | {}\n", long)));
    }

    #[test]
    fn test_expanded_zero_rows() {
        let rs = ResultSet::with_columns(&["v"]);
        assert_eq!(render(&rs, &options(true)), "(0 rows)\n\n");
    }

    #[test]
    fn test_expanded_respects_row_cap() {
        let mut opts = options(true);
        opts.max_rows = 1;
        let out = render(&users(), &opts);
        assert!(out.contains("RECORD 1"));
        assert!(!out.contains("RECORD 2"));
        assert!(out.ends_with("(more rows available; showing first 1)\n\n"));
    }

    #[test]
    fn test_describe_layout() {
        let rs = ResultSet::with_columns(&["column", "type", "modifiers"])
            .row(vec!["id".into(), "integer".into(), "not null".into()])
            .row(vec!["email".into(), "text".into(), "".into()]);
        let sep = format!(
            "+{}+{}+{}+\n",
            "-".repeat(12),
            "-".repeat(22),
            "-".repeat(17)
        );
        let expected = format!(
            "Table \"users\"\n{sep}\
             | Column     | Type                 | Modifiers       | \n{sep}\
             | id         | integer              | not null        | \n\
             | email      | text                 |                 | \n{sep}\n",
            sep = sep
        );
        assert_eq!(render_describe("users", &rs), expected);
    }
}
