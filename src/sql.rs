/// SQL Statement Classification
///
/// The session never parses SQL. It only needs to know three things about
/// a statement before handing it to the backend: whether it is one of the
/// transaction keywords, whether it returns rows, and which command tag to
/// echo back once it has run.

/// Leading keywords that mark a statement as returning rows.
const QUERY_PREFIXES: [&str; 7] = ["SELECT", "SHOW", "WITH", "TABLE", "VALUES", "EXPLAIN", "ANALYZE"];

/// Leading keywords echoed back as their own command tag.
const COMMAND_TAGS: [&str; 6] = ["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"];

/// Execution shape of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows; rendered as a result set
    Query,
    /// Executed for effect; reported as a tag and a row count
    Command,
}

/// The transaction keywords intercepted before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionControl {
    Begin,
    Commit,
    Rollback,
}

impl TransactionControl {
    /// Recognises `BEGIN`, `START TRANSACTION`, `COMMIT` and `ROLLBACK`,
    /// case-insensitively, as the whole statement.
    pub fn parse(sql: &str) -> Option<Self> {
        let upper = sql.trim().to_uppercase();
        match upper.as_str() {
            "BEGIN" | "START TRANSACTION" => Some(TransactionControl::Begin),
            "COMMIT" => Some(TransactionControl::Commit),
            "ROLLBACK" => Some(TransactionControl::Rollback),
            _ => None,
        }
    }

    /// The statement sent to the backend, which is also the
    /// acknowledgment tag.
    pub fn tag(self) -> &'static str {
        match self {
            TransactionControl::Begin => "BEGIN",
            TransactionControl::Commit => "COMMIT",
            TransactionControl::Rollback => "ROLLBACK",
        }
    }

    /// Whether a transaction is open once the backend acknowledged this.
    pub fn leaves_transaction_open(self) -> bool {
        self == TransactionControl::Begin
    }
}

/// Trims whitespace and a single trailing `;`.
pub fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim()
}

/// Classifies a statement by its leading keyword.
pub fn classify(sql: &str) -> StatementKind {
    let upper = sql.trim_start().to_uppercase();
    if QUERY_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        StatementKind::Query
    } else {
        StatementKind::Command
    }
}

/// Tag reported after a command-shaped statement.
pub fn command_tag(sql: &str) -> &'static str {
    let upper = sql.trim_start().to_uppercase();
    COMMAND_TAGS
        .iter()
        .find(|tag| upper.starts_with(*tag))
        .copied()
        .unwrap_or("COMMAND")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_queries() {
        assert_eq!(classify("select 1"), StatementKind::Query);
        assert_eq!(classify("  SHOW ALL"), StatementKind::Query);
        assert_eq!(classify("with x as (select 1) select * from x"), StatementKind::Query);
        assert_eq!(classify("values (1), (2)"), StatementKind::Query);
        assert_eq!(classify("EXPLAIN SELECT 1"), StatementKind::Query);
    }

    #[test]
    fn test_classify_commands() {
        assert_eq!(classify("insert into t values (1)"), StatementKind::Command);
        assert_eq!(classify("vacuum t"), StatementKind::Command);
        assert_eq!(classify("create table t (id int)"), StatementKind::Command);
    }

    #[test]
    fn test_command_tag() {
        assert_eq!(command_tag("insert into t values (1)"), "INSERT");
        assert_eq!(command_tag("  update t set a = 1"), "UPDATE");
        assert_eq!(command_tag("Delete from t"), "DELETE");
        assert_eq!(command_tag("drop table t"), "DROP");
        assert_eq!(command_tag("alter table t add b int"), "ALTER");
        assert_eq!(command_tag("vacuum t"), "COMMAND");
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("  select 1;  "), "select 1");
        assert_eq!(strip_terminator("select 1;;"), "select 1;");
        assert_eq!(strip_terminator(" ; "), "");
        assert_eq!(strip_terminator("select 1"), "select 1");
    }

    #[test]
    fn test_transaction_keywords() {
        assert_eq!(TransactionControl::parse("begin"), Some(TransactionControl::Begin));
        assert_eq!(
            TransactionControl::parse(" Start Transaction "),
            Some(TransactionControl::Begin)
        );
        assert_eq!(TransactionControl::parse("COMMIT"), Some(TransactionControl::Commit));
        assert_eq!(TransactionControl::parse("rollback"), Some(TransactionControl::Rollback));
        assert_eq!(TransactionControl::parse("BEGIN ISOLATION LEVEL SERIALIZABLE"), None);
        assert_eq!(TransactionControl::parse("ROLLBACK TO SAVEPOINT a"), None);
        assert_eq!(TransactionControl::Begin.tag(), "BEGIN");
        assert!(TransactionControl::Begin.leaves_transaction_open());
        assert!(!TransactionControl::Rollback.leaves_transaction_open());
    }
}
