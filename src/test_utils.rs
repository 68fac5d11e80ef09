/// # Test Utilities Module
///
/// Testing infrastructure for pgsh that needs neither a terminal nor a
/// running PostgreSQL server.
///
/// This module provides:
/// - A scripted line source that replays canned input
/// - An in-memory connector/backend pair with a shared call log
/// - Sample fixtures for session-level tests
use crate::core::db::{Backend, Connector, ResultSet, Value};
use crate::core::{PgshError, Result};
use crate::input::{LineSource, ReadOutcome};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// Line source that replays a fixed script, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<ReadOutcome>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        ScriptedInput {
            script: lines
                .iter()
                .map(|line| ReadOutcome::Line(line.to_string()))
                .collect(),
            prompts: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.script.push_back(ReadOutcome::Line(line.to_string()));
    }

    /// Queues a Ctrl-C.
    pub fn push_interrupt(&mut self) {
        self.script.push_back(ReadOutcome::Interrupted);
    }

    /// Outcomes not yet read.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Every prompt set so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self) -> Result<ReadOutcome> {
        Ok(self.script.pop_front().unwrap_or(ReadOutcome::EndOfInput))
    }

    fn set_prompt(&mut self, prompt: &str) {
        self.prompts.push(prompt.to_string());
    }
}

/// Which backend capability a recorded call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Exec,
}

/// One statement received by the fake server.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub database: String,
    pub kind: CallKind,
    pub sql: String,
    /// Row cap passed with a query; `None` for commands
    pub max_rows: Option<usize>,
    pub timeout: Duration,
}

/// State shared by a [`FakeConnector`] and every backend it opens.
#[derive(Debug, Default)]
pub struct FakeServer {
    databases: HashSet<String>,
    results: HashMap<String, ResultSet>,
    affected: HashMap<String, u64>,
    failures: HashMap<String, String>,
    slow: HashSet<String>,
    calls: Vec<Call>,
    closed: Vec<String>,
}

/// In-memory [`Connector`]; clones share one [`FakeServer`].
///
/// Queries answer from canned results keyed by exact SQL text and fail
/// with a syntax error otherwise. Commands succeed with zero affected rows
/// unless configured.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    server: Rc<RefCell<FakeServer>>,
}

impl FakeConnector {
    /// A server on which only `databases` can be reached.
    pub fn new(databases: &[&str]) -> Self {
        let connector = FakeConnector::default();
        connector
            .server
            .borrow_mut()
            .databases
            .extend(databases.iter().map(|d| d.to_string()));
        connector
    }

    pub fn with_result(self, sql: &str, result: ResultSet) -> Self {
        self.server.borrow_mut().results.insert(sql.to_string(), result);
        self
    }

    pub fn with_affected(self, sql: &str, rows: u64) -> Self {
        self.server.borrow_mut().affected.insert(sql.to_string(), rows);
        self
    }

    /// Makes `sql` fail with the given server message.
    pub fn with_failure(self, sql: &str, message: &str) -> Self {
        self.server
            .borrow_mut()
            .failures
            .insert(sql.to_string(), message.to_string());
        self
    }

    /// Makes `sql` run past whatever timeout it is given.
    pub fn with_timeout(self, sql: &str) -> Self {
        self.server.borrow_mut().slow.insert(sql.to_string());
        self
    }

    /// Every statement received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.server.borrow().calls.clone()
    }

    /// Statements received, skipping the server-info probes.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.sql)
            .filter(|sql| !is_probe(sql))
            .collect()
    }

    /// Databases whose backends were closed, in order.
    pub fn closed(&self) -> Vec<String> {
        self.server.borrow().closed.clone()
    }
}

fn is_probe(sql: &str) -> bool {
    matches!(
        sql,
        "SELECT version()" | "SHOW server_encoding" | "SHOW client_encoding" | "SELECT pg_backend_pid()"
    )
}

impl Connector for FakeConnector {
    type Backend = FakeBackend;

    fn connect(&self, database: &str) -> Result<FakeBackend> {
        if !self.server.borrow().databases.contains(database) {
            return Err(PgshError::Connection(format!(
                "could not connect to database \"{}\": database \"{}\" does not exist",
                database, database
            )));
        }
        Ok(FakeBackend {
            server: Rc::clone(&self.server),
            database: database.to_string(),
            closed: false,
        })
    }
}

/// Backend handed out by [`FakeConnector`].
#[derive(Debug)]
pub struct FakeBackend {
    server: Rc<RefCell<FakeServer>>,
    database: String,
    closed: bool,
}

impl FakeBackend {
    fn receive(
        &self,
        kind: CallKind,
        sql: &str,
        max_rows: Option<usize>,
        timeout: Duration,
    ) -> Result<()> {
        let mut server = self.server.borrow_mut();
        server.calls.push(Call {
            database: self.database.clone(),
            kind,
            sql: sql.to_string(),
            max_rows,
            timeout,
        });
        if self.closed {
            return Err(PgshError::Backend("connection is closed".to_string()));
        }
        if server.slow.contains(sql) {
            return Err(PgshError::Timeout(timeout));
        }
        match server.failures.get(sql) {
            Some(message) => Err(PgshError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl Backend for FakeBackend {
    fn query(&mut self, sql: &str, max_rows: usize, timeout: Duration) -> Result<ResultSet> {
        self.receive(CallKind::Query, sql, Some(max_rows), timeout)?;
        let server = self.server.borrow();
        let mut result = server.results.get(sql).cloned().ok_or_else(|| {
            let near = sql.split_whitespace().next().unwrap_or(sql);
            PgshError::Backend(format!("syntax error at or near \"{}\"", near))
        })?;
        if result.rows.len() > max_rows {
            result.rows.truncate(max_rows);
            result.truncated = true;
        }
        Ok(result)
    }

    fn exec(&mut self, sql: &str, timeout: Duration) -> Result<u64> {
        self.receive(CallKind::Exec, sql, None, timeout)?;
        Ok(self.server.borrow().affected.get(sql).copied().unwrap_or(0))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.server.borrow_mut().closed.push(self.database.clone());
        }
    }
}

/// Sample fixtures for session tests
pub mod fixtures {
    use super::*;

    /// A server with `postgres` and `shop` databases and a small `users`
    /// table in `postgres`.
    pub fn sample_server() -> FakeConnector {
        FakeConnector::new(&["postgres", "shop"])
            .with_result(
                "SELECT version()",
                ResultSet::with_columns(&["version"]).row(vec![
                    "PostgreSQL 16.2 on x86_64-pc-linux-gnu, compiled by gcc".into(),
                ]),
            )
            .with_result(
                "SELECT id, name FROM users",
                ResultSet::with_columns(&["id", "name"])
                    .row(vec![Value::Integer(1), "alice".into()])
                    .row(vec![Value::Integer(2), Value::Null]),
            )
            .with_affected("DELETE FROM users WHERE id = 2", 1)
    }
}

/// Asserts that a result is an error of the given `PgshError` variant.
#[macro_export]
macro_rules! assert_pgsh_error {
    ($result:expr, $variant:pat) => {
        match $result {
            Err($variant) => {}
            Err(other) => panic!("unexpected error variant: {:?}", other),
            Ok(_) => panic!("expected an error, got Ok"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_replays_then_ends() {
        let mut input = ScriptedInput::new(&["a"]);
        input.push_interrupt();
        assert_eq!(input.read_line().unwrap(), ReadOutcome::Line("a".to_string()));
        assert_eq!(input.read_line().unwrap(), ReadOutcome::Interrupted);
        assert_eq!(input.read_line().unwrap(), ReadOutcome::EndOfInput);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_fake_connector_reachability() {
        let connector = FakeConnector::new(&["postgres"]);
        assert!(connector.connect("postgres").is_ok());
        assert_pgsh_error!(connector.connect("missing"), PgshError::Connection(_));
    }

    #[test]
    fn test_fake_backend_answers_and_logs() {
        let connector = fixtures::sample_server().with_failure("DROP TABLE users", "permission denied");
        let mut backend = connector.connect("postgres").unwrap();
        let t = Duration::from_secs(1);

        let users = backend.query("SELECT id, name FROM users", 10, t).unwrap();
        assert_eq!(users.row_count(), 2);
        assert!(!users.truncated);
        assert_eq!(backend.exec("DELETE FROM users WHERE id = 2", t).unwrap(), 1);
        assert_eq!(backend.exec("VACUUM", t).unwrap(), 0);
        assert_pgsh_error!(backend.exec("DROP TABLE users", t), PgshError::Backend(_));
        assert_pgsh_error!(backend.query("bogus", 10, t), PgshError::Backend(_));

        backend.close();
        assert_eq!(connector.closed(), vec!["postgres".to_string()]);
        assert_eq!(connector.calls().len(), 5);
        assert_eq!(connector.calls()[1].kind, CallKind::Exec);
    }

    #[test]
    fn test_fake_backend_stops_at_row_cap() {
        let connector = fixtures::sample_server();
        let mut backend = connector.connect("postgres").unwrap();
        let users = backend
            .query("SELECT id, name FROM users", 1, Duration::from_secs(1))
            .unwrap();
        assert_eq!(users.row_count(), 1);
        assert!(users.truncated);
    }
}
