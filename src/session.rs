/// Session Engine Module
///
/// A [`Session`] owns one active backend and the [`SessionState`] that
/// shapes prompts and output. It reads units through the query editor,
/// dispatches meta-commands, routes SQL to the backend and writes every
/// result or error to its output stream.

use crate::config::{Config, SessionConfig};
use crate::core::db::{schema, Backend, CommandOutcome, Connector, ServerInfo};
use crate::core::{PgshError, Result};
use crate::input::LineSource;
use crate::query_editor::{QueryEditor, Unit};
use crate::repl::{self, Command};
use crate::results_grid::{self, RenderOptions};
use crate::sql::{self, StatementKind, TransactionControl};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Mutable facts about the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_database: String,
    pub in_transaction: bool,
    pub expanded_mode: bool,
    pub timing_enabled: bool,
    pub max_display_rows: usize,
}

impl SessionState {
    pub fn new(database: impl Into<String>, settings: &SessionConfig) -> Self {
        SessionState {
            current_database: database.into(),
            in_transaction: false,
            expanded_mode: settings.expanded,
            timing_enabled: settings.timing,
            max_display_rows: settings.max_rows,
        }
    }

    /// `db=> `, or `db*=> ` inside a transaction.
    pub fn prompt(&self) -> String {
        let marker = if self.in_transaction { "*" } else { "" };
        format!("{}{}=> ", self.current_database, marker)
    }

    /// Prompt for the second and later lines of a statement.
    pub fn continuation_prompt(&self) -> String {
        format!("{}-> ", self.current_database)
    }

    /// Flips expanded display and returns the new setting.
    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded_mode = !self.expanded_mode;
        self.expanded_mode
    }

    /// Flips statement timing and returns the new setting.
    pub fn toggle_timing(&mut self) -> bool {
        self.timing_enabled = !self.timing_enabled;
        self.timing_enabled
    }
}

/// Whether the loop keeps reading after a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Who the session is connected as, for `\c` and `\conninfo`.
#[derive(Debug, Clone)]
struct Identity {
    user: String,
    host: String,
    port: u16,
}

pub struct Session<C: Connector, W: Write> {
    connector: C,
    backend: C::Backend,
    state: SessionState,
    identity: Identity,
    statement_timeout: Duration,
    transaction_timeout: Duration,
    editor: QueryEditor,
    out: W,
}

impl<C: Connector, W: Write> Session<C, W> {
    /// Connects to the configured database. Fails without a session when
    /// the database cannot be reached.
    pub fn connect(connector: C, config: &Config, out: W) -> Result<Self> {
        let database = &config.connection.database;
        let backend = connector.connect(database)?;
        Ok(Session {
            connector,
            backend,
            state: SessionState::new(database.as_str(), &config.session),
            identity: Identity {
                user: config.connection.user.clone(),
                host: config.connection.host.clone(),
                port: config.connection.port,
            },
            statement_timeout: config.session.statement_timeout(),
            transaction_timeout: config.session.transaction_timeout(),
            editor: QueryEditor::new(),
            out,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Prints the welcome banner with the server version.
    pub fn greet(&mut self) -> Result<ServerInfo> {
        let info = ServerInfo::fetch(&mut self.backend, self.transaction_timeout);
        info!(
            version = %info.version,
            server_encoding = %info.server_encoding,
            client_encoding = %info.client_encoding,
            backend_pid = ?info.backend_pid,
            "server info"
        );
        write!(
            self.out,
            "pgsh ({})\nType \"help\" for help.\n\n",
            info.version_number()
        )?;
        self.out.flush()?;
        Ok(info)
    }

    /// Reads and processes units until a quit command or end of input.
    ///
    /// Only I/O failures end the loop early; statement and meta-command
    /// failures are reported inline.
    pub fn run<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        loop {
            input.set_prompt(&self.state.prompt());
            let continuation = self.state.continuation_prompt();
            let flow = match self.editor.read_unit(input, &continuation)? {
                Unit::EndOfInput => {
                    info!("end of input");
                    Flow::Exit
                }
                Unit::Empty => Flow::Continue,
                Unit::Statement(text) => self.handle(&text)?,
            };
            self.out.flush()?;
            if flow == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Processes one complete unit: a meta-command or a SQL statement.
    pub fn handle(&mut self, unit: &str) -> Result<Flow> {
        match repl::parse_command(unit) {
            Some(command) => self.dispatch(command),
            None => {
                self.execute_sql(unit)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Flow> {
        debug!(?command, "meta-command");
        match command {
            Command::Quit => {
                writeln!(self.out)?;
                return Ok(Flow::Exit);
            }
            Command::Help => self.out.write_all(repl::HELP_TEXT.as_bytes())?,
            Command::SqlHelp(topic) => {
                self.out.write_all(repl::sql_help(topic.as_deref()).as_bytes())?
            }
            Command::List(query) => self.execute_sql(query.sql())?,
            Command::Connect(database) => self.switch_database(&database)?,
            Command::Describe(table) => self.describe_table(&table)?,
            Command::ToggleExpanded => {
                let on = self.state.toggle_expanded();
                writeln!(self.out, "Expanded display is {}.", on_off(on))?;
            }
            Command::ToggleTiming => {
                let on = self.state.toggle_timing();
                writeln!(self.out, "Timing is {}.", on_off(on))?;
            }
            Command::ConnInfo => writeln!(
                self.out,
                "You are connected to database \"{}\" as user \"{}\" via socket in \"{}\" at port \"{}\".",
                self.state.current_database, self.identity.user, self.identity.host, self.identity.port
            )?,
            Command::Invalid(message) => self.report_error(&PgshError::Command(message))?,
        }
        Ok(Flow::Continue)
    }

    /// Routes one SQL statement and writes its result or error.
    pub fn execute_sql(&mut self, sql: &str) -> Result<()> {
        let statement = sql::strip_terminator(sql);
        if statement.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        match self.route(statement) {
            Ok(outcome) => {
                let elapsed = started.elapsed();
                self.write_outcome(&outcome, elapsed)
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn route(&mut self, statement: &str) -> Result<CommandOutcome> {
        if let Some(control) = TransactionControl::parse(statement) {
            self.backend.exec(control.tag(), self.transaction_timeout)?;
            self.state.in_transaction = control.leaves_transaction_open();
            debug!(tag = control.tag(), in_transaction = self.state.in_transaction, "transaction");
            return Ok(CommandOutcome::Transaction { tag: control.tag() });
        }

        let kind = sql::classify(statement);
        debug!(?kind, "routing statement");
        match kind {
            StatementKind::Query => {
                let rows = self.backend.query(
                    statement,
                    self.state.max_display_rows,
                    self.statement_timeout,
                )?;
                Ok(CommandOutcome::Rows(rows))
            }
            StatementKind::Command => {
                let rows_affected = self.backend.exec(statement, self.statement_timeout)?;
                Ok(CommandOutcome::Command {
                    tag: sql::command_tag(statement),
                    rows_affected,
                })
            }
        }
    }

    fn write_outcome(&mut self, outcome: &CommandOutcome, elapsed: Duration) -> Result<()> {
        let timing = self.state.timing_enabled.then_some(elapsed);
        match outcome {
            CommandOutcome::Rows(rows) => {
                let options = RenderOptions {
                    expanded: self.state.expanded_mode,
                    max_rows: self.state.max_display_rows,
                    elapsed: timing,
                };
                self.out.write_all(results_grid::render(rows, &options).as_bytes())?;
            }
            CommandOutcome::Command { tag, rows_affected } => {
                writeln!(self.out, "{} {}", tag, rows_affected)?;
                self.write_timing(timing)?;
                writeln!(self.out)?;
            }
            CommandOutcome::Transaction { tag } => {
                writeln!(self.out, "{}", tag)?;
                self.write_timing(timing)?;
            }
        }
        Ok(())
    }

    fn write_timing(&mut self, elapsed: Option<Duration>) -> Result<()> {
        if let Some(elapsed) = elapsed {
            self.out.write_all(results_grid::format_timing(elapsed).as_bytes())?;
        }
        Ok(())
    }

    /// Opens `database` and makes it active. The previous backend is only
    /// closed once the new one is reachable.
    fn switch_database(&mut self, database: &str) -> Result<()> {
        let backend = match self.connector.connect(database) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(database, error = %e, "database switch failed");
                return self.report_error(&e);
            }
        };

        let mut previous = std::mem::replace(&mut self.backend, backend);
        previous.close();
        info!(from = %self.state.current_database, to = database, "switched database");
        self.state.current_database = database.to_string();
        self.state.in_transaction = false;

        writeln!(
            self.out,
            "You are now connected to database \"{}\" as user \"{}\".",
            database, self.identity.user
        )?;
        Ok(())
    }

    fn describe_table(&mut self, table: &str) -> Result<()> {
        let sql = schema::describe_table_sql(table);
        match self.backend.query(&sql, usize::MAX, self.transaction_timeout) {
            Ok(columns) if columns.rows.is_empty() => self.report_error(&PgshError::Command(
                format!("Did not find any relation named \"{}\".", table),
            )),
            Ok(columns) => {
                let report = results_grid::render_describe(table, &columns);
                self.out.write_all(report.as_bytes())?;
                Ok(())
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn report_error(&mut self, e: &PgshError) -> Result<()> {
        debug!(error = %e, "statement failed");
        write!(self.out, "ERROR: {}\n\n", e)?;
        Ok(())
    }

    /// Closes the active backend and hands back the output stream.
    pub fn close(mut self) -> W {
        self.backend.close();
        info!(database = %self.state.current_database, "session closed");
        self.out
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixtures, FakeConnector};

    fn session(connector: FakeConnector) -> Session<FakeConnector, Vec<u8>> {
        Session::connect(connector, &Config::default(), Vec::new()).unwrap()
    }

    fn output(session: &Session<FakeConnector, Vec<u8>>) -> String {
        String::from_utf8(session.output().clone()).unwrap()
    }

    #[test]
    fn test_state_prompts() {
        let mut state = SessionState::new("shop", &SessionConfig::default());
        assert_eq!(state.prompt(), "shop=> ");
        assert_eq!(state.continuation_prompt(), "shop-> ");
        state.in_transaction = true;
        assert_eq!(state.prompt(), "shop*=> ");
    }

    #[test]
    fn test_toggles_round_trip() {
        let mut state = SessionState::new("db", &SessionConfig::default());
        assert!(state.toggle_expanded());
        assert!(!state.toggle_expanded());
        assert!(state.toggle_timing());
        assert!(!state.toggle_timing());
    }

    #[test]
    fn test_connect_fails_for_unreachable_database() {
        let config = Config::default();
        let result = Session::connect(FakeConnector::new(&["other"]), &config, Vec::new());
        assert!(matches!(result, Err(PgshError::Connection(_))));
    }

    #[test]
    fn test_greet_prints_version() {
        let mut s = session(fixtures::sample_server());
        let info = s.greet().unwrap();
        assert_eq!(info.version_number(), "16.2");
        assert_eq!(output(&s), "pgsh (16.2)\nType \"help\" for help.\n\n");
    }

    #[test]
    fn test_failed_begin_leaves_state_unchanged() {
        let mut s = session(FakeConnector::new(&["postgres"]).with_failure("BEGIN", "no"));
        s.handle("begin;").unwrap();
        assert!(!s.state().in_transaction);
        assert_eq!(output(&s), "ERROR: no\n\n");
    }

    #[test]
    fn test_terminator_only_is_noop() {
        let connector = FakeConnector::new(&["postgres"]);
        let mut s = session(connector.clone());
        s.execute_sql("  ;  ").unwrap();
        assert!(connector.statements().is_empty());
        assert_eq!(output(&s), "");
    }

    #[test]
    fn test_close_releases_backend() {
        let connector = FakeConnector::new(&["postgres"]);
        let s = session(connector.clone());
        s.close();
        assert_eq!(connector.closed(), vec!["postgres".to_string()]);
    }
}
