/// Connection Management Module
///
/// This module provides the PostgreSQL implementation of the backend
/// capabilities: pooled connections, TLS negotiation, per-call timeouts
/// and decoding of result rows into coarse-typed values.
///
/// Single statements are prepared and their rows streamed in binary form,
/// so collection stops at the row cap. Units the server refuses to prepare
/// (several statements on one line) and results with column types that
/// have no binary decoder here go through the simple query protocol and
/// are decoded from text.

use super::backend::{Backend, Connector};
use super::query::{ResultSet, Value, ValueKind};
use crate::config::{ConnectionConfig, SslMode};
use crate::core::{PgshError, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use native_tls::TlsConnector;
use postgres::error::SqlState;
use postgres::fallible_iterator::FallibleIterator;
use postgres::types::{FromSql, Type};
use postgres::{Client, Row, SimpleQueryMessage, Statement};
use postgres_native_tls::MakeTlsConnector;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use std::error::Error as StdError;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

type Manager = PostgresConnectionManager<MakeTlsConnector>;

type DecodeError = Box<dyn StdError + Sync + Send>;

const NO_PARAMS: [&str; 0] = [];

/// Idle pooled connections above `min_idle` are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens pooled PostgreSQL backends from one connection configuration.
pub struct PostgresConnector {
    config: ConnectionConfig,
    tls: MakeTlsConnector,
}

impl PostgresConnector {
    /// Creates a connector; the TLS connector is built once and shared by
    /// every pool this connector opens.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let tls = tls_connector(config.sslmode)?;
        Ok(PostgresConnector { config, tls })
    }
}

impl Connector for PostgresConnector {
    type Backend = PostgresBackend;

    fn connect(&self, database: &str) -> Result<PostgresBackend> {
        info!(dsn = %self.config.redacted_dsn(database), "connecting");

        let pg_config: postgres::Config = self
            .config
            .to_dsn(database)
            .parse()
            .map_err(|e: postgres::Error| {
                PgshError::Config(format!("invalid connection parameters: {}", e))
            })?;

        let cfg = &self.config;
        let lifetime = Some(cfg.conn_max_lifetime()).filter(|d| !d.is_zero());
        let pool = Pool::builder()
            .max_size(cfg.max_open_conns)
            // r2d2 has no idle ceiling; keep at most one warm connection
            // so building the pool opens no more than the session uses.
            .min_idle(Some(cfg.max_idle_conns.min(1)))
            .idle_timeout(Some(IDLE_TIMEOUT))
            .max_lifetime(lifetime)
            .connection_timeout(cfg.connect_timeout().max(Duration::from_secs(1)))
            .build(PostgresConnectionManager::new(pg_config, self.tls.clone()))
            .map_err(|e| connect_error(database, e))?;

        let mut conn = pool.get().map_err(|e| connect_error(database, e))?;
        conn.is_valid(cfg.connect_timeout())
            .map_err(|e| connect_error(database, e))?;

        info!(database, "connected");
        Ok(PostgresBackend {
            pool,
            session: Some(conn),
            tls: self.tls.clone(),
        })
    }
}

fn connect_error(database: &str, e: impl std::fmt::Display) -> PgshError {
    PgshError::Connection(format!(
        "could not connect to database \"{}\": {}",
        database, e
    ))
}

fn tls_connector(mode: SslMode) -> Result<MakeTlsConnector> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(!mode.verifies_certificate())
        .danger_accept_invalid_hostnames(!mode.verifies_hostname())
        .build()
        .map_err(|e| PgshError::Connection(format!("TLS setup failed: {}", e)))?;
    Ok(MakeTlsConnector::new(connector))
}

/// A pooled backend bound to one database.
///
/// Statements run on one pinned connection so that an open transaction
/// spans every statement of the session.
pub struct PostgresBackend {
    pool: Pool<Manager>,
    session: Option<PooledConnection<Manager>>,
    tls: MakeTlsConnector,
}

impl PostgresBackend {
    fn client(&mut self) -> Result<&mut Client> {
        let conn = match self.session.take() {
            Some(conn) if !conn.is_closed() => conn,
            Some(_) => {
                warn!("pinned connection was closed; checking out a new one");
                self.pool.get()?
            }
            None => self.pool.get()?,
        };
        Ok(&mut **self.session.insert(conn))
    }

    /// Runs `op` on the pinned connection, cancelling it server-side if it
    /// has not finished within `timeout`.
    fn with_deadline<T>(
        &mut self,
        timeout: Duration,
        op: impl FnOnce(&mut Client) -> std::result::Result<T, postgres::Error>,
    ) -> Result<T> {
        let tls = self.tls.clone();
        let client = self.client()?;
        let token = client.cancel_token();

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watchdog = thread::spawn(move || match done_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                if let Err(e) = token.cancel_query(tls) {
                    warn!(error = %e, "failed to send cancel request");
                }
                true
            }
            _ => false,
        });

        let result = op(client);
        drop(done_tx);
        let fired = watchdog.join().unwrap_or(false);

        match result {
            Ok(value) => Ok(value),
            Err(_) if fired => Err(PgshError::Timeout(timeout)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Backend for PostgresBackend {
    fn query(&mut self, sql: &str, max_rows: usize, timeout: Duration) -> Result<ResultSet> {
        debug!(sql, max_rows, "query");
        self.with_deadline(timeout, |client| match client.prepare(sql) {
            Ok(stmt) if stmt.columns().iter().all(|c| streams(c.type_())) => {
                stream_rows(client, &stmt, max_rows)
            }
            Ok(stmt) => {
                let kinds: Vec<ValueKind> =
                    stmt.columns().iter().map(|c| value_kind(c.type_())).collect();
                Ok(collect_text_rows(client.simple_query(sql)?, &kinds, max_rows))
            }
            Err(e) if is_multi_statement(&e) => {
                debug!("unit holds several statements; using the simple query protocol");
                Ok(collect_text_rows(client.simple_query(sql)?, &[], max_rows))
            }
            Err(e) => Err(e),
        })
    }

    fn exec(&mut self, sql: &str, timeout: Duration) -> Result<u64> {
        debug!(sql, "exec");
        let messages = self.with_deadline(timeout, |client| client.simple_query(sql))?;
        let affected = messages
            .iter()
            .filter_map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => Some(*n),
                _ => None,
            })
            .last()
            .unwrap_or(0);
        Ok(affected)
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            info!("connection closed");
        }
    }
}

/// The server refuses to prepare a string holding several commands with a
/// position-less syntax error. Real syntax errors always carry a position.
fn is_multi_statement(e: &postgres::Error) -> bool {
    e.as_db_error()
        .is_some_and(|db| *db.code() == SqlState::SYNTAX_ERROR && db.position().is_none())
}

/// Reads rows off the wire until `max_rows` are held. The driver drains and
/// discards whatever the server still sends after that.
fn stream_rows(
    client: &mut Client,
    stmt: &Statement,
    max_rows: usize,
) -> std::result::Result<ResultSet, postgres::Error> {
    let columns = stmt.columns().iter().map(|c| c.name().to_string()).collect();
    let mut result = ResultSet::new(columns, Vec::new());
    let mut rows = client.query_raw(stmt, NO_PARAMS)?;
    while let Some(row) = rows.next()? {
        if result.rows.len() >= max_rows {
            result.truncated = true;
            break;
        }
        result.rows.push(decode_row(&row)?);
    }
    Ok(result)
}

fn decode_row(row: &Row) -> std::result::Result<Vec<Value>, postgres::Error> {
    (0..row.len())
        .map(|i| row.try_get::<_, Cell>(i).map(|cell| cell.0))
        .collect()
}

/// Collects simple-protocol rows up to the cap. With several statements
/// in one unit the last row-returning one wins; `kinds` only applies to a
/// single prepared statement.
fn collect_text_rows(
    messages: Vec<SimpleQueryMessage>,
    kinds: &[ValueKind],
    max_rows: usize,
) -> ResultSet {
    let mut result = ResultSet::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                let names = columns.iter().map(|c| c.name().to_string()).collect();
                result = ResultSet::new(names, Vec::new());
            }
            SimpleQueryMessage::Row(_) if result.rows.len() >= max_rows => {
                result.truncated = true;
            }
            SimpleQueryMessage::Row(row) => {
                let values = (0..row.len())
                    .map(|i| {
                        let kind = kinds.get(i).copied().unwrap_or(ValueKind::Text);
                        decode_text(row.get(i), kind)
                    })
                    .collect();
                result.rows.push(values);
            }
            _ => {}
        }
    }
    result
}

/// Whether values of `ty` can be decoded from the binary protocol.
fn streams(ty: &Type) -> bool {
    value_kind(ty) != ValueKind::Text
        || [Type::JSON, Type::JSONB, Type::UUID].contains(ty)
        || <String as FromSql>::accepts(ty)
}

/// One binary-protocol cell.
struct Cell(Value);

impl<'a> FromSql<'a> for Cell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, DecodeError> {
        decode_binary(ty, raw).map(Cell)
    }

    fn from_sql_null(_ty: &Type) -> std::result::Result<Self, DecodeError> {
        Ok(Cell(Value::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_binary(ty: &Type, raw: &[u8]) -> std::result::Result<Value, DecodeError> {
    let value = if *ty == Type::BOOL {
        Value::Boolean(bool::from_sql(ty, raw)?)
    } else if *ty == Type::INT2 {
        Value::Integer(i16::from_sql(ty, raw)?.into())
    } else if *ty == Type::INT4 {
        Value::Integer(i32::from_sql(ty, raw)?.into())
    } else if *ty == Type::INT8 {
        Value::Integer(i64::from_sql(ty, raw)?)
    } else if *ty == Type::OID {
        Value::Integer(u32::from_sql(ty, raw)?.into())
    } else if *ty == Type::FLOAT4 {
        // Through the shortest decimal form, so 0.1 stays 0.1.
        float_value(f32::from_sql(ty, raw)?.to_string().parse()?)
    } else if *ty == Type::FLOAT8 {
        float_value(f64::from_sql(ty, raw)?)
    } else if *ty == Type::TIMESTAMP || *ty == Type::TIMESTAMPTZ {
        match i64::from_sql(&Type::INT8, raw)? {
            i64::MAX => Value::Text("infinity".to_string()),
            i64::MIN => Value::Text("-infinity".to_string()),
            _ if *ty == Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            _ => Value::Timestamp(DateTime::<Local>::from_sql(ty, raw)?.naive_local()),
        }
    } else if *ty == Type::DATE {
        match i32::from_sql(&Type::INT4, raw)? {
            i32::MAX => Value::Text("infinity".to_string()),
            i32::MIN => Value::Text("-infinity".to_string()),
            _ => Value::Timestamp(NaiveDate::from_sql(ty, raw)?.and_time(NaiveTime::MIN)),
        }
    } else if *ty == Type::BYTEA {
        Value::Binary(raw.to_vec())
    } else if *ty == Type::UUID {
        Value::Text(uuid_text(raw).ok_or("invalid uuid length")?)
    } else if *ty == Type::JSONB {
        match raw.split_first() {
            Some((&1, json)) => Value::Text(std::str::from_utf8(json)?.to_string()),
            _ => return Err("unsupported jsonb version".into()),
        }
    } else {
        Value::Text(std::str::from_utf8(raw)?.to_string())
    };
    Ok(value)
}

/// Non-finite floats keep the server's spelling.
fn float_value(x: f64) -> Value {
    if x.is_nan() {
        Value::Text("NaN".to_string())
    } else if x == f64::INFINITY {
        Value::Text("Infinity".to_string())
    } else if x == f64::NEG_INFINITY {
        Value::Text("-Infinity".to_string())
    } else {
        Value::Floating(x)
    }
}

fn uuid_text(raw: &[u8]) -> Option<String> {
    if raw.len() != 16 {
        return None;
    }
    let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    ))
}

/// Maps a column type onto its coarse display kind.
fn value_kind(ty: &Type) -> ValueKind {
    let integers = [Type::INT2, Type::INT4, Type::INT8, Type::OID];
    let floats = [Type::FLOAT4, Type::FLOAT8];
    let timestamps = [Type::TIMESTAMP, Type::TIMESTAMPTZ, Type::DATE];

    if *ty == Type::BOOL {
        ValueKind::Boolean
    } else if integers.contains(ty) {
        ValueKind::Integer
    } else if floats.contains(ty) {
        ValueKind::Floating
    } else if timestamps.contains(ty) {
        ValueKind::Timestamp
    } else if *ty == Type::BYTEA {
        ValueKind::Binary
    } else {
        ValueKind::Text
    }
}

/// Decodes a text-protocol value. Text that does not parse as its column
/// kind is kept verbatim.
fn decode_text(text: Option<&str>, kind: ValueKind) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };
    let decoded = match kind {
        ValueKind::Text => None,
        ValueKind::Integer => text.parse().ok().map(Value::Integer),
        ValueKind::Floating => text
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Value::Floating),
        ValueKind::Boolean => match text {
            "t" => Some(Value::Boolean(true)),
            "f" => Some(Value::Boolean(false)),
            _ => None,
        },
        ValueKind::Timestamp => parse_timestamp(text).map(Value::Timestamp),
        ValueKind::Binary => decode_bytea(text).map(Value::Binary),
    };
    decoded.unwrap_or_else(|| Value::Text(text.to_string()))
}

/// Parses ISO timestamps as printed by the server, keeping the wall-clock
/// time of the reported offset. Dates become midnight.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.naive_local());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Decodes `bytea` hex output (`\x4142`).
fn decode_bytea(text: &str) -> Option<Vec<u8>> {
    let hex = text.strip_prefix("\\x")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
