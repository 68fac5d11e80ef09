use crate::core::{PgshError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub session: SessionConfig,
}

/// How the client negotiates TLS with the server.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    #[default]
    Disable,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    /// Value passed to the driver's `sslmode` key. The driver only knows
    /// `disable` and `require`; verification is set on the TLS connector.
    pub fn driver_value(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => "require",
        }
    }

    /// Whether the server certificate chain must be trusted.
    pub fn verifies_certificate(self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }

    /// Whether the certificate must also match the host name.
    pub fn verifies_hostname(self) -> bool {
        self == SslMode::VerifyFull
    }
}

impl FromStr for SslMode {
    type Err = PgshError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "disable" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(PgshError::Config(format!(
                "invalid sslmode '{}': expected disable, require, verify-ca or verify-full",
                other
            ))),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        })
    }
}

/// Connection settings; everything needed to build a DSN and a pool.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub sslmode: SslMode,
    pub connect_timeout_secs: u64,
    /// Server-side statement timeout; 0 leaves the server default.
    pub statement_timeout_ms: u64,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime_secs: u64,
    pub application_name: String,
    pub search_path: Option<String>,
    pub timezone: Option<String>,
    /// Appended verbatim to the DSN.
    pub extra_params: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            sslmode: SslMode::Disable,
            connect_timeout_secs: 10,
            statement_timeout_ms: 0,
            max_open_conns: 10,
            max_idle_conns: 5,
            conn_max_lifetime_secs: 3600,
            application_name: "pgsh".to_string(),
            search_path: None,
            timezone: None,
            extra_params: None,
        }
    }
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database", &self.database)
            .field("sslmode", &self.sslmode)
            .field("max_open_conns", &self.max_open_conns)
            .field("max_idle_conns", &self.max_idle_conns)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn conn_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.conn_max_lifetime_secs)
    }

    /// Builds the key/value DSN for `database`.
    pub fn to_dsn(&self, database: &str) -> String {
        self.build_dsn(database, &self.password)
    }

    /// The DSN with the password masked, for logging.
    pub fn redacted_dsn(&self, database: &str) -> String {
        let mask = if self.password.is_empty() { "" } else { "********" };
        self.build_dsn(database, mask)
    }

    fn build_dsn(&self, database: &str, password: &str) -> String {
        let mut parts = vec![
            format!("host={}", dsn_quote(&self.host)),
            format!("port={}", self.port),
            format!("user={}", dsn_quote(&self.user)),
            format!("password={}", dsn_quote(password)),
            format!("dbname={}", dsn_quote(database)),
            format!("sslmode={}", self.sslmode.driver_value()),
            format!("connect_timeout={}", self.connect_timeout_secs),
        ];
        if !self.application_name.is_empty() {
            parts.push(format!("application_name={}", dsn_quote(&self.application_name)));
        }

        let mut options = Vec::new();
        if let Some(path) = self.search_path.as_deref().filter(|s| !s.is_empty()) {
            options.push(format!("-c search_path={}", path));
        }
        if let Some(tz) = self.timezone.as_deref().filter(|s| !s.is_empty()) {
            options.push(format!("-c TimeZone={}", tz));
        }
        if self.statement_timeout_ms > 0 {
            options.push(format!("-c statement_timeout={}", self.statement_timeout_ms));
        }
        if !options.is_empty() {
            parts.push(format!("options={}", dsn_quote(&options.join(" "))));
        }

        if let Some(extra) = self.extra_params.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(extra.trim().to_string());
        }
        parts.join(" ")
    }
}

/// Quotes a DSN value when it is empty or contains characters that would
/// otherwise end it early.
fn dsn_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if plain {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Session engine settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub max_rows: usize,
    pub expanded: bool,
    pub timing: bool,
    /// Bound for generic statements.
    pub statement_timeout_secs: u64,
    /// Bound for transaction keywords and table descriptions.
    pub transaction_timeout_secs: u64,
    pub history_file: Option<PathBuf>,
    pub history_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_rows: 1000,
            expanded: false,
            timing: false,
            statement_timeout_secs: 60,
            transaction_timeout_secs: 30,
            history_file: None,
            history_size: 1000,
        }
    }
}

impl SessionConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }

    /// Configured history file, or `~/.pgsh_history`.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".pgsh_history")))
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(content).map_err(|e| PgshError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, or from the default location when
    /// no path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => load_config(path),
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => load_config(path),
                None => Ok(Config::default()),
            },
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.connection.connect_timeout_secs == 0 {
            return Err(PgshError::Config(
                "connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.connection.max_open_conns == 0 {
            return Err(PgshError::Config(
                "max_open_conns must be at least 1".to_string(),
            ));
        }
        if self.session.max_rows == 0 {
            return Err(PgshError::Config("max_rows must be at least 1".to_string()));
        }
        if self.session.statement_timeout_secs == 0 || self.session.transaction_timeout_secs == 0 {
            return Err(PgshError::Config(
                "statement and transaction timeouts must be non-zero".to_string(),
            ));
        }
        if self.session.transaction_timeout_secs >= self.session.statement_timeout_secs {
            return Err(PgshError::Config(
                "transaction_timeout_secs must be shorter than statement_timeout_secs".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config dir>/pgsh/config.toml`, e.g. `~/.config/pgsh/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pgsh").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| PgshError::Config(format!("{}: {}", path.display(), e)))?;
    Config::from_toml(&content)
}
