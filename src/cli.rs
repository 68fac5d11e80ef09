use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{Config, SslMode};

/// Command-line flags. Connection flags follow psql, so `-h` is the host
/// and help is only available as `--help`.
#[derive(Parser, Debug, Clone)]
#[command(name = "pgsh", version, about, disable_help_flag = true)]
pub struct Args {
    /// Database server host
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Database server port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Database user name
    #[arg(short = 'U', long)]
    pub username: Option<String>,

    /// Database to connect to
    #[arg(short = 'd', long)]
    pub dbname: Option<String>,

    /// Password; prefer the PGPASSWORD environment variable
    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// disable, require, verify-ca or verify-full
    #[arg(long)]
    pub sslmode: Option<SslMode>,

    /// Configuration file (default: <config dir>/pgsh/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum rows displayed per result
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Read plain lines from stdin without line editing or history
    #[arg(long)]
    pub no_readline: bool,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Args {
    /// Overrides file settings with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        let conn = &mut config.connection;
        if let Some(host) = &self.host {
            conn.host = host.clone();
        }
        if let Some(port) = self.port {
            conn.port = port;
        }
        if let Some(user) = &self.username {
            conn.user = user.clone();
        }
        if let Some(database) = &self.dbname {
            conn.database = database.clone();
        }
        if let Some(password) = &self.password {
            conn.password = password.clone();
        }
        if let Some(mode) = self.sslmode {
            conn.sslmode = mode;
        }
        if let Some(max_rows) = self.max_rows {
            config.session.max_rows = max_rows;
        }
    }
}
