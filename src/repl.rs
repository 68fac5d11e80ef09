/// Meta-Command Module
///
/// Backslash commands and their word shortcuts are looked up in a static
/// catalog. Each entry names its tokens, whether it takes an argument and
/// how to build the [`Command`] the session dispatches.

use crate::core::db::CatalogQuery;
use once_cell::sync::Lazy;
use regex::Regex;

/// A recognised meta-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    SqlHelp(Option<String>),
    List(CatalogQuery),
    Connect(String),
    Describe(String),
    ToggleExpanded,
    ToggleTiming,
    ConnInfo,
    /// A known command invoked with a missing or unusable argument
    Invalid(String),
}

/// What a catalog entry accepts after its token.
#[derive(Debug, Clone, Copy)]
enum Argument {
    /// Nothing; trailing text means the input is not this command
    None,
    /// Optional free text
    Text,
    /// An identifier, possibly double-quoted
    Name { required: bool, what: &'static str },
}

struct CatalogEntry {
    /// Exact, case-sensitive command tokens
    tokens: &'static [&'static str],
    /// Bare words accepted case-insensitively
    keywords: &'static [&'static str],
    argument: Argument,
    build: fn(Option<String>) -> Command,
}

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        tokens: &["\\?"],
        keywords: &["help"],
        argument: Argument::None,
        build: |_| Command::Help,
    },
    CatalogEntry {
        tokens: &["\\q"],
        keywords: &["exit", "quit"],
        argument: Argument::None,
        build: |_| Command::Quit,
    },
    CatalogEntry {
        tokens: &["\\h"],
        keywords: &[],
        argument: Argument::Text,
        build: Command::SqlHelp,
    },
    CatalogEntry {
        tokens: &["\\l", "\\list"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Databases),
    },
    CatalogEntry {
        tokens: &["\\c", "\\connect"],
        keywords: &[],
        argument: Argument::Name {
            required: true,
            what: "database name",
        },
        build: |name| Command::Connect(name.unwrap_or_default()),
    },
    CatalogEntry {
        tokens: &["\\d"],
        keywords: &[],
        argument: Argument::Name {
            required: false,
            what: "table name",
        },
        build: |name| match name {
            Some(table) => Command::Describe(table),
            None => Command::List(CatalogQuery::DefaultSchemaTables),
        },
    },
    CatalogEntry {
        tokens: &["\\dt", "\\dt+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Tables),
    },
    CatalogEntry {
        tokens: &["\\dn", "\\dn+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Schemas),
    },
    CatalogEntry {
        tokens: &["\\dv", "\\dv+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Views),
    },
    CatalogEntry {
        tokens: &["\\di", "\\di+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Indexes),
    },
    CatalogEntry {
        tokens: &["\\ds", "\\ds+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Sequences),
    },
    CatalogEntry {
        tokens: &["\\df", "\\df+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Functions),
    },
    CatalogEntry {
        tokens: &["\\du", "\\du+"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::List(CatalogQuery::Roles),
    },
    CatalogEntry {
        tokens: &["\\x"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::ToggleExpanded,
    },
    CatalogEntry {
        tokens: &["\\timing"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::ToggleTiming,
    },
    CatalogEntry {
        tokens: &["\\conninfo"],
        keywords: &[],
        argument: Argument::None,
        build: |_| Command::ConnInfo,
    },
];

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"((?:[^"]|"")+)"|([^\s"]+))$"#).expect("identifier pattern is valid")
});

/// Unquotes a `"double quoted"` identifier; plain words pass through.
fn parse_identifier(arg: &str) -> Option<String> {
    let caps = IDENTIFIER.captures(arg)?;
    if let Some(quoted) = caps.get(1) {
        return Some(quoted.as_str().replace("\"\"", "\""));
    }
    caps.get(2).map(|m| m.as_str().to_string())
}

impl CatalogEntry {
    fn matches(&self, token: &str) -> bool {
        self.tokens.contains(&token) || self.keywords.iter().any(|k| token.eq_ignore_ascii_case(k))
    }

    fn parse(&self, arg: Option<&str>) -> Option<Command> {
        match (self.argument, arg) {
            (Argument::None, Some(_)) => None,
            (Argument::None, None) | (Argument::Text, None) => Some((self.build)(None)),
            (Argument::Text, Some(text)) => Some((self.build)(Some(text.to_string()))),
            (Argument::Name { required: true, what }, None) => {
                Some(Command::Invalid(format!("{} required", what)))
            }
            (Argument::Name { required: false, .. }, None) => Some((self.build)(None)),
            (Argument::Name { what, .. }, Some(arg)) => Some(match parse_identifier(arg) {
                Some(name) => (self.build)(Some(name)),
                None => Command::Invalid(format!("invalid {}: {}", what, arg)),
            }),
        }
    }
}

/// Looks `input` up in the meta-command catalog.
///
/// Returns `None` when the input is not a meta-command; the caller then
/// treats it as SQL.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    let (token, arg) = match input.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (input, None),
    };
    CATALOG
        .iter()
        .find(|entry| entry.matches(token))
        .and_then(|entry| entry.parse(arg))
}

pub const HELP_TEXT: &str = r#"
General
  \?, help               show this help
  \q, exit, quit         quit pgsh

Connection
  \c [DBNAME]            connect to new database
  \conninfo              display information about connection

Informational
  \d [NAME]              describe table, or list tables when no name is given
  \dt[+]                 list tables
  \dv[+]                 list views
  \di[+]                 list indexes
  \ds[+]                 list sequences
  \df[+]                 list functions
  \dn[+]                 list schemas
  \du[+]                 list roles
  \l, \list              list databases

Formatting
  \x                     toggle expanded output
  \timing                toggle timing of commands

Transaction
  BEGIN                  start a transaction
  COMMIT                 commit current transaction
  ROLLBACK               rollback current transaction

Query Buffer
  \h [NAME]              help on syntax of SQL commands

"#;

/// Text printed by `\h`.
pub fn sql_help(topic: Option<&str>) -> String {
    match topic {
        None => "Available help:\n\
                 \x20 SELECT, INSERT, UPDATE, DELETE\n\
                 \x20 CREATE TABLE, DROP TABLE, ALTER TABLE\n\
                 \x20 CREATE INDEX, DROP INDEX\n\
                 \x20 BEGIN, COMMIT, ROLLBACK\n\
                 Use \\h <command> for help on specific command\n\n"
            .to_string(),
        Some(topic) => format!(
            "No detailed help available for: {}\nPlease refer to PostgreSQL documentation.\n\n",
            topic
        ),
    }
}
