use clap::Parser;
use pgsh::cli::Args;
use pgsh::config::Config;
use pgsh::core::db::PostgresConnector;
use pgsh::core::Result;
use pgsh::input::{RawLineSource, ReedlineSource};
use pgsh::logging;
use pgsh::session::Session;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pgsh: error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    info!(connection = ?config.connection, "starting pgsh");

    let connector = PostgresConnector::new(config.connection.clone())?;
    let mut session = Session::connect(connector, &config, io::stdout())?;

    let interactive = io::stdin().is_terminal();
    if interactive {
        session.greet()?;
    }
    if interactive && !args.no_readline {
        let mut source = ReedlineSource::new(
            config.session.history_path(),
            config.session.history_size,
        );
        session.run(&mut source)?;
    } else {
        // The terminal echoes in cooked mode; piped input gets no prompt.
        let mut source = RawLineSource::new(io::stdin(), io::stdout()).with_prompt(interactive);
        session.run(&mut source)?;
    }

    session.close();
    Ok(())
}
