use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

use rqurl::config::{self, Config, APP_NAME, DATABASE_FILE};
use rqurl::{commands, Context, ErrorKind, ReqwestTransport, SqliteStore};

const LOG_ENV_VAR: &str = "RQURL_LOG";

/// Send, save and replay HTTP queries.
///
/// Everything after the global options is handed to the command line
/// parser of rqurl: `rqurl get --url https://example.com -d q=rust`.
#[derive(Debug, Parser)]
#[command(name = APP_NAME, version)]
struct Args {
    /// Directory holding the query database and config.yaml
    /// (defaults to $RQURL_HOME, then ~/.rqurl).
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug information to stderr.
    #[arg(long)]
    verbose: bool,

    /// Command keyword followed by its actions and flags.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    match real_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn real_main() -> Result<i32> {
    let args = Args::parse();
    init_tracing_subscriber(args.verbose);

    if args.command.is_empty() {
        println!(
            "{} v.{}\nUse `{} help` for doc",
            APP_NAME,
            env!("CARGO_PKG_VERSION"),
            APP_NAME
        );
        return Ok(0);
    }

    let data_dir = config::data_dir(args.data_dir).context("Failed to prepare data directory")?;
    let config = Config::load(&data_dir)?;
    let store = SqliteStore::open(&data_dir.join(DATABASE_FILE))
        .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;
    let transport = ReqwestTransport::new(&config)?;

    let cli = commands::default_cli().context("error while registering commands")?;
    let mut ctx = Context::new(&store, &transport)?;

    match rqurl::run(&cli, &mut ctx, &args.command) {
        Ok(output) => {
            println!("{}", output);
            Ok(0)
        }
        Err(err) => {
            tracing::debug!(kind = ?err.kind(), "command failed");
            eprintln!("Error: {}", err);
            Ok(exit_code(err.kind()))
        }
    }
}

/// 2 for usage mistakes, 1 for everything else.
fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::ParseError | ErrorKind::ValidationError => 2,
        _ => 1,
    }
}

fn init_tracing_subscriber(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    for directive in ["reqwest=warn", "hyper=warn", "hyper_util=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(ChronoLocal::rfc_3339())
        .init();
}
