//! Send ad-hoc HTTP requests, save them under hierarchical names and replay
//! them with `%{variable}%` placeholders resolved against the current
//! environment.

pub mod cli;
pub mod commands;
pub mod config;
pub mod environment;
pub mod error;
pub mod expand;
pub mod query;
pub mod store;
pub mod transport;
pub mod tree;

// =====================
// Public API
// =====================

pub use cli::{Cli, Command, Context, Flag, ValidFlag};
pub use config::Config;
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
pub use query::{Method, Query};
pub use store::{SqliteStore, Store};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use tree::QueryTree;

/// Keyword printing the aggregate help.
pub const HELP_COMMAND: &str = "help";

/// Run one command line (without the program name) and return its output.
///
/// The first token is the command keyword; `help` and an empty line print
/// the aggregate help. An unregistered keyword fails with
/// [`Error::UnknownCommand`] before anything is parsed.
pub fn run(cli: &Cli, ctx: &mut Context<'_>, args: &[String]) -> Result<String> {
    let Some((keyword, rest)) = args.split_first() else {
        return Ok(cli.help().to_string());
    };
    if keyword == HELP_COMMAND {
        return Ok(cli.help().to_string());
    }
    if cli.handler(keyword).is_none() {
        return Err(Error::UnknownCommand(keyword.clone()));
    }
    let (actions, flags) = cli.parse_args(rest)?;
    cli.dispatch(ctx, keyword, &actions, &flags)
}
