//! The built-in command handlers.

mod env;
mod list;
mod load;
mod request;
mod var;

pub use env::EnvCmd;
pub use list::ListCmd;
pub use load::LoadCmd;
pub use request::RequestCmd;
pub use var::VarCmd;

use crate::cli::{Cli, Command, ValidFlag};
use crate::error::{Error, Result};

pub(crate) const NAME_FLAG: ValidFlag = ValidFlag {
    key: "name",
    labels: &["-n", "--name"],
};
pub(crate) const DATA_FLAG: ValidFlag = ValidFlag {
    key: "data",
    labels: &["-d", "--data"],
};

/// Every built-in handler, in help order.
#[must_use]
pub fn all() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(RequestCmd),
        Box::new(LoadCmd),
        Box::new(ListCmd),
        Box::new(EnvCmd),
        Box::new(VarCmd),
    ]
}

/// A [`Cli`] with every built-in handler registered.
pub fn default_cli() -> Result<Cli> {
    let mut cli = Cli::new();
    cli.register(all())?;
    Ok(cli)
}

/// Split `key=value` at the first `=`.
pub(crate) fn parse_key_value(raw: &str, label: &str, command: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(Error::validation(format!(
            "wrong formatting {}. The {} flag must be {} key=value. Use `rqurl {}` to list all the options",
            raw, label, label, command
        ))),
    }
}

pub(crate) fn unknown_flag(key: &str, command: &str) -> Error {
    Error::validation(format!(
        "the {} flag is unknown. Use `rqurl {}` to list all the options",
        key, command
    ))
}

pub(crate) fn missing_flag(label: &str, command: &str) -> Error {
    Error::validation(format!(
        "the {} flag is mandatory. Use `rqurl {}` to list all the options",
        label, command
    ))
}

/// The single action of a multi-action command, or the usage text to print
/// instead.
pub(crate) fn single_action<'a>(
    actions: &'a [String],
    help: &str,
) -> std::result::Result<&'a str, String> {
    match actions {
        [] => Err(format!(
            "No action provided. You must provide one of the actions below:\n{}\n",
            help
        )),
        [action] => Ok(action.as_str()),
        _ => Err(format!(
            "Too many actions provided ({}). You must provide one of the actions below:\n{}\n",
            actions.len(),
            help
        )),
    }
}

/// Invalid-action usage text.
pub(crate) fn invalid_action(action: &str, help: &str) -> String {
    format!(
        "Invalid action provided ({}). You must provide one of the actions below:\n{}\n",
        action, help
    )
}
