use crate::cli::{Command, Context, Flag, ValidFlag};
use crate::commands::{missing_flag, unknown_flag, NAME_FLAG};
use crate::error::Result;
use crate::query::Query;

/// Replays a saved query with the current environment.
pub struct LoadCmd;

const HELP: &str = r#"
rqurl load --name <name>

  Send the saved query, expanding its %{variable}% placeholders with the current environment."#;

impl Command for LoadCmd {
    fn commands(&self) -> &'static [&'static str] {
        &["load"]
    }

    fn flags(&self) -> &'static [ValidFlag] {
        &[NAME_FLAG]
    }

    fn help(&self) -> &'static str {
        HELP
    }

    fn execute(
        &self,
        ctx: &mut Context<'_>,
        _command: &str,
        _actions: &[String],
        flags: &[Flag],
    ) -> Result<String> {
        let mut name = None;
        for flag in flags {
            match flag.key.as_str() {
                "name" => name = Some(flag.value.as_str()),
                other => return Err(unknown_flag(other, "load")),
            }
        }
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| missing_flag("--name", "load"))?;

        let query = Query::load(ctx.store, name)?;
        query.send(&ctx.env, ctx.transport)
    }
}
