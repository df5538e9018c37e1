use crate::cli::{Command, Context, Flag, ValidFlag};
use crate::commands::{
    invalid_action, missing_flag, parse_key_value, single_action, unknown_flag, DATA_FLAG,
    NAME_FLAG,
};
use crate::error::Result;

/// `var list|add|remove` on the current environment.
pub struct VarCmd;

const HELP: &str = r#"
rqurl var list

  List the variables of the current environment.

rqurl var add --data key=value

  Create a variable in the current environment. An existing key gets the new value.
    --data, -d: the variable as key=value. Repeatable.

rqurl var remove --name <name>

  Delete a variable from the current environment.
    --name, -n: the variable's key."#;

impl Command for VarCmd {
    fn commands(&self) -> &'static [&'static str] {
        &["var"]
    }

    fn flags(&self) -> &'static [ValidFlag] {
        &[DATA_FLAG, NAME_FLAG]
    }

    fn help(&self) -> &'static str {
        HELP
    }

    fn execute(
        &self,
        ctx: &mut Context<'_>,
        _command: &str,
        actions: &[String],
        flags: &[Flag],
    ) -> Result<String> {
        let action = match single_action(actions, HELP) {
            Ok(action) => action,
            Err(usage) => return Ok(usage),
        };

        match action {
            "list" => Ok(ctx
                .env
                .variables
                .iter()
                .map(|(key, value)| format!("{}: {}\n", key, value))
                .collect()),
            "add" => {
                let mut pairs = Vec::new();
                for flag in flags {
                    match flag.key.as_str() {
                        "data" => pairs.push(parse_key_value(&flag.value, "--data", "var")?),
                        other => return Err(unknown_flag(other, "var")),
                    }
                }
                if pairs.is_empty() {
                    return Err(missing_flag("--data", "var"));
                }
                ctx.env.set_variables(ctx.store, pairs)?;
                Ok("done.".to_string())
            }
            "remove" => {
                let mut name = None;
                for flag in flags {
                    match flag.key.as_str() {
                        "name" => name = Some(flag.value.as_str()),
                        other => return Err(unknown_flag(other, "var")),
                    }
                }
                let name = name
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| missing_flag("--name", "var"))?;
                ctx.env.remove_variable(ctx.store, name)?;
                Ok("done.".to_string())
            }
            other => Ok(invalid_action(other, HELP)),
        }
    }
}
