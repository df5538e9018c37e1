use std::collections::BTreeMap;

use crate::cli::{Command, Context, Flag, ValidFlag};
use crate::commands::{invalid_action, missing_flag, single_action, unknown_flag, NAME_FLAG};
use crate::environment;
use crate::error::{Error, Result};

/// `env list|add|remove|load`
pub struct EnvCmd;

const FLAGS: &[ValidFlag] = &[
    NAME_FLAG,
    ValidFlag {
        key: "description",
        labels: &["-desc", "--description"],
    },
    ValidFlag {
        key: "copy",
        labels: &["-c", "--copy"],
    },
];

const HELP: &str = r#"
rqurl env list

  List all the environments. The current one is marked with a *.

rqurl env add --name <name> [--copy <name>] [--description <your description>]

  Create a new environment. With --copy, the variables of that other environment are copied over.
    --name, -n: an arbitrary string to name your environment.
    --copy, -c: an existing environment name.
    --description, -desc: a description of the environment.

rqurl env remove --name <name>

  Delete an environment and its variables. If it is the current environment, the default environment is loaded.
    --name, -n: an existing environment name.

rqurl env load --name <name>

  Use this environment and its variables for all the following requests.
    --name, -n: an existing environment name."#;

#[derive(Default)]
struct EnvFlags<'a> {
    name: Option<&'a str>,
    description: Option<&'a str>,
    copy: Option<&'a str>,
}

impl<'a> EnvFlags<'a> {
    /// Collect the flags `allowed` for one action.
    fn parse(flags: &'a [Flag], allowed: &[&str]) -> Result<Self> {
        let mut parsed = Self::default();
        for flag in flags {
            let key = flag.key.as_str();
            if !allowed.contains(&key) {
                return Err(unknown_flag(key, "env"));
            }
            let value = Some(flag.value.as_str());
            match key {
                "name" => parsed.name = value,
                "description" => parsed.description = value,
                "copy" => parsed.copy = value,
                other => return Err(unknown_flag(other, "env")),
            }
        }
        Ok(parsed)
    }

    fn name(&self) -> Result<&'a str> {
        self.name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| missing_flag("--name", "env"))
    }
}

impl Command for EnvCmd {
    fn commands(&self) -> &'static [&'static str] {
        &["env"]
    }

    fn flags(&self) -> &'static [ValidFlag] {
        FLAGS
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
            "list" => {
                let mut out = String::new();
                for env in ctx.store.list_environments()? {
                    out.push_str(&env.to_string());
                    out.push('\n');
                }
                Ok(out)
            }
            "add" => {
                let parsed = EnvFlags::parse(flags, &["name", "description", "copy"])?;
                let name = parsed.name()?;
                let variables = match parsed.copy.filter(|c| !c.is_empty()) {
                    Some(source) => {
                        ctx.store
                            .find_environment(source)?
                            .ok_or_else(|| Error::NotFound {
                                entity: "environment",
                                name: source.to_string(),
                            })?
                            .variables
                    }
                    None => BTreeMap::new(),
                };
                environment::create(
                    ctx.store,
                    name,
                    variables,
                    parsed.description.unwrap_or_default(),
                )?;
                Ok(format!(
                    "done. use `rqurl env load --name {}` to activate the new environment",
                    name
                ))
            }
            "remove" => {
                let name = EnvFlags::parse(flags, &["name"])?.name()?;
                let mut out = format!("env {} deleted.", name);
                if let Some(default_env) = environment::delete(ctx.store, name)? {
                    ctx.env = default_env;
                    out.push_str(" Default environment loaded.");
                }
                Ok(out)
            }
            "load" => {
                let name = EnvFlags::parse(flags, &["name"])?.name()?;
                ctx.env = environment::load(ctx.store, name)?;
                Ok(format!("{} loaded", name))
            }
            other => Ok(invalid_action(other, HELP)),
        }
    }
}
