//! Command registry, flag parser and dispatcher.
//!
//! Every command handler declares the keywords it answers to and the flags
//! it accepts. Registration makes sure no keyword is claimed twice and that
//! a flag label means the same thing everywhere: if `-d` means `data` for
//! one command, it means `data` for all of them.

use std::collections::HashMap;

use crate::environment::{self, Environment};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::transport::Transport;
use crate::tree::QueryTree;

/// Every flag label starts with this character.
pub const FLAG_PREFIX: char = '-';

const HELP_BANNER: &str = "rqurl - send, save and replay HTTP queries";

/// A flag a command accepts: one semantic key and the labels that mean it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidFlag {
    /// The key `execute` matches on, ex: `"data"`.
    pub key: &'static str,
    /// Labels typed by the user, ex: `["-d", "--data"]`.
    pub labels: &'static [&'static str],
}

/// A flag resolved by [`Cli::parse_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub key: String,
    pub value: String,
}

impl Flag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything a handler may touch while executing.
pub struct Context<'a> {
    pub store: &'a dyn Store,
    pub transport: &'a dyn Transport,
    /// The active environment, used for placeholder expansion.
    pub env: Environment,
    pub tree: QueryTree,
}

impl<'a> Context<'a> {
    /// Resolve the current environment and index the saved queries.
    pub fn new(store: &'a dyn Store, transport: &'a dyn Transport) -> Result<Self> {
        let env = environment::init(store)?;
        let tree = QueryTree::from_queries(&store.list_queries()?);
        Ok(Self {
            store,
            transport,
            env,
            tree,
        })
    }
}

/// Contract shared by all command handlers.
pub trait Command {
    /// Keywords leading to this handler, ex: `["get", "post"]`.
    fn commands(&self) -> &'static [&'static str];
    fn flags(&self) -> &'static [ValidFlag];
    fn help(&self) -> &'static str;
    /// `actions` are the non-flag tokens following the keyword, in order.
    fn execute(
        &self,
        ctx: &mut Context<'_>,
        command: &str,
        actions: &[String],
        flags: &[Flag],
    ) -> Result<String>;
}

/// The commands' orchestrator.
pub struct Cli {
    handlers: Vec<Box<dyn Command>>,
    /// keyword -> index in `handlers`
    commands: HashMap<String, usize>,
    /// label -> flag key
    flags: HashMap<String, String>,
    help: String,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            commands: HashMap::new(),
            flags: HashMap::new(),
            help: HELP_BANNER.to_string(),
        }
    }

    /// Index the keywords and flag labels of `handlers`.
    pub fn register(&mut self, handlers: Vec<Box<dyn Command>>) -> Result<()> {
        for handler in handlers {
            let idx = self.handlers.len();

            for keyword in handler.commands() {
                match self.commands.get(*keyword) {
                    Some(owner) if *owner != idx => {
                        return Err(Error::DuplicateCommand {
                            keyword: (*keyword).to_string(),
                        });
                    }
                    _ => {
                        self.commands.insert((*keyword).to_string(), idx);
                    }
                }
            }

            for valid in handler.flags() {
                for label in valid.labels {
                    if !label.starts_with(FLAG_PREFIX) {
                        return Err(Error::MalformedFlag {
                            label: (*label).to_string(),
                        });
                    }
                    match self.flags.get(*label) {
                        Some(existing) if existing != valid.key => {
                            return Err(Error::ConflictingFlagMeaning {
                                label: (*label).to_string(),
                                existing: existing.clone(),
                                requested: valid.key.to_string(),
                            });
                        }
                        _ => {
                            self.flags.insert((*label).to_string(), valid.key.to_string());
                        }
                    }
                }
            }

            self.help.push_str("\n\n");
            self.help.push_str(handler.help().trim_matches('\n'));
            tracing::debug!(commands = ?handler.commands(), "registered command");
            self.handlers.push(handler);
        }
        Ok(())
    }

    /// Split the tokens following the command keyword into actions and
    /// flags. The keyword itself is never part of `args`: [`crate::run`]
    /// strips it first, so `get -u http://x` reaches here as `-u http://x`
    /// and yields no actions. A flag always consumes the next token as its
    /// value; values are not validated here.
    pub fn parse_args(&self, args: &[String]) -> Result<(Vec<String>, Vec<Flag>)> {
        let mut actions = Vec::new();
        let mut flags = Vec::new();
        let mut tokens = args.iter();
        while let Some(arg) = tokens.next() {
            if !arg.starts_with(FLAG_PREFIX) {
                actions.push(arg.clone());
                continue;
            }
            let key = self
                .flags
                .get(arg)
                .ok_or_else(|| Error::UnknownFlag(arg.clone()))?;
            let value = tokens
                .next()
                .ok_or_else(|| Error::MissingFlagValue(arg.clone()))?;
            flags.push(Flag::new(key.clone(), value.clone()));
        }
        Ok((actions, flags))
    }

    #[must_use]
    pub fn handler(&self, keyword: &str) -> Option<&dyn Command> {
        self.commands
            .get(keyword)
            .map(|idx| self.handlers[*idx].as_ref())
    }

    /// Run the handler bound to `keyword`.
    pub fn dispatch(
        &self,
        ctx: &mut Context<'_>,
        keyword: &str,
        actions: &[String],
        flags: &[Flag],
    ) -> Result<String> {
        let handler = self
            .handler(keyword)
            .ok_or_else(|| Error::UnknownCommand(keyword.to_string()))?;
        tracing::debug!(keyword, ?actions, flags = flags.len(), "dispatching command");
        handler.execute(ctx, keyword, actions, flags)
    }

    /// Aggregate help of every registered command.
    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        commands: &'static [&'static str],
        flags: &'static [ValidFlag],
        help: &'static str,
    }

    impl Command for Fake {
        fn commands(&self) -> &'static [&'static str] {
            self.commands
        }
        fn flags(&self) -> &'static [ValidFlag] {
            self.flags
        }
        fn help(&self) -> &'static str {
            self.help
        }
        fn execute(
            &self,
            _ctx: &mut Context<'_>,
            command: &str,
            actions: &[String],
            flags: &[Flag],
        ) -> Result<String> {
            Ok(format!("{} {:?} {}", command, actions, flags.len()))
        }
    }

    const URL_FLAG: ValidFlag = ValidFlag {
        key: "url",
        labels: &["-u", "--url"],
    };
    const DATA_FLAG: ValidFlag = ValidFlag {
        key: "data",
        labels: &["-d", "--data"],
    };
    const DESC_FLAG: ValidFlag = ValidFlag {
        key: "description",
        labels: &["-d", "--description"],
    };

    fn fake(commands: &'static [&'static str], flags: &'static [ValidFlag]) -> Box<dyn Command> {
        Box::new(Fake {
            commands,
            flags,
            help: "fake help",
        })
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn request_cli() -> Cli {
        let mut cli = Cli::new();
        cli.register(vec![fake(&["get", "post"], &[URL_FLAG, DATA_FLAG])])
            .unwrap();
        cli
    }

    // ==================== register tests ====================

    #[test]
    fn test_register_disjoint_handlers() {
        let mut cli = Cli::new();
        cli.register(vec![fake(&["get"], &[URL_FLAG]), fake(&["env"], &[])])
            .unwrap();
        assert!(cli.handler("get").is_some());
        assert!(cli.handler("env").is_some());
        assert!(cli.handler("put").is_none());
    }

    #[test]
    fn test_register_duplicate_keyword_any_order() {
        let orders: [Vec<Box<dyn Command>>; 2] = [
            vec![fake(&["get", "post"], &[]), fake(&["list", "get"], &[])],
            vec![fake(&["list", "get"], &[]), fake(&["get", "post"], &[])],
        ];
        for handlers in orders {
            let mut cli = Cli::new();
            let err = cli.register(handlers).unwrap_err();
            assert!(matches!(err, Error::DuplicateCommand { ref keyword } if keyword == "get"));
            assert_eq!(err.kind(), crate::error::ErrorKind::RegistrationConflict);
        }
    }

    #[test]
    fn test_register_shared_flag_same_key() {
        let mut cli = Cli::new();
        cli.register(vec![fake(&["get"], &[DATA_FLAG]), fake(&["var"], &[DATA_FLAG])])
            .unwrap();
    }

    #[test]
    fn test_register_conflicting_flag_meaning() {
        let mut cli = Cli::new();
        let err = cli
            .register(vec![fake(&["get"], &[DATA_FLAG]), fake(&["env"], &[DESC_FLAG])])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConflictingFlagMeaning { ref label, ref existing, ref requested }
                if label == "-d" && existing == "data" && requested == "description"
        ));
    }

    #[test]
    fn test_register_malformed_flag() {
        const BAD: ValidFlag = ValidFlag {
            key: "url",
            labels: &["url"],
        };
        let mut cli = Cli::new();
        let err = cli.register(vec![fake(&["get"], &[BAD])]).unwrap_err();
        assert!(matches!(err, Error::MalformedFlag { .. }));
    }

    #[test]
    fn test_register_concatenates_help() {
        let mut cli = Cli::new();
        cli.register(vec![fake(&["a"], &[]), fake(&["b"], &[])]).unwrap();
        assert_eq!(
            cli.help(),
            format!("{}\n\nfake help\n\nfake help", HELP_BANNER)
        );
    }

    // ==================== parse_args tests ====================

    #[test]
    fn test_parse_args_flag_with_value() {
        let cli = request_cli();
        let (actions, flags) = cli.parse_args(&args(&["-u", "http://x"])).unwrap();
        assert!(actions.is_empty());
        assert_eq!(flags, vec![Flag::new("url", "http://x")]);
    }

    #[test]
    fn test_parse_args_keeps_action_order() {
        let cli = request_cli();
        let (actions, flags) = cli
            .parse_args(&args(&["add", "--data", "a=1", "more", "-d", "b=2"]))
            .unwrap();
        assert_eq!(actions, vec!["add", "more"]);
        assert_eq!(
            flags,
            vec![Flag::new("data", "a=1"), Flag::new("data", "b=2")]
        );
    }

    #[test]
    fn test_parse_args_value_may_look_like_flag() {
        let cli = request_cli();
        let (_, flags) = cli.parse_args(&args(&["-d", "-u"])).unwrap();
        assert_eq!(flags, vec![Flag::new("data", "-u")]);
    }

    #[test]
    fn test_parse_args_missing_value() {
        let cli = request_cli();
        let err = cli.parse_args(&args(&["-u"])).unwrap_err();
        assert!(matches!(err, Error::MissingFlagValue(ref l) if l == "-u"));
    }

    #[test]
    fn test_parse_args_unknown_flag() {
        let cli = request_cli();
        let err = cli.parse_args(&args(&["--verbose", "1"])).unwrap_err();
        assert!(matches!(err, Error::UnknownFlag(ref l) if l == "--verbose"));
    }

    #[test]
    fn test_parse_args_empty() {
        let cli = request_cli();
        let (actions, flags) = cli.parse_args(&[]).unwrap();
        assert!(actions.is_empty());
        assert!(flags.is_empty());
    }
}
