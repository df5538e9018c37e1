use crate::cli::{Command, Context, Flag, ValidFlag};
use crate::error::Result;

/// Prints the tree of saved queries.
pub struct ListCmd;

impl Command for ListCmd {
    fn commands(&self) -> &'static [&'static str] {
        &["list"]
    }

    fn flags(&self) -> &'static [ValidFlag] {
        &[]
    }

    fn help(&self) -> &'static str {
        "
rqurl list

  List all the saved queries."
    }

    fn execute(
        &self,
        ctx: &mut Context<'_>,
        _command: &str,
        _actions: &[String],
        _flags: &[Flag],
    ) -> Result<String> {
        Ok(ctx.tree.render(None, ""))
    }
}
