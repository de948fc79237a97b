//! Line commands for the interactive session
use crate::kernel::lifecycle::Action;

pub const SHELL_HELP: &str = "\
commands:
  refresh         re-read the module inventory
  list [REGEX]    show the current inventory, optionally filtered by name
  show NAME       show one module
  load NAME       load a module
  unload NAME     unload a module
  help            this text
  quit            leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Refresh,
    List(Option<String>),
    Show(String),
    Apply(Action, String),
    Help,
    Quit,
    Empty,
}

/// Parse one input line. Errors are user-facing messages.
pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let argument = words.next().map(str::to_string);
    if words.next().is_some() {
        return Err(format!("too many arguments for '{}'", verb));
    }

    let need_name = |argument: Option<String>| {
        argument.ok_or_else(|| format!("'{}' needs a module name", verb))
    };

    match verb {
        "refresh" | "r" => Ok(ShellCommand::Refresh),
        "list" | "ls" => Ok(ShellCommand::List(argument)),
        "show" => Ok(ShellCommand::Show(need_name(argument)?)),
        "load" => Ok(ShellCommand::Apply(Action::Load, need_name(argument)?)),
        "unload" => Ok(ShellCommand::Apply(Action::Unload, need_name(argument)?)),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command '{}' (try 'help')", other)),
    }
}
