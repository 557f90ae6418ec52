//! Editor commands typed as `:name [arg]` lines.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `:w [path]`
    Write(Option<PathBuf>),
    /// `:q`
    Quit,
    /// `:tabnew [path]`
    TabNew(Option<PathBuf>),
    TabClose,
    TabNext,
    TabPrev,
    /// `:ai <prompt>`
    Ask(String),
    Cancel,
    /// Insert the stored assist result at the cursor.
    InsertAi,
    Undo,
    Redo,
    Find(String),
    /// 1-based line number.
    Goto(usize),
    Copy,
    Cut,
    Paste,
    Print,
    /// Anything that is not a command: text to insert as a line.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: :{0}")]
    Unknown(String),
    #[error(":{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("Not a line number: {0}")]
    InvalidNumber(String),
}

impl Command {
    /// Parse one input line. Lines not starting with `:` are text; `::`
    /// escapes a literal leading colon.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Self::Text(line.to_string()));
        };
        if rest.starts_with(':') {
            return Ok(Self::Text(rest.to_string()));
        }

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest.trim_end(), ""),
        };
        let path = || (!arg.is_empty()).then(|| PathBuf::from(arg));

        let command = match name {
            "w" | "write" => Self::Write(path()),
            "q" | "quit" => Self::Quit,
            "tabnew" => Self::TabNew(path()),
            "tabclose" => Self::TabClose,
            "tabn" | "tabnext" => Self::TabNext,
            "tabp" | "tabprev" => Self::TabPrev,
            "ai" => Self::Ask(required(arg, "ai")?.to_string()),
            "cancel" => Self::Cancel,
            "insert-ai" => Self::InsertAi,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "find" => Self::Find(required(arg, "find")?.to_string()),
            "goto" => {
                let arg = required(arg, "goto")?;
                let n = arg
                    .parse()
                    .map_err(|_| CommandError::InvalidNumber(arg.to_string()))?;
                Self::Goto(n)
            }
            "copy" => Self::Copy,
            "cut" => Self::Cut,
            "paste" => Self::Paste,
            "print" | "p" => Self::Print,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn required<'a>(arg: &'a str, name: &'static str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(name))
    } else {
        Ok(arg)
    }
}
