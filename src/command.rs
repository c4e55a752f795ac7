//! Script commands.
//!
//! Each line is tokenized into a [`CommandRecord`] and then resolved into a
//! [`Command`], which checks the verb and the exact argument count. A whole
//! [`Script`] is resolved before anything is sent to the server.

use std::{fmt, str::FromStr};

use crate::{
    error::{Error, Result},
    tokenizer::tokenize,
};

/// A tokenized command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRecord {
    pub verb: String,
    pub args: Vec<String>,
}

impl CommandRecord {
    pub fn parse(line: &str) -> Self {
        let mut tokens = tokenize(line).into_iter();
        Self {
            verb: tokens.next().unwrap_or_default(),
            args: tokens.collect(),
        }
    }
}

impl fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ls`
    List,
    /// `get <remote> [local]`
    Get {
        remote: String,
        local: Option<String>,
    },
    /// `put <local> [remote]`
    Put {
        local: String,
        remote: Option<String>,
    },
    /// `append <local> [remote]`
    Append {
        local: String,
        remote: Option<String>,
    },
    /// `rename <from> <to>`
    Rename { from: String, to: String },
    /// `delete <path>`
    Delete { path: String },
    /// `cd <path>`
    Cd { path: String },
    /// `mkdir <path>`
    Mkdir { path: String },
    /// `rmdir <path>`
    Rmdir { path: String },
}

impl Command {
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::List => "ls",
            Self::Get { .. } => "get",
            Self::Put { .. } => "put",
            Self::Append { .. } => "append",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
            Self::Cd { .. } => "cd",
            Self::Mkdir { .. } => "mkdir",
            Self::Rmdir { .. } => "rmdir",
        }
    }
}

impl TryFrom<CommandRecord> for Command {
    type Error = Error;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let command = match (record.verb.as_str(), record.args.as_slice()) {
            ("ls", []) => Self::List,
            ("get", [remote]) => Self::Get {
                remote: remote.clone(),
                local: None,
            },
            ("get", [remote, local]) => Self::Get {
                remote: remote.clone(),
                local: Some(local.clone()),
            },
            ("put", [local]) => Self::Put {
                local: local.clone(),
                remote: None,
            },
            ("put", [local, remote]) => Self::Put {
                local: local.clone(),
                remote: Some(remote.clone()),
            },
            ("append", [local]) => Self::Append {
                local: local.clone(),
                remote: None,
            },
            ("append", [local, remote]) => Self::Append {
                local: local.clone(),
                remote: Some(remote.clone()),
            },
            ("rename", [from, to]) => Self::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            ("delete", [path]) => Self::Delete { path: path.clone() },
            ("cd", [path]) => Self::Cd { path: path.clone() },
            ("mkdir", [path]) => Self::Mkdir { path: path.clone() },
            ("rmdir", [path]) => Self::Rmdir { path: path.clone() },
            _ => return Err(Error::UnsupportedCommand(record.to_string())),
        };
        Ok(command)
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Unsupported lines are reported as written, quotes included.
    fn from_str(line: &str) -> Result<Self> {
        Self::try_from(CommandRecord::parse(line)).map_err(|err| match err {
            Error::UnsupportedCommand(_) => Error::UnsupportedCommand(line.trim().to_owned()),
            err => err,
        })
    }
}

/// One resolved line of a script, with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: String,
    pub command: Command,
}

/// An ordered list of resolved commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    /// Resolves every non-blank line, failing on the first unsupported one.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_owned())
            .filter(|line| !line.is_empty())
            .map(|line| -> Result<ScriptLine> {
                let command = line.parse()?;
                Ok(ScriptLine { line, command })
            })
            .collect::<Result<_>>()?;

        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromStr for Script {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_lines(text.lines())
    }
}

impl IntoIterator for Script {
    type Item = ScriptLine;
    type IntoIter = std::vec::IntoIter<ScriptLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

#[cfg(test)]
mod test_command {
    use super::*;

    #[test]
    fn test_optional_destination() {
        assert_eq!(
            "get remote.txt".parse::<Command>().unwrap(),
            Command::Get {
                remote: "remote.txt".to_owned(),
                local: None
            }
        );
        assert_eq!(
            "put \"my file.txt\" /upload/".parse::<Command>().unwrap(),
            Command::Put {
                local: "my file.txt".to_owned(),
                remote: Some("/upload/".to_owned())
            }
        );
    }

    #[test]
    fn test_exact_arity() {
        assert!("ls".parse::<Command>().is_ok());
        assert!(matches!(
            "ls -la".parse::<Command>(),
            Err(Error::UnsupportedCommand(line)) if line == "ls -la"
        ));
        assert!("rename a".parse::<Command>().is_err());
        assert!("get a b c".parse::<Command>().is_err());
        assert!("cd".parse::<Command>().is_err());
    }

    #[test]
    fn test_unknown_verb() {
        assert!(matches!(
            "chmod 755 a".parse::<Command>(),
            Err(Error::UnsupportedCommand(_))
        ));
        assert!(matches!(
            "".parse::<Command>(),
            Err(Error::UnsupportedCommand(_))
        ));
    }

    #[test]
    fn test_verbs_are_case_sensitive() {
        assert!("LS".parse::<Command>().is_err());
    }

    #[test]
    fn test_script_skips_blank_lines() {
        let script: Script = "  cd www\r\n\n   \nput index.html\r\n".parse().unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(script.lines()[0].line, "cd www");
        assert_eq!(script.lines()[1].command.verb(), "put");
    }

    #[test]
    fn test_script_rejects_any_bad_line() {
        let err = Script::from_lines(["ls", "bogus arg", "ls"]).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported command \"bogus arg\"");
    }

    #[test]
    fn test_unsupported_line_keeps_its_quotes() {
        assert!(matches!(
            "  rename \"a b\"  ".parse::<Command>(),
            Err(Error::UnsupportedCommand(line)) if line == "rename \"a b\""
        ));

        let err = Script::from_lines(["ls", "rename \"a b\""]).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported command \"rename \"a b\"\"");
    }
}
