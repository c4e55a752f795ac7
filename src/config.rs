//! Command line and environment configuration.
//!
//! Every flag falls back to an `INPUT_*` environment variable so the binary
//! can run unchanged as a CI step.

use clap::{ArgAction, Parser};
use std::{fs, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Parser)]
#[command(name = "ftp-script", version, about = "Run a file operation script against a remote server")]
pub struct Inputs {
    /// Remote host name or address
    #[arg(long, env = "INPUT_HOST")]
    pub host: String,

    #[arg(long, env = "INPUT_PORT", default_value_t = 22)]
    pub port: u16,

    #[arg(long, env = "INPUT_USER")]
    pub user: Option<String>,

    #[arg(long, env = "INPUT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds to wait for the connection to be established
    #[arg(long = "conn-timeout", env = "INPUT_CONNTIMEOUT", default_value_t = 10)]
    pub conn_timeout: u64,

    /// Seconds to wait for each server response
    #[arg(long, env = "INPUT_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Seconds between keepalive messages
    #[arg(long, env = "INPUT_KEEPALIVE", default_value_t = 10)]
    pub keepalive: u64,

    /// Newline separated command lines
    #[arg(long, env = "INPUT_COMMANDS")]
    pub commands: Option<String>,

    /// File to read the command lines from instead of `--commands`
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Whether the first failure fails the whole run
    #[arg(long, env = "INPUT_THROWING", default_value_t = true, action = ArgAction::Set)]
    pub throwing: bool,

    #[arg(long, env = "INPUT_DEBUG")]
    pub debug: bool,

    /// Also write the JSON run result to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Connection parameters handed to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub keepalive: Duration,
}

impl Inputs {
    /// Non-blank, trimmed command lines from `--script` or `--commands`.
    pub fn command_lines(&self) -> Result<Vec<String>> {
        let text = match (&self.script, &self.commands) {
            (Some(path), _) => fs::read_to_string(path)
                .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?,
            (None, Some(commands)) => commands.clone(),
            (None, None) => String::new(),
        };

        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        if lines.is_empty() {
            return Err(Error::Config("The commands is required.".to_owned()));
        }
        Ok(lines)
    }

    pub fn connect_config(&self) -> ConnectConfig {
        ConnectConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            connect_timeout: Duration::from_secs(self.conn_timeout),
            response_timeout: Duration::from_secs(self.timeout),
            keepalive: Duration::from_secs(self.keepalive),
        }
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    fn parse(args: &[&str]) -> Inputs {
        Inputs::try_parse_from(std::iter::once("ftp-script").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let inputs = parse(&["--host", "example.org", "--commands", "ls"]);

        assert_eq!(inputs.port, 22);
        assert!(inputs.throwing);
        assert!(!inputs.debug);

        let config = inputs.connect_config();
        assert_eq!(config.user, "");
        assert_eq!(config.response_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_throwing_takes_a_value() {
        let inputs = parse(&["--host", "h", "--commands", "ls", "--throwing", "false"]);
        assert!(!inputs.throwing);
    }

    #[test]
    fn test_command_lines_are_trimmed() {
        let inputs = parse(&["--host", "h", "--commands", "  cd www\r\n\n put a.txt \n"]);

        assert_eq!(
            inputs.command_lines().unwrap(),
            vec!["cd www".to_owned(), "put a.txt".to_owned()]
        );
    }

    #[test]
    fn test_blank_commands_are_rejected() {
        let inputs = parse(&["--host", "h", "--commands", " \n \n"]);

        let err = inputs.command_lines().unwrap_err();
        assert_eq!(err.to_string(), "The commands is required.");
    }

    #[test]
    fn test_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("deploy.txt");
        std::fs::write(&script, "mkdir /www\nput dist/ /www/\n").unwrap();

        let inputs = parse(&["--host", "h", "--script", &script.to_string_lossy()]);

        assert_eq!(inputs.command_lines().unwrap().len(), 2);
    }
}
