//! Runs a script against a [`Session`].
//!
//! The interpreter is a two-state machine. It starts [`State::Running`] and
//! executes commands in order until the script is exhausted or a command
//! fails, and then it is [`State::Stopped`] for good. With the throwing
//! policy a failure is returned as an error; without it the failure message
//! is kept in the [`RunResult`] and the run still ends there.

use serde::Serialize;

use crate::{
    channel::RemoteChannel,
    command::{Command, Script, ScriptLine},
    error::{Error, Result},
    local::{LocalFs, TokioFs},
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Stopped,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub succeeded_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl RunResult {
    fn failed(succeeded_count: usize, err: &Error) -> Self {
        Self {
            succeeded_count,
            failure_message: Some(err.to_string()),
        }
    }
}

pub struct Interpreter<'s, C, F = TokioFs> {
    session: &'s mut Session<C, F>,
    pending: std::vec::IntoIter<ScriptLine>,
    throwing: bool,
    state: State,
    result: RunResult,
}

impl<'s, C, F> Interpreter<'s, C, F>
where
    C: RemoteChannel,
    F: LocalFs,
{
    pub fn new(session: &'s mut Session<C, F>, script: Script, throwing: bool) -> Self {
        Self {
            session,
            pending: script.into_iter(),
            throwing,
            state: State::Running,
            result: RunResult::default(),
        }
    }

    pub const fn state(&self) -> State {
        self.state
    }

    pub const fn result(&self) -> &RunResult {
        &self.result
    }

    /// Executes the next command and returns the state afterwards.
    ///
    /// Once stopped, further steps do nothing.
    pub async fn step(&mut self) -> Result<State> {
        if self.state == State::Stopped {
            return Ok(State::Stopped);
        }

        let Some(ScriptLine { line, command }) = self.pending.next() else {
            self.state = State::Stopped;
            return Ok(State::Stopped);
        };

        info!("Execute '{line}'");
        match execute(self.session, command).await {
            Ok(()) => {
                self.result.succeeded_count += 1;
                Ok(State::Running)
            }
            Err(err) => {
                self.state = State::Stopped;
                if self.throwing {
                    return Err(err);
                }
                warn!("{err}");
                self.result = RunResult::failed(self.result.succeeded_count, &err);
                Ok(State::Stopped)
            }
        }
    }

    /// Steps until stopped.
    pub async fn run(mut self) -> Result<RunResult> {
        while self.step().await? == State::Running {}
        Ok(self.result)
    }
}

async fn execute<C, F>(session: &mut Session<C, F>, command: Command) -> Result<()>
where
    C: RemoteChannel,
    F: LocalFs,
{
    match command {
        Command::List => session.list().await.map(drop),
        Command::Get { remote, local } => session.get(&remote, local.as_deref()).await,
        Command::Put { local, remote } => session.put(&local, remote.as_deref()).await,
        Command::Append { local, remote } => session.append(&local, remote.as_deref()).await,
        Command::Rename { from, to } => session.rename(&from, &to).await,
        Command::Delete { path } => session.delete(&path).await,
        Command::Cd { path } => session.cd(&path).await,
        Command::Mkdir { path } => session.mkdir(&path).await,
        Command::Rmdir { path } => session.rmdir(&path).await,
    }
}

/// Resolves `lines` into a script and runs it.
///
/// An unsupported line stops the run before any command is executed, under
/// the same policy as any other failure.
pub async fn run_script<C, F, I, S>(
    session: &mut Session<C, F>,
    lines: I,
    throwing: bool,
) -> Result<RunResult>
where
    C: RemoteChannel,
    F: LocalFs,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match Script::from_lines(lines) {
        Ok(script) => Interpreter::new(session, script, throwing).run().await,
        Err(err) if throwing => Err(err),
        Err(err) => {
            warn!("{err}");
            Ok(RunResult::failed(0, &err))
        }
    }
}

#[cfg(test)]
mod test_interpreter {
    use super::*;
    use crate::channel::memory::{Call, MemoryChannel};

    #[tokio::test]
    async fn test_missing_cd_target_stops_the_run() {
        let mut session = Session::new(MemoryChannel::new());

        let result = run_script(&mut session, ["cd sub", "ls"], false)
            .await
            .unwrap();

        assert_eq!(result.succeeded_count, 0);
        assert_eq!(
            result.failure_message.as_deref(),
            Some("Directory or file sub does not exist.")
        );
        assert_eq!(session.channel().calls(), &[Call::List]);
    }

    #[tokio::test]
    async fn test_throwing_policy_propagates() {
        let mut session = Session::new(MemoryChannel::new().with_dir("/a"));

        let err = run_script(&mut session, ["cd a", "cd missing", "ls"], true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(session.channel().current_dir(), "/a");
    }

    #[tokio::test]
    async fn test_deleting_nothing_still_counts() {
        let mut session = Session::new(MemoryChannel::new());

        let result = run_script(&mut session, ["delete ghost", "rmdir nowhere/ghost"], true)
            .await
            .unwrap();

        assert_eq!(
            result,
            RunResult {
                succeeded_count: 2,
                failure_message: None
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_line_runs_nothing() {
        let mut session = Session::new(MemoryChannel::new());

        let result = run_script(&mut session, ["mkdir a", "frobnicate"], false)
            .await
            .unwrap();

        assert_eq!(result.succeeded_count, 0);
        assert!(result.failure_message.is_some());
        assert!(session.channel().calls().is_empty());
    }

    #[tokio::test]
    async fn test_steps_until_stopped() {
        let mut session = Session::new(MemoryChannel::new().with_dir("/a"));
        let script: Script = "cd a\nls".parse().unwrap();
        let mut interpreter = Interpreter::new(&mut session, script, false);

        assert_eq!(interpreter.step().await.unwrap(), State::Running);
        assert_eq!(interpreter.step().await.unwrap(), State::Running);
        assert_eq!(interpreter.step().await.unwrap(), State::Stopped);
        assert_eq!(interpreter.step().await.unwrap(), State::Stopped);
        assert_eq!(interpreter.result().succeeded_count, 2);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let ok = RunResult {
            succeeded_count: 3,
            failure_message: None,
        };
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"succeededCount":3}"#
        );

        let failed = RunResult {
            succeeded_count: 1,
            failure_message: Some("boom".to_owned()),
        };
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"succeededCount":1,"failureMessage":"boom"}"#
        );
    }
}
