use std::{collections::HashMap, process::Stdio};

use anyhow::anyhow;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::{
    context::Payload,
    framework::{IntoState as _, StateError, StateResult},
    steps::{Step, StepContext},
};

/// Runs a program and outputs its exit code and captured stdout.
///
/// A daemon is spawned and left running, producing no outputs. Otherwise the workflow waits for
/// the program, and a non-zero exit status cancels the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Command;

impl Command {
    // Input
    const PROGRAM: &'static str = "program";
    const ARGS: &'static str = "args";
    const DAEMON: &'static str = "daemon";
    const INHERIT_IO: &'static str = "inherit_io";
    const CWD: &'static str = "cwd";
    const PARAMS: [&'static str; 5] = [
        Self::PROGRAM,
        Self::ARGS,
        Self::DAEMON,
        Self::INHERIT_IO,
        Self::CWD,
    ];

    // Output
    const STATUS_CODE: &'static str = "status_code";
    const STDOUT: &'static str = "stdout";
    const OUTPUT: [&'static str; 2] = [Self::STATUS_CODE, Self::STDOUT];
}

impl Step for Command {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    fn configured_outputs(&self, parameters: &HashMap<String, String>) -> &'static [&'static str] {
        let daemon = parameters
            .get(Self::DAEMON)
            .is_some_and(|v| v.trim().parse().unwrap_or(false));
        if daemon { &[] } else { &Self::OUTPUT }
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let program = input.require(Self::PROGRAM).or_cancel()?;
        let daemon = input.flag(Self::DAEMON);
        let inherit_io = input.flag(Self::INHERIT_IO);

        let mut command = TokioCommand::new(program);
        command
            .args(input.parameter(Self::ARGS).split_whitespace())
            .current_dir(match input.optional(Self::CWD) {
                Some(cwd) => cx.resolve(cwd),
                None => cx.working_dir.clone(),
            })
            .stdin(Stdio::null());
        if !inherit_io {
            command.stderr(Stdio::null());
        }

        if daemon {
            if !inherit_io {
                command.stdout(Stdio::null());
            }
            let child = command.spawn().or_cancel()?;
            info!("spawned {program} as a daemon (pid {:?})", child.id());
            return Ok(Payload::default());
        }

        debug!("running {program}…");
        let (status, stdout) = if inherit_io {
            (command.status().await.or_cancel()?, String::new())
        } else {
            let output = command.stdout(Stdio::piped()).output().await.or_cancel()?;
            let stdout = String::from_utf8_lossy(&output.stdout)
                .trim_end_matches(['\r', '\n'])
                .to_owned();
            (output.status, stdout)
        };

        if !status.success() {
            return Err(StateError::Cancelled(anyhow!("{program} exited with {status}")));
        }
        info!("{program} exited with {status}");

        Ok(Payload::from_pairs([
            (
                Self::STATUS_CODE,
                status.code().map(|code| code.to_string()).unwrap_or_default(),
            ),
            (Self::STDOUT, stdout),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::step_context;

    fn input(pairs: &[(&'static str, &str)]) -> Payload {
        Payload::from_pairs(pairs.iter().map(|(k, v)| (*k, (*v).to_owned())))
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let cx = step_context(dir.path().to_path_buf(), "http://127.0.0.1:9");

        let output = Command
            .execute(
                &cx,
                input(&[(Command::PROGRAM, "echo"), (Command::ARGS, "hello  world")]),
            )
            .await
            .unwrap();

        assert_eq!(output.parameter(Command::STATUS_CODE), "0");
        assert_eq!(output.parameter(Command::STDOUT), "hello world");
    }

    #[tokio::test]
    async fn runs_in_the_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/marker.txt"), "").unwrap();
        let cx = step_context(dir.path().to_path_buf(), "http://127.0.0.1:9");

        let output = Command
            .execute(&cx, input(&[(Command::PROGRAM, "ls"), (Command::CWD, "sub")]))
            .await
            .unwrap();

        assert_eq!(output.parameter(Command::STDOUT), "marker.txt");
    }

    #[tokio::test]
    async fn non_zero_exit_cancels() {
        let cx = step_context(std::env::temp_dir(), "http://127.0.0.1:9");

        let result = Command
            .execute(&cx, input(&[(Command::PROGRAM, "false")]))
            .await;
        assert!(matches!(result, Err(StateError::Cancelled(_))));
    }

    #[tokio::test]
    async fn missing_program_cancels() {
        let cx = step_context(std::env::temp_dir(), "http://127.0.0.1:9");

        let result = Command
            .execute(
                &cx,
                input(&[(Command::PROGRAM, "definitely-not-a-program-4f2a")]),
            )
            .await;
        assert!(matches!(result, Err(StateError::Cancelled(_))));

        let result = Command.execute(&cx, Payload::default()).await;
        assert!(matches!(result, Err(StateError::Cancelled(_))));
    }

    #[tokio::test]
    async fn daemons_return_immediately() {
        let cx = step_context(std::env::temp_dir(), "http://127.0.0.1:9");

        let started = std::time::Instant::now();
        let output = Command
            .execute(
                &cx,
                input(&[
                    (Command::PROGRAM, "sleep"),
                    (Command::ARGS, "5"),
                    (Command::DAEMON, "true"),
                ]),
            )
            .await
            .unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(4));
        assert!(output.parameters.is_empty());
    }
}
