//! Model provider backed by an external command.
//!
//! The prompt is passed in `AION_PROMPT`, the input text on stdin; trimmed
//! stdout is the completion.

use super::ModelProvider;
use std::io::{ErrorKind, Write};
use std::process::{ChildStdin, Command, Stdio};

/// Environment variable carrying the prompt.
pub const PROMPT_ENV: &str = "AION_PROMPT";

/// Output from running the provider command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `command args...` once per completion.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: String,
    command: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(name: &str, command: &str, args: &[String]) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            args: args.to_vec(),
        }
    }

    /// Spawn the command, feed `input` on stdin, and collect its output.
    ///
    /// Stdin is written from a scoped thread while the output pipes drain, so
    /// a child that answers before reading (or never reads) cannot stall or
    /// fail the call. The child is always reaped.
    pub fn exec(&self, prompt: &str, input: &str) -> Result<ExecOutput, String> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env(PROMPT_ENV, prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", self.command, e))?;

        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|s| {
            let writer = s.spawn(move || write_input(stdin, input));
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output.map_err(|e| format!("wait error: {}", e))?;
        written
            .map_err(|_| "stdin writer panicked".to_string())?
            .map_err(|e| format!("stdin write error: {}", e))?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Write all of `input`, then close stdin. A child that exits without
/// reading is not an error.
fn write_input(stdin: Option<ChildStdin>, input: &str) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(input.as_bytes()) {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

impl ModelProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self, prompt: &str, input: Option<&str>) -> String {
        tracing::debug!(provider = %self.name, command = %self.command, "invoking model command");
        match self.exec(prompt, input.unwrap_or_default()) {
            Ok(out) if out.success() => out.stdout.trim().to_string(),
            Ok(out) => {
                tracing::warn!(provider = %self.name, exit_code = out.exit_code, "model command failed");
                format!(
                    "[Error: {} exited with code {}: {}]",
                    self.command,
                    out.exit_code,
                    out.stderr.trim()
                )
            }
            Err(e) => {
                tracing::warn!(provider = %self.name, error = %e, "model command failed");
                format!("[Error: {}]", e)
            }
        }
    }
}
