//! External tool invocation

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// A single invocation of an external tool.
///
/// Most tools get an explicit argument vector. Tools that only work through
/// a batch launcher are run as one shell-joined command line instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    secrets: Vec<String>,
    current_dir: Option<PathBuf>,
    shell: bool,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secrets: Vec::new(),
            current_dir: None,
            shell: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument that must never appear in logs
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        self.secrets.push(arg.clone());
        self.args.push(arg);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Run through the platform shell as a single joined command line
    pub fn via_shell(mut self) -> Self {
        self.shell = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn is_shell(&self) -> bool {
        self.shell
    }

    /// The program and arguments joined with spaces
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The command line handed to the platform shell, every word quoted so
    /// the tool receives each argument verbatim
    pub fn shell_line(&self) -> String {
        self.shell_line_for(cfg!(target_os = "windows"))
    }

    fn shell_line_for(&self, windows: bool) -> String {
        let quote: fn(&str) -> String = if windows { quote_cmd } else { quote_sh };
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Like [`command_line`](Self::command_line) with secret arguments masked
    pub fn redacted(&self) -> String {
        self.secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(self.command_line(), |line, secret| line.replace(secret.as_str(), "****"))
    }
}

/// Words made only of these characters need no quoting in either shell
fn is_plain_word(word: &str, extra: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@".contains(c) || extra.contains(c))
}

/// POSIX `sh` quoting: single quotes, with embedded `'` closed and escaped
fn quote_sh(word: &str) -> String {
    if is_plain_word(word, "") {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// `cmd.exe` quoting: double quotes, with embedded `"` doubled
fn quote_cmd(word: &str) -> String {
    if is_plain_word(word, "\\") {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('"', "\"\""))
    }
}

/// Captured result of a finished tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr if the tool wrote any, otherwise stdout
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Runs external tools to completion
#[async_trait::async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the command, blocking until it exits.
    ///
    /// An `Err` means the process could not be started or awaited. A tool
    /// that ran and failed is an `Ok` with a non-zero exit code.
    async fn run(&self, command: &ToolCommand) -> std::io::Result<ToolOutput>;
}

/// Runs tools as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    /// With `/S`, cmd strips exactly the outer pair of quotes and runs the
    /// rest as written. The line is appended raw.
    #[cfg(windows)]
    fn shell(command: &ToolCommand) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.raw_arg("/S")
            .raw_arg("/C")
            .raw_arg(format!("\"{}\"", command.shell_line()));
        cmd
    }

    #[cfg(not(windows))]
    fn shell(command: &ToolCommand) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command.shell_line());
        cmd
    }

    fn build(command: &ToolCommand) -> Command {
        let mut cmd = if command.is_shell() {
            Self::shell(command)
        } else {
            let mut cmd = Command::new(command.program());
            cmd.args(command.get_args());
            cmd
        };

        if let Some(dir) = command.get_current_dir() {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait::async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> std::io::Result<ToolOutput> {
        debug!(command = %command.redacted(), shell = command.is_shell(), "running tool");

        let output = Self::build(command).output().await?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(program = command.program(), code = ?result.code, "tool finished");
        Ok(result)
    }
}
