//! Shared test helpers

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::runner::{ToolCommand, ToolOutput, ToolRunner};

type Responder = Box<dyn Fn(&ToolCommand) -> std::io::Result<ToolOutput> + Send + Sync>;

/// A [`ToolRunner`] that records every command and replays scripted replies
/// in order. Once the script runs out, every call exits 0 with no output.
pub(crate) struct ScriptedRunner {
    calls: Mutex<Vec<ToolCommand>>,
    script: Mutex<VecDeque<Responder>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a fixed reply
    pub(crate) fn then(self, output: ToolOutput) -> Self {
        self.then_with(move |_| Ok(output.clone()))
    }

    /// Queue a reply computed from the command
    pub(crate) fn then_with(
        self,
        responder: impl Fn(&ToolCommand) -> std::io::Result<ToolOutput> + Send + Sync + 'static,
    ) -> Self {
        self.script.lock().unwrap().push_back(Box::new(responder));
        self
    }

    pub(crate) fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, command: &ToolCommand) -> std::io::Result<ToolOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let responder = self.script.lock().unwrap().pop_front();
        match responder {
            Some(responder) => responder(command),
            None => Ok(ok("")),
        }
    }
}

/// Exit 0 with the given stdout
pub(crate) fn ok(stdout: &str) -> ToolOutput {
    ToolOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Exit with `code` and the given stderr
pub(crate) fn fail(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// Value following `flag` in the command's arguments
pub(crate) fn arg_after<'a>(command: &'a ToolCommand, flag: &str) -> Option<&'a str> {
    let args = command.get_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
