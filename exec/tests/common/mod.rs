#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rosacli_exec::{Client, CommandExecutor, Completion, Invocation, Result, RunnerConfig};

/// Replies with canned completions in order and records every invocation.
/// Once the script runs out it answers with an empty success.
#[derive(Default)]
pub struct Scripted {
    replies: Mutex<VecDeque<Completion>>,
    seen: Mutex<Vec<Invocation>>,
}

impl Scripted {
    pub fn replying<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Completion>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::default(),
        })
    }

    pub fn seen(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }

    /// Argument vectors of every invocation, joined with spaces.
    pub fn command_lines(&self) -> Vec<String> {
        self.seen().iter().map(|invocation| invocation.args.join(" ")).collect()
    }
}

impl CommandExecutor for Scripted {
    fn execute(&self, invocation: &Invocation) -> Result<Completion> {
        self.seen.lock().unwrap().push(invocation.clone());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Completion::exited(0, "")))
    }

    /// Records every stage and answers the whole pipeline with one reply.
    fn execute_pipeline(&self, stages: &[Invocation]) -> Result<Completion> {
        self.seen.lock().unwrap().extend(stages.iter().cloned());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Completion::exited(0, "")))
    }
}

pub fn client(executor: &Arc<Scripted>) -> Client {
    let mut config = RunnerConfig::default();
    config.dir = Some(PathBuf::from("/work"));
    config.auth_retry.delay_ms = 0;
    Client::with_executor(config, executor.clone())
}

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

pub fn ok(name: &str) -> Completion {
    Completion::exited(0, fixture(name))
}
