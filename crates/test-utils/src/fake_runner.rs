use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use editor_ci::errors::{EditorCiError, Result};
use editor_ci::exec::{CommandInvocation, ExecutionOutcome, ProcessRunner, RunRequest};
use editor_ci::license::CiAnnotator;

/// Ordered log shared between fakes, so tests can assert interleaving
/// (e.g. "mask" before the first "run").
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// What the fake does for one matching invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    /// Pretend the process exited with this code.
    Exit(i32),
    /// Pretend the process could not be started.
    SpawnError(String),
}

struct Rule {
    needle: String,
    responses: VecDeque<FakeResponse>,
}

/// A fake process runner that:
/// - records every request it receives, in order
/// - answers from scripted rules (first rule whose needle is one of the
///   invocation's arguments or its program), else exits 0
/// - honours `raise_on_error` like the real supervisor.
///
/// A rule's last response repeats once the earlier ones are used up.
#[derive(Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<RunRequest>>>,
    rules: Arc<Mutex<Vec<Rule>>>,
    events: Option<EventLog>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append `run: <rendered command>` to `events` for every call.
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Script the responses for invocations containing `needle`.
    pub fn respond_when<I>(self, needle: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = FakeResponse>,
    {
        let responses: VecDeque<_> = responses.into_iter().collect();
        assert!(!responses.is_empty(), "a rule needs at least one response");
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            responses,
        });
        self
    }

    /// Shorthand for a rule that always exits with `code`.
    pub fn exit_when(self, needle: &str, code: i32) -> Self {
        self.respond_when(needle, [FakeResponse::Exit(code)])
    }

    pub fn calls(&self) -> Vec<RunRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.calls().into_iter().map(|r| r.invocation).collect()
    }

    /// Number of recorded calls whose invocation contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|inv| matches_needle(inv, needle))
            .count()
    }

    fn next_response(&self, invocation: &CommandInvocation) -> FakeResponse {
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if matches_needle(invocation, &rule.needle) {
                if rule.responses.len() > 1 {
                    return rule.responses.pop_front().unwrap();
                }
                return rule.responses[0].clone();
            }
        }
        FakeResponse::Exit(0)
    }
}

fn matches_needle(invocation: &CommandInvocation, needle: &str) -> bool {
    invocation.program() == needle || invocation.has_arg(needle)
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let command = request.invocation.to_string();
            if let Some(events) = &self.events {
                events.lock().unwrap().push(format!("run: {command}"));
            }
            let response = self.next_response(&request.invocation);
            let raise = request.raise_on_error;
            let log_path = request.log_path.clone();
            self.calls.lock().unwrap().push(request);

            match response {
                FakeResponse::SpawnError(msg) => Err(EditorCiError::Spawn {
                    command,
                    source: io::Error::new(io::ErrorKind::NotFound, msg),
                }),
                FakeResponse::Exit(code) if code != 0 && raise => Err(EditorCiError::CommandFailed {
                    command,
                    exit_code: code,
                }),
                FakeResponse::Exit(code) => Ok(ExecutionOutcome {
                    exit_code: code,
                    log_path,
                }),
            }
        })
    }
}

/// Annotator that records `mask: <value>` instead of printing.
#[derive(Clone, Default)]
pub struct RecordingAnnotator {
    events: EventLog,
}

impl RecordingAnnotator {
    pub fn new(events: EventLog) -> Self {
        Self { events }
    }

    pub fn masks(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix("mask: ").map(str::to_string))
            .collect()
    }
}

impl CiAnnotator for RecordingAnnotator {
    fn add_mask(&self, value: &str) {
        self.events.lock().unwrap().push(format!("mask: {value}"));
    }
}
