//! Scripted [`Upstream`] for dispatcher and adapter tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::DispatchError;
use crate::port::{Target, Upstream};

type Handler = Box<dyn Fn(&Target) -> Result<Value, DispatchError> + Send + Sync>;

/// An upstream answering from a FIFO of scripted results.
///
/// When the queue is empty the optional handler answers; without one every
/// call succeeds with `null`. Every call is recorded with the (tokio) time it
/// was made.
pub struct ScriptedUpstream {
    responses: Mutex<VecDeque<Result<Value, DispatchError>>>,
    handler: Option<Handler>,
    calls: Mutex<Vec<(Target, Instant)>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            handler: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every unscripted call with `handler`.
    pub fn with_handler(
        mut self,
        handler: impl Fn(&Target) -> Result<Value, DispatchError> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().push_back(Ok(value));
    }

    pub fn push_err(&self, err: DispatchError) {
        self.responses.lock().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<Target> {
        self.calls.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for ScriptedUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn call(&self, target: &Target) -> Result<Value, DispatchError> {
        self.calls.lock().push((target.clone(), Instant::now()));
        if let Some(result) = self.responses.lock().pop_front() {
            return result;
        }
        match &self.handler {
            Some(handler) => handler(target),
            None => Ok(Value::Null),
        }
    }
}
