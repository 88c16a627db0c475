//! Deterministic oracle stubs for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{JudgmentFailure, JudgmentOracle, JudgmentRequest, JudgmentResult};
use crate::domain::verdict::ComplianceStatus;

/// What a [`ScriptedOracle`] does for one control.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this raw JSON answer.
    Answer(Value),
    /// Fail with this error.
    Fail(JudgmentFailure),
    /// Never answer.
    Hang,
    /// Panic inside the call.
    Panic,
}

impl Scripted {
    /// A well-formed answer.
    pub fn judged(status: ComplianceStatus, confidence: u8, rationale: &str) -> Self {
        Scripted::Answer(answer(status, confidence, rationale))
    }
}

/// A well-formed oracle answer as JSON.
pub fn answer(status: ComplianceStatus, confidence: u8, rationale: &str) -> Value {
    json!({
        "status": status.as_str(),
        "confidence": confidence,
        "rationale": rationale,
    })
}

/// Oracle that answers from a per-control script and records every call.
#[derive(Debug)]
pub struct ScriptedOracle {
    script: HashMap<String, Scripted>,
    fallback: Scripted,
    calls: AtomicUsize,
    requests: Mutex<Vec<JudgmentRequest>>,
}

impl ScriptedOracle {
    /// Oracle whose unscripted controls get `fallback`.
    pub fn new(fallback: Scripted) -> Self {
        Self {
            script: HashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every control judged with `status`.
    pub fn always(status: ComplianceStatus) -> Self {
        Self::new(Scripted::judged(status, 90, "scripted"))
    }

    /// Every call hangs, so every call hits the adapter timeout.
    pub fn always_timeout() -> Self {
        Self::new(Scripted::Hang)
    }

    /// Script the behaviour for one control id.
    pub fn with(mut self, control_id: &str, behaviour: Scripted) -> Self {
        self.script.insert(control_id.to_string(), behaviour);
        self
    }

    /// Number of `judge` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<JudgmentRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JudgmentOracle for ScriptedOracle {
    async fn judge(&self, request: &JudgmentRequest) -> JudgmentResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let behaviour = self
            .script
            .get(&request.control_id)
            .unwrap_or(&self.fallback)
            .clone();
        match behaviour {
            Scripted::Answer(value) => Ok(value),
            Scripted::Fail(failure) => Err(failure),
            Scripted::Hang => std::future::pending().await,
            Scripted::Panic => panic!("scripted oracle panic for {}", request.control_id),
        }
    }
}
