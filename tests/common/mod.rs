#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use scribe::ai::{SummaryRequest, Summarizer};
use scribe::core::models::{Content, Message};
use scribe::errors::ScribeError;
use scribe::worker::SummarySink;

#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(String),
    Fail,
    Panic,
    Hang,
}

/// Scripted summarizer that counts calls and can be held at a gate.
pub struct FakeSummarizer {
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
    gated: bool,
    gate: Semaphore,
    started: Notify,
    requests: Mutex<Vec<SummaryRequest>>,
}

impl FakeSummarizer {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self::build(behavior, false))
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(Behavior::Reply(text.to_string()))
    }

    /// Blocks every call until [`FakeSummarizer::release`] is called.
    pub fn gated(text: &str) -> Arc<Self> {
        Arc::new(Self::build(Behavior::Reply(text.to_string()), true))
    }

    fn build(behavior: Behavior, gated: bool) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            gated,
            gate: Semaphore::new(0),
            started: Notify::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SummaryRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Resolves once a call has entered the summarizer.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, ScribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();

        if self.gated {
            self.gate.acquire().await.unwrap().forget();
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Reply(text) => Ok(text),
            Behavior::Fail => Err(ScribeError::LlmError("model unavailable".to_string())),
            Behavior::Panic => panic!("summarizer blew up"),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Keeps delivered reports in memory; can be told to fail or to never return.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
    hang: AtomicBool,
    started: Notify,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn hanging() -> Arc<Self> {
        let sink = Self::default();
        sink.hang.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    /// Resolves once a delivery has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummarySink for RecordingSink {
    async fn deliver(&self, group_key: &str, report: &str) -> Result<(), ScribeError> {
        self.started.notify_one();
        if self.hang.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScribeError::DeliveryError("chat api down".to_string()));
        }
        self.reports
            .lock()
            .unwrap()
            .push((group_key.to_string(), report.to_string()));
        Ok(())
    }
}

pub fn text_msg(group: &str, id: &str, text: &str) -> Message {
    Message {
        id: id.to_string(),
        timestamp: Utc::now(),
        sender: "Ana".to_string(),
        group_key: group.to_string(),
        content: Content::text(text),
    }
}
