//! A scripted provider for exercising the engine without touching the system.

use super::{Projection, Provider, ProviderKind};
use crate::Result;
use core::time::Duration;
use ohno::app_err;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// A provider returning canned records and counting how often it was asked.
#[derive(Debug)]
pub struct FakeProvider {
    pub kind: ProviderKind,
    pub records: Vec<Value>,
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind, records: Vec<Value>) -> Self {
        Self {
            kind,
            records,
            calls: AtomicUsize::new(0),
            delay: None,
            fail: false,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn default_fields(&self) -> &'static [&'static str] {
        &["name"]
    }

    fn all_fields(&self) -> &'static [&'static str] {
        &["name", "extra"]
    }

    fn collect(&self, _projection: &Projection) -> Result<Vec<Value>> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail {
            return Err(app_err!("simulated failure"));
        }
        Ok(self.records.clone())
    }
}
