//! Scripted fetcher for router tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::Error;
use crate::fetch::Fetcher;
use crate::request::{RequestDescriptor, ResponseSnapshot};

/// Answers by URL path. Unknown paths fail like an unreachable network.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    routes: Mutex<HashMap<String, Result<ResponseSnapshot, String>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits for a [`release`](Self::release) before answering.
    pub(crate) fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::default() }
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str) {
        let resp = ResponseSnapshot::new(format!("https://loja.example{path}"), status, body);
        self.routes.lock().unwrap().insert(path.to_string(), Ok(resp));
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Err("connection refused".to_string()));
    }

    /// Let one held fetch through.
    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let answer = self.routes.lock().unwrap().get(&path).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match answer {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(reason)) => Err(Error::Network(reason)),
            None => Err(Error::Network(format!("no route to {path}"))),
        }
    }
}
