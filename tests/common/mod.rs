//! In-memory backend for driving a controller without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bizlookup::config::EndpointConfig;
use bizlookup::domain::SearchRequest;
use bizlookup::models::FieldMapper;
use bizlookup::services::{SearchBackend, SearchController, SearchError, SearchSettings};
use serde_json::{Value, json};
use tokio::sync::{oneshot, watch};

type Reply = Result<Value, SearchError>;

#[derive(Default)]
struct Script {
    calls: Vec<SearchRequest>,
    gates: HashMap<String, oneshot::Receiver<Reply>>,
    fixed: HashMap<String, Reply>,
}

/// Records every call. Replies come from, in order: a one-shot gate armed for
/// the query, a fixed reply, or a single echoed customer named after the query.
#[derive(Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
    call_count: Arc<watch::Sender<usize>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            call_count: Arc::new(tx),
        }
    }

    /// Holds the next call for `query` until the returned sender fires.
    pub fn gate(&self, query: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().gates.insert(query.to_string(), rx);
        tx
    }

    pub fn reply(&self, query: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .fixed
            .insert(query.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<SearchRequest> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.query).collect()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        rx.wait_for(|count| *count >= n).await.unwrap();
    }
}

#[async_trait::async_trait]
impl SearchBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let (gate, fixed) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(request.clone());
            let count = script.calls.len();
            self.call_count.send_replace(count);
            (
                script.gates.remove(&request.query),
                script.fixed.get(&request.query).cloned(),
            )
        };

        if let Some(gate) = gate {
            return gate.await.unwrap_or(Err(SearchError::Http("gate dropped".into())));
        }

        fixed.unwrap_or_else(|| Ok(customers(&[request.query.as_str()], false)))
    }
}

pub fn customers(names: &[&str], has_more: bool) -> Value {
    let list: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"id": i + 1, "customerName": name}))
        .collect();
    json!({"success": true, "customers": list, "hasMore": has_more})
}

pub fn settings() -> SearchSettings {
    SearchSettings {
        debounce: Duration::from_millis(300),
        ..SearchSettings::default()
    }
}

pub fn controller(backend: &ScriptedBackend) -> SearchController<ScriptedBackend, FieldMapper> {
    controller_with(backend, settings())
}

pub fn controller_with(
    backend: &ScriptedBackend,
    settings: SearchSettings,
) -> SearchController<ScriptedBackend, FieldMapper> {
    SearchController::new(
        backend.clone(),
        FieldMapper::from(&EndpointConfig::customers()),
        settings,
    )
}

pub fn labels(options: &[bizlookup::models::Suggestion]) -> Vec<String> {
    options.iter().map(|o| o.label.clone()).collect()
}
