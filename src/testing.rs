use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::fetch::{into_records, CollectionSource, Endpoint};
use crate::models::Collection;

/// Canned responses keyed by collection; unknown collections answer `[]`.
#[derive(Default)]
pub struct MemorySource {
    responses: HashMap<Collection, std::result::Result<Value, String>>,
    requests: Mutex<Vec<Endpoint>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: Collection, body: Value) -> Self {
        self.responses.insert(collection, Ok(body));
        self
    }

    pub fn failing(mut self, collection: Collection, reason: &str) -> Self {
        self.responses.insert(collection, Err(reason.to_string()));
        self
    }

    pub fn requested(&self) -> Vec<Endpoint> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort_by_key(|endpoint| endpoint.collection().as_str());
        requests
    }
}

impl CollectionSource for MemorySource {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<Value>> {
        self.requests.lock().unwrap().push(endpoint);
        let collection = endpoint.collection();
        match self.responses.get(&collection) {
            Some(Ok(body)) => into_records(body.clone(), collection),
            Some(Err(reason)) => Err(Error::HttpStatus(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}
