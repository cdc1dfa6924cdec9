use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::eviction::Eviction;

/// Pending requests the handle channel buffers before senders are backpressured.
const REQUEST_QUEUE_SIZE: usize = 64;

/// Handle to the bounded key/value store.
///
/// All operations funnel through a channel into a dedicated worker task that
/// owns the storage and the eviction metadata, so at most one mutation is in
/// flight at any time and both structures stay mutually consistent. Handles
/// are cheap to clone; the worker drains its queue and stops once every
/// handle is gone.
#[derive(Clone, Debug)]
pub struct Cache {
    requests: mpsc::Sender<Request>,
}

#[derive(Debug)]
enum Request {
    Get {
        key: String,
        reply: oneshot::Sender<Option<Bytes>>,
    },
    Set {
        key: String,
        value: Bytes,
        reply: oneshot::Sender<()>,
    },
    Delete {
        keys: Vec<String>,
        reply: oneshot::Sender<i64>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

impl Cache {
    /// Creates a cache bounded to `max_items` entries and spawns its worker
    /// task on the current runtime.
    pub fn new(max_items: usize, eviction: Eviction) -> Cache {
        let (requests, queue) = mpsc::channel(REQUEST_QUEUE_SIZE);
        let worker = Worker {
            max_items,
            storage: HashMap::new(),
            eviction,
        };
        tokio::spawn(run_worker(queue, worker));
        Cache { requests }
    }

    /// Looks up `key`. A hit counts as an access for the eviction policy.
    pub async fn get(&self, key: &str) -> crate::Result<Option<Bytes>> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Get {
                key: key.to_string(),
                reply,
            })
            .await?;
        Ok(response.await?)
    }

    /// Inserts or overwrites `key`. Inserting into a full cache evicts
    /// exactly one victim first.
    pub async fn set(&self, key: String, value: Bytes) -> crate::Result<()> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Set { key, value, reply })
            .await?;
        Ok(response.await?)
    }

    /// Removes each present key and returns how many were removed.
    pub async fn delete(&self, keys: Vec<String>) -> crate::Result<i64> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Delete { keys, reply })
            .await?;
        Ok(response.await?)
    }

    /// Number of entries currently stored.
    pub async fn len(&self) -> crate::Result<usize> {
        let (reply, response) = oneshot::channel();
        self.requests.send(Request::Len { reply }).await?;
        Ok(response.await?)
    }
}

#[derive(Debug)]
struct Worker {
    max_items: usize,
    storage: HashMap<String, Bytes>,
    eviction: Eviction,
}

async fn run_worker(mut queue: mpsc::Receiver<Request>, mut worker: Worker) {
    // Replies to dropped callers are discarded.
    while let Some(request) = queue.recv().await {
        match request {
            Request::Get { key, reply } => {
                let _ = reply.send(worker.get(&key));
            }
            Request::Set { key, value, reply } => {
                worker.set(key, value);
                let _ = reply.send(());
            }
            Request::Delete { keys, reply } => {
                let _ = reply.send(worker.delete(&keys));
            }
            Request::Len { reply } => {
                let _ = reply.send(worker.storage.len());
            }
        }
    }
    debug!("cache worker stopped");
}

impl Worker {
    fn get(&mut self, key: &str) -> Option<Bytes> {
        let value = self.storage.get(key)?.clone();
        self.eviction.refresh(key);
        Some(value)
    }

    fn set(&mut self, key: String, value: Bytes) {
        if let Some(entry) = self.storage.get_mut(&key) {
            *entry = value;
            self.eviction.refresh(&key);
            return;
        }

        // Strict threshold: one eviction per insertion keeps the entry count
        // at or below the configured capacity.
        if self.storage.len() >= self.max_items {
            if let Some(victim) = self.eviction.evict() {
                self.storage.remove(&victim);
            }
        }
        self.eviction.add(&key);
        self.storage.insert(key, value);
    }

    fn delete(&mut self, keys: &[String]) -> i64 {
        let mut removed = 0;
        for key in keys {
            if self.storage.remove(key).is_some() {
                self.eviction.delete(key);
                removed += 1;
            }
        }
        removed
    }
}
