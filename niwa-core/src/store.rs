use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::storage::EngineStatus;

/// A transactional key/value persistence layer over a byte-oriented
/// `Engine`. The full key space is materialized in memory (`data`) at
/// construction time by replaying the engine, per the single-process,
/// multi-invocation model: each CLI invocation is a fresh process that
/// reconstructs its view of the store on start.
///
/// All node/version/read-receipt/conflict writes go through a `Txn`, whose
/// `commit` persists the whole batch as one atomic engine record. A `Txn`
/// dropped without `commit` rolls back: nothing it staged is ever visible.
pub struct Store<E: Engine> {
    engine: Arc<Mutex<E>>,
    data: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl<E: Engine> Store<E> {
    pub fn new(mut engine: E) -> CResult<Self> {
        let data = engine.load_all()?;
        Ok(Self { engine: Arc::new(Mutex::new(engine)), data: Arc::new(Mutex::new(data)) })
    }

    /// Starts a new transaction. Reads through the transaction see both
    /// the store's committed state and any writes already staged in it.
    pub fn begin(&self) -> Txn<'_, E> {
        Txn { store: self, writes: Vec::new(), committed: false }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// All live key/value pairs whose key starts with `prefix`, in key order.
    pub fn range(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .lock()
            .unwrap()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn status(&self) -> CResult<EngineStatus> {
        self.engine.lock().unwrap().status()
    }
}

/// A scoped transaction handle. Writes are buffered locally and only take
/// effect on `commit`. Dropping a `Txn` without committing discards them.
pub struct Txn<'s, E: Engine> {
    store: &'s Store<E>,
    writes: Vec<(Vec<u8>, Vec<u8>)>,
    committed: bool,
}

impl<'s, E: Engine> Txn<'s, E> {
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some((_, value)) = self.writes.iter().rev().find(|(k, _)| k == key) {
            return Some(value.clone());
        }
        self.store.get(key)
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.writes.push((key.into(), value.into()));
    }

    pub fn range(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut map: BTreeMap<Vec<u8>, Vec<u8>> = self.store.range(prefix).into_iter().collect();
        for (key, value) in &self.writes {
            if key.starts_with(prefix) {
                map.insert(key.clone(), value.clone());
            }
        }
        map.into_iter().collect()
    }

    /// Persists every staged write as a single atomic engine record, then
    /// publishes it into the store's materialized map.
    pub fn commit(mut self) -> CResult<()> {
        self.store.engine.lock().unwrap().append_batch(&self.writes)?;
        let mut data = self.store.data.lock().unwrap();
        for (key, value) in self.writes.drain(..) {
            data.insert(key, value);
        }
        self.committed = true;
        Ok(())
    }

    /// Explicitly discards every staged write. Equivalent to dropping the
    /// transaction, spelled out for callers that want it to read as intent.
    pub fn rollback(mut self) {
        self.writes.clear();
        self.committed = true;
    }
}

impl<'s, E: Engine> Drop for Txn<'s, E> {
    fn drop(&mut self) {
        if !self.committed && !self.writes.is_empty() {
            log::debug!("rolling back {} uncommitted write(s)", self.writes.len());
        }
    }
}
