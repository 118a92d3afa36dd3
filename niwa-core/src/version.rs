use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};
use crate::storage::engine::Engine;
use crate::store::{Store, Txn};

/// An immutable record of a node's content at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub node_id: String,
    pub version: u64,
    pub content: String,
    pub author: String,
    pub summary: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// The version the author had observed before this write. `None` only
    /// for the initial v1 created by `add`.
    pub base_version: Option<u64>,
}

fn key(node_id: &str, version: u64) -> Vec<u8> {
    // Zero-padded so lexicographic byte order matches numeric order.
    format!("version/{}/{:020}", node_id, version).into_bytes()
}

fn prefix(node_id: &str) -> Vec<u8> {
    format!("version/{}/", node_id).into_bytes()
}

pub fn get<E: Engine>(store: &Store<E>, node_id: &str, version: u64) -> CResult<Version> {
    let bytes = store
        .get(&key(node_id, version))
        .ok_or_else(|| Error::VersionNotFound { node_id: node_id.to_string(), version })?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn list<E: Engine>(store: &Store<E>, node_id: &str) -> CResult<Vec<Version>> {
    store
        .range(&prefix(node_id))
        .into_iter()
        .map(|(_, v)| bincode::deserialize(&v).map_err(Error::from))
        .collect()
}

pub fn latest<E: Engine>(store: &Store<E>, node_id: &str) -> CResult<Version> {
    list(store, node_id)?
        .into_iter()
        .last()
        .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))
}

/// Transaction-scoped variant of `list`, seeing the transaction's own
/// uncommitted writes layered over the store's committed state.
pub fn list_txn<E: Engine>(txn: &Txn<'_, E>, node_id: &str) -> CResult<Vec<Version>> {
    txn.range(&prefix(node_id))
        .into_iter()
        .map(|(_, v)| bincode::deserialize(&v).map_err(Error::from))
        .collect()
}

/// Transaction-scoped variant of `latest`.
pub fn latest_txn<E: Engine>(txn: &Txn<'_, E>, node_id: &str) -> CResult<Version> {
    list_txn(txn, node_id)?
        .into_iter()
        .last()
        .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))
}

/// Appends a new version row within an in-flight transaction. Callers are
/// responsible for assigning the correct monotonic `version` number and for
/// bumping the node's `current_version` in the same transaction.
pub fn append<E: Engine>(txn: &mut Txn<'_, E>, version: &Version) -> CResult<()> {
    let bytes = bincode::serialize(version)?;
    txn.put(key(&version.node_id, version.version), bytes);
    Ok(())
}
