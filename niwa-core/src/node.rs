use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};
use crate::storage::engine::Engine;
use crate::store::{Store, Txn};

/// An element in the document tree (spec entity "Node").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub title: String,
    /// 1 at root-document level, increasing with nesting; bounded by 6.
    pub depth: u32,
    /// `None` for top-level nodes, which live under the implicit root.
    pub parent_id: Option<String>,
    pub child_order: Vec<String>,
    pub current_version: u64,
}

impl Node {
    pub fn new(node_id: String, title: String, depth: u32, parent_id: Option<String>) -> Self {
        Self { node_id, title, depth, parent_id, child_order: Vec::new(), current_version: 1 }
    }
}

pub(crate) fn key(node_id: &str) -> Vec<u8> {
    format!("node/{}", node_id).into_bytes()
}

pub(crate) const PREFIX: &[u8] = b"node/";

pub fn load<E: Engine>(store: &Store<E>, node_id: &str) -> CResult<Node> {
    let bytes = store.get(&key(node_id)).ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn try_load<E: Engine>(store: &Store<E>, node_id: &str) -> CResult<Option<Node>> {
    match store.get(&key(node_id)) {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

pub fn load_txn<E: Engine>(txn: &Txn<'_, E>, node_id: &str) -> CResult<Node> {
    let bytes = txn.get(&key(node_id)).ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn save<E: Engine>(txn: &mut Txn<'_, E>, node: &Node) -> CResult<()> {
    let bytes = bincode::serialize(node)?;
    txn.put(key(&node.node_id), bytes);
    Ok(())
}

/// All nodes currently in the store, in no particular order.
pub fn all<E: Engine>(store: &Store<E>) -> CResult<Vec<Node>> {
    store
        .range(PREFIX)
        .into_iter()
        .map(|(_, v)| bincode::deserialize(&v).map_err(Error::from))
        .collect()
}
