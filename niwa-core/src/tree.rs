use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::agent;
use crate::error::{CResult, Error};
use crate::id;
use crate::node::{self, Node};
use crate::storage::engine::Engine;
use crate::store::{Store, Txn};
use crate::version::{self, Version};

/// Id of the implicit root node created by `init`. Top-level nodes (depth 1)
/// are its children; the root itself has depth 0 and is never created by
/// `add`.
pub const ROOT_ID: &str = "root";
pub const ROOT_TITLE: &str = "Document";
pub const MAX_DEPTH: u32 = 6;

/// One row of a pre-order tree dump.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeEntry {
    pub depth: u32,
    pub node_id: String,
    pub title: String,
    pub current_version: u64,
}

/// Creates the root node if it doesn't already exist. Idempotent, as
/// `init` is required to be.
pub fn ensure_root<E: Engine>(txn: &mut Txn<'_, E>, now: DateTime<Utc>) -> CResult<()> {
    if node::load_txn(txn, ROOT_ID).is_ok() {
        return Ok(());
    }
    let root = Node::new(ROOT_ID.to_string(), ROOT_TITLE.to_string(), 0, None);
    node::save(txn, &root)?;
    version::append(
        txn,
        &Version {
            node_id: ROOT_ID.to_string(),
            version: 1,
            content: String::new(),
            author: "system".to_string(),
            summary: None,
            timestamp: now,
            base_version: None,
        },
    )?;
    Ok(())
}

fn sibling_title_conflict<E: Engine>(
    txn: &Txn<'_, E>,
    parent: &Node,
    title: &str,
    excluding: Option<&str>,
) -> CResult<bool> {
    for child_id in &parent.child_order {
        if Some(child_id.as_str()) == excluding {
            continue;
        }
        let child = node::load_txn(txn, child_id)?;
        if child.title == title {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Creates a node under `parent_id` (or the root, if `None`), with an
/// initial version 1 whose content is `content` and `base_version = None`.
pub fn create<E: Engine>(
    txn: &mut Txn<'_, E>,
    title: &str,
    parent_id: Option<&str>,
    content: &str,
    author: &str,
    now: DateTime<Utc>,
) -> CResult<String> {
    if title.trim().is_empty() {
        return Err(Error::InvalidTitle("title must not be empty".to_string()));
    }

    let parent_id = parent_id.unwrap_or(ROOT_ID);
    let mut parent =
        node::load_txn(txn, parent_id).map_err(|_| Error::ParentNotFound(parent_id.to_string()))?;

    let depth = parent.depth + 1;
    if depth > MAX_DEPTH {
        return Err(Error::DepthExceeded { max_depth: MAX_DEPTH });
    }

    if sibling_title_conflict(txn, &parent, title, None)? {
        return Err(Error::DuplicateTitle { parent: parent_id.to_string(), title: title.to_string() });
    }

    let node_id = id::allocate(txn, depth)?;
    let node = Node::new(node_id.clone(), title.to_string(), depth, Some(parent_id.to_string()));
    node::save(txn, &node)?;

    version::append(
        txn,
        &Version {
            node_id: node_id.clone(),
            version: 1,
            content: content.to_string(),
            author: author.to_string(),
            summary: None,
            timestamp: now,
            base_version: None,
        },
    )?;

    parent.child_order.push(node_id.clone());
    node::save(txn, &parent)?;
    agent::touch(txn, author, now)?;

    Ok(node_id)
}

/// Renames a node. Produces a new version whose content is unchanged; the
/// title itself lives on the node record, not in version content.
pub fn rename<E: Engine>(
    txn: &mut Txn<'_, E>,
    node_id: &str,
    new_title: &str,
    author: &str,
    now: DateTime<Utc>,
) -> CResult<u64> {
    if new_title.trim().is_empty() {
        return Err(Error::InvalidTitle("title must not be empty".to_string()));
    }

    let mut target = node::load_txn(txn, node_id)?;

    if let Some(parent_id) = target.parent_id.clone() {
        let parent = node::load_txn(txn, &parent_id)?;
        if sibling_title_conflict(txn, &parent, new_title, Some(node_id))? {
            return Err(Error::DuplicateTitle { parent: parent_id, title: new_title.to_string() });
        }
    }

    let latest = version::latest_txn(txn, node_id)?;
    let new_version_num = target.current_version + 1;
    version::append(
        txn,
        &Version {
            node_id: node_id.to_string(),
            version: new_version_num,
            content: latest.content,
            author: author.to_string(),
            summary: None,
            timestamp: now,
            base_version: Some(target.current_version),
        },
    )?;

    target.title = new_title.to_string();
    target.current_version = new_version_num;
    node::save(txn, &target)?;
    agent::touch(txn, author, now)?;

    Ok(new_version_num)
}

/// Pre-order dump of the tree, root first, siblings ordered by
/// `child_order`.
pub fn traverse<E: Engine>(store: &Store<E>) -> CResult<Vec<TreeEntry>> {
    let nodes = node::all(store)?;
    let by_id: HashMap<String, Node> = nodes.into_iter().map(|n| (n.node_id.clone(), n)).collect();
    let root = by_id
        .get(ROOT_ID)
        .ok_or_else(|| Error::CorruptState("root node missing; run init".to_string()))?;

    let mut out = Vec::new();
    walk(root, &by_id, &mut out);
    Ok(out)
}

fn walk(node: &Node, by_id: &HashMap<String, Node>, out: &mut Vec<TreeEntry>) {
    out.push(TreeEntry {
        depth: node.depth,
        node_id: node.node_id.clone(),
        title: node.title.clone(),
        current_version: node.current_version,
    });
    for child_id in &node.child_order {
        if let Some(child) = by_id.get(child_id) {
            walk(child, by_id, out);
        }
    }
}
