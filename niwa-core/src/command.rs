use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_derive::{Deserialize, Serialize};

use crate::agent::{self, Agent};
use crate::conflict::{self, Conflict, Resolution};
use crate::diff::{self, DiffLine};
use crate::error::{CResult, Error};
use crate::markdown;
use crate::node;
use crate::read_tracker;
use crate::search;
use crate::storage::engine::Engine;
use crate::storage::EngineStatus;
use crate::store::Store;
use crate::tree::{self, TreeEntry};
use crate::version::{self, Version};

/// A closed set of requests the outer CLI shell can make of the core.
/// Content-source resolution (explicit argument vs `--file` vs `--stdin`)
/// happens in the shell; by the time an `Operation` is built, `content` is
/// already a plain string.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Init,
    Add { title: String, parent_id: Option<String>, content: String, author: String },
    Read { node_id: String, author: String },
    Peek { node_id: String },
    Edit { node_id: String, content: String, author: String, summary: Option<String> },
    Rename { node_id: String, title: String, author: String },
    Resolve { node_id: String, author: String, action: Resolution, merged_content: Option<String> },
    Conflicts { node_id: Option<String> },
    History { node_id: String },
    Diff { node_id: String, from: Option<u64>, to: Option<u64> },
    Tree,
    Export,
    Search { query: String },
    Load { markdown: String, author: String },
    Status,
    Agents,
    Whoami { author: String },
    Check,
}

/// The structured result of dispatching an `Operation`. The CLI shell is
/// responsible for rendering this to text; the core never flattens
/// structured data (such as a conflict's two sides) to strings itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OperationResult {
    Initialized,
    Added { node_id: String },
    Read { node_id: String, content: String, version: u64 },
    Peeked { node_id: String, content: String, version: u64 },
    Edited { node_id: String, version: u64 },
    Renamed { node_id: String, version: u64 },
    Resolved { node_id: String, version: u64 },
    Conflicts(Vec<Conflict>),
    History(Vec<Version>),
    Diff(Vec<DiffLine>),
    Tree(Vec<TreeEntryDto>),
    Exported(String),
    SearchResults(Vec<String>),
    Loaded(Vec<String>),
    Status(EngineStatus),
    Agents(Vec<Agent>),
    Whoami(String),
    Check(CheckReport),
}

/// `TreeEntry` mirrored into a serializable DTO for `OperationResult`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEntryDto {
    pub depth: u32,
    pub node_id: String,
    pub title: String,
    pub current_version: u64,
}

impl From<TreeEntry> for TreeEntryDto {
    fn from(e: TreeEntry) -> Self {
        Self { depth: e.depth, node_id: e.node_id, title: e.title, current_version: e.current_version }
    }
}

/// The result of `check`, which verifies invariants 1 (acyclicity), 2
/// (depth consistency), 3 (sibling title uniqueness), 4 (version density)
/// and 5 (causal base_version linkage).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub ok: bool,
    pub violations: Vec<String>,
}

/// A thin dispatcher mapping `Operation`s onto the component methods of
/// `niwa-core`. Owns the `Store`; everything else is reconstructed or
/// queried on demand.
pub struct CommandSurface<E: Engine> {
    store: Store<E>,
}

impl<E: Engine> CommandSurface<E> {
    pub fn new(store: Store<E>) -> CResult<Self> {
        Ok(Self { store })
    }

    pub fn store(&self) -> &Store<E> {
        &self.store
    }

    pub fn dispatch(&mut self, op: Operation) -> CResult<OperationResult> {
        let now = Utc::now();
        match op {
            Operation::Init => {
                let mut txn = self.store.begin();
                tree::ensure_root(&mut txn, now)?;
                txn.commit()?;
                Ok(OperationResult::Initialized)
            }

            Operation::Add { title, parent_id, content, author } => {
                let mut txn = self.store.begin();
                let node_id =
                    tree::create(&mut txn, &title, parent_id.as_deref(), &content, &author, now)?;
                txn.commit()?;
                Ok(OperationResult::Added { node_id })
            }

            Operation::Read { node_id, author } => {
                let latest = version::latest(&self.store, &node_id)?;
                let mut txn = self.store.begin();
                read_tracker::record(&mut txn, &author, &node_id, latest.version, now)?;
                agent::touch(&mut txn, &author, now)?;
                txn.commit()?;
                Ok(OperationResult::Read { node_id, content: latest.content, version: latest.version })
            }

            Operation::Peek { node_id } => {
                let latest = version::latest(&self.store, &node_id)?;
                Ok(OperationResult::Peeked { node_id, content: latest.content, version: latest.version })
            }

            Operation::Edit { node_id, content, author, summary } => {
                let version = conflict::submit_edit(&self.store, &node_id, &author, &content, summary, now)?;
                Ok(OperationResult::Edited { node_id, version })
            }

            Operation::Rename { node_id, title, author } => {
                let mut txn = self.store.begin();
                let version = tree::rename(&mut txn, &node_id, &title, &author, now)?;
                txn.commit()?;
                Ok(OperationResult::Renamed { node_id, version })
            }

            Operation::Resolve { node_id, author, action, merged_content } => {
                let version =
                    conflict::resolve(&self.store, &node_id, &author, action, merged_content, now)?;
                Ok(OperationResult::Resolved { node_id, version })
            }

            Operation::Conflicts { node_id } => {
                Ok(OperationResult::Conflicts(conflict::pending(&self.store, node_id.as_deref())?))
            }

            Operation::History { node_id } => {
                Ok(OperationResult::History(version::list(&self.store, &node_id)?))
            }

            Operation::Diff { node_id, from, to } => {
                let node = node::load(&self.store, &node_id)?;
                let to = to.unwrap_or(node.current_version);
                let from = from.unwrap_or_else(|| to.saturating_sub(1).max(1));
                let a = version::get(&self.store, &node_id, from)?;
                let b = version::get(&self.store, &node_id, to)?;
                Ok(OperationResult::Diff(diff::diff(&a.content, &b.content)))
            }

            Operation::Tree => {
                let entries = tree::traverse(&self.store)?.into_iter().map(Into::into).collect();
                Ok(OperationResult::Tree(entries))
            }

            Operation::Export => Ok(OperationResult::Exported(markdown::serialize(&self.store)?)),

            Operation::Search { query } => {
                Ok(OperationResult::SearchResults(search::search(&self.store, &query)?))
            }

            Operation::Load { markdown: doc, author } => {
                Ok(OperationResult::Loaded(markdown::load_into(&self.store, &doc, &author, now)?))
            }

            Operation::Status => Ok(OperationResult::Status(self.store.status()?)),

            Operation::Agents => Ok(OperationResult::Agents(agent::all(&self.store)?)),

            Operation::Whoami { author } => Ok(OperationResult::Whoami(author)),

            Operation::Check => Ok(OperationResult::Check(check(&self.store)?)),
        }
    }
}

/// Verifies invariants 1-5 against the current store contents.
pub fn check<E: Engine>(store: &Store<E>) -> CResult<CheckReport> {
    let mut violations = Vec::new();
    let nodes = node::all(store)?;
    let by_id: HashMap<String, node::Node> =
        nodes.iter().map(|n| (n.node_id.clone(), n.clone())).collect();

    for n in &nodes {
        // Invariant 2: depth consistency.
        if let Some(parent_id) = &n.parent_id {
            if let Some(parent) = by_id.get(parent_id) {
                if n.depth != parent.depth + 1 {
                    violations.push(format!(
                        "node {} has depth {} but parent {} has depth {}",
                        n.node_id, n.depth, parent_id, parent.depth
                    ));
                }
            } else {
                violations.push(format!("node {} references missing parent {}", n.node_id, parent_id));
            }
        } else if n.node_id != tree::ROOT_ID && n.depth != 1 {
            violations.push(format!("top-level node {} has depth {} (expected 1)", n.node_id, n.depth));
        }

        // Invariant 1: acyclicity, terminating at a depth-1 node within 6 hops.
        let mut seen = HashSet::new();
        let mut cur = n.clone();
        let mut hops = 0;
        loop {
            if !seen.insert(cur.node_id.clone()) {
                violations.push(format!("cycle detected reaching node {}", n.node_id));
                break;
            }
            match &cur.parent_id {
                None => break,
                Some(parent_id) => {
                    hops += 1;
                    if hops > 6 {
                        violations.push(format!("node {} exceeds max ancestor depth", n.node_id));
                        break;
                    }
                    match by_id.get(parent_id) {
                        Some(parent) => cur = parent.clone(),
                        None => break,
                    }
                }
            }
        }

        // Invariant 3: sibling title uniqueness.
        let mut seen_titles = HashSet::new();
        for child_id in &n.child_order {
            if let Some(child) = by_id.get(child_id) {
                if !seen_titles.insert(child.title.clone()) {
                    violations.push(format!(
                        "duplicate sibling title {:?} under parent {}",
                        child.title, n.node_id
                    ));
                }
            }
        }

        // Invariant 4 + 5: version density and causal base_version linkage.
        let versions = version::list(store, &n.node_id)?;
        for (i, v) in versions.iter().enumerate() {
            let expected = (i + 1) as u64;
            if v.version != expected {
                violations.push(format!(
                    "node {} has non-dense version sequence at position {}: found {}",
                    n.node_id, i, v.version
                ));
            }
            if v.version > 1 && v.base_version != Some(v.version - 1) {
                violations.push(format!(
                    "node {} version {} has base_version {:?}, expected {}",
                    n.node_id,
                    v.version,
                    v.base_version,
                    v.version - 1
                ));
            }
        }
        if versions.len() as u64 != n.current_version {
            violations.push(format!(
                "node {} has current_version {} but {} version row(s)",
                n.node_id,
                n.current_version,
                versions.len()
            ));
        }
    }

    Ok(CheckReport { ok: violations.is_empty(), violations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::Memory;

    fn surface() -> CommandSurface<Memory> {
        CommandSurface::new(Store::new(Memory::new()).unwrap()).unwrap()
    }

    #[test]
    fn sequential_happy_path() {
        let mut s = surface();
        s.dispatch(Operation::Init).unwrap();
        let added = s
            .dispatch(Operation::Add {
                title: "A".into(),
                parent_id: None,
                content: String::new(),
                author: "a1".into(),
            })
            .unwrap();
        let node_id = match added {
            OperationResult::Added { node_id } => node_id,
            _ => panic!("unexpected result"),
        };

        s.dispatch(Operation::Read { node_id: node_id.clone(), author: "a1".into() }).unwrap();
        let edited = s
            .dispatch(Operation::Edit {
                node_id: node_id.clone(),
                content: "x".into(),
                author: "a1".into(),
                summary: None,
            })
            .unwrap();
        assert_eq!(edited, OperationResult::Edited { node_id: node_id.clone(), version: 2 });
    }

    #[test]
    fn stale_write_then_resolve() {
        let mut s = surface();
        s.dispatch(Operation::Init).unwrap();
        let added = s
            .dispatch(Operation::Add {
                title: "A".into(),
                parent_id: None,
                content: String::new(),
                author: "a1".into(),
            })
            .unwrap();
        let node_id = match added {
            OperationResult::Added { node_id } => node_id,
            _ => panic!(),
        };

        s.dispatch(Operation::Read { node_id: node_id.clone(), author: "a1".into() }).unwrap();
        s.dispatch(Operation::Read { node_id: node_id.clone(), author: "a2".into() }).unwrap();
        s.dispatch(Operation::Edit {
            node_id: node_id.clone(),
            content: "X".into(),
            author: "a1".into(),
            summary: None,
        })
        .unwrap();

        let err = s
            .dispatch(Operation::Edit {
                node_id: node_id.clone(),
                content: "Y".into(),
                author: "a2".into(),
                summary: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::ConflictDetected { .. }));

        let resolved = s
            .dispatch(Operation::Resolve {
                node_id: node_id.clone(),
                author: "a2".into(),
                action: Resolution::AcceptYours,
                merged_content: None,
            })
            .unwrap();
        assert_eq!(resolved, OperationResult::Resolved { node_id, version: 3 });
    }

    #[test]
    fn check_reports_no_violations_on_clean_store() {
        let mut s = surface();
        s.dispatch(Operation::Init).unwrap();
        s.dispatch(Operation::Add {
            title: "A".into(),
            parent_id: None,
            content: String::new(),
            author: "a1".into(),
        })
        .unwrap();

        let report = s.dispatch(Operation::Check).unwrap();
        match report {
            OperationResult::Check(report) => assert!(report.ok, "{:?}", report.violations),
            _ => panic!(),
        }
    }
}
