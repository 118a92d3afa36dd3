use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::agent as agent_mod;
use crate::error::{CResult, Error};
use crate::id;
use crate::node;
use crate::read_tracker;
use crate::storage::engine::Engine;
use crate::store::{Store, Txn};
use crate::version::{self, Version};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
}

/// One of the fixed resolution actions the outer shell can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    AcceptYours,
    AcceptTheirs,
    Merge,
}

/// A quarantined write: content that lost the race against a concurrent
/// commit, held here instead of on the node until an agent resolves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub node_id: String,
    pub losing_author: String,
    pub losing_content: String,
    pub losing_summary: Option<String>,
    pub losing_base_version: u64,
    pub winning_version: u64,
    pub status: ConflictStatus,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

fn key(conflict_id: &str) -> Vec<u8> {
    format!("conflict/{}", conflict_id).into_bytes()
}

const PREFIX: &[u8] = b"conflict/";

fn save<E: Engine>(txn: &mut Txn<'_, E>, conflict: &Conflict) -> CResult<()> {
    txn.put(key(&conflict.conflict_id), bincode::serialize(conflict)?);
    Ok(())
}

fn all_txn<E: Engine>(txn: &Txn<'_, E>) -> CResult<Vec<Conflict>> {
    txn.range(PREFIX).into_iter().map(|(_, v)| bincode::deserialize(&v).map_err(Error::from)).collect()
}

/// All pending conflicts, optionally filtered to one node. A read-only,
/// store-level (not transaction-scoped) query, consistent with the other
/// snapshot reads in §5.
pub fn pending<E: Engine>(store: &Store<E>, node_id: Option<&str>) -> CResult<Vec<Conflict>> {
    let mut conflicts: Vec<Conflict> = store
        .range(PREFIX)
        .into_iter()
        .map(|(_, v)| bincode::deserialize(&v).map_err(Error::from))
        .collect::<CResult<Vec<_>>>()?
        .into_iter()
        .filter(|c| c.status == ConflictStatus::Pending)
        .filter(|c| node_id.map_or(true, |n| c.node_id == n))
        .collect();
    conflicts.sort_by(|a, b| a.conflict_id.cmp(&b.conflict_id));
    Ok(conflicts)
}

/// Admission control for every write after v1 (spec §4.6).
///
/// On success returns the freshly committed version number. A stale write
/// is quarantined as a `Conflict` row and rejected with
/// `Error::ConflictDetected`, carrying both the losing and winning content
/// for the caller to display.
pub fn submit_edit<E: Engine>(
    store: &Store<E>,
    node_id: &str,
    agent: &str,
    new_content: &str,
    summary: Option<String>,
    now: DateTime<Utc>,
) -> CResult<u64> {
    let mut txn = store.begin();

    let mut target = node::load_txn(&txn, node_id)?;
    let latest = version::latest_txn(&txn, node_id)?;
    let observed = read_tracker::observed(&txn, agent, node_id)?
        .ok_or_else(|| Error::UnreadEdit { node_id: node_id.to_string(), agent: agent.to_string() })?;

    if observed == latest.version {
        let new_version_num = target.current_version + 1;
        version::append(
            &mut txn,
            &Version {
                node_id: node_id.to_string(),
                version: new_version_num,
                content: new_content.to_string(),
                author: agent.to_string(),
                summary,
                timestamp: now,
                base_version: Some(observed),
            },
        )?;
        target.current_version = new_version_num;
        node::save(&mut txn, &target)?;
        read_tracker::clear(&mut txn, agent, node_id)?;
        agent_mod::touch(&mut txn, agent, now)?;
        txn.commit()?;
        Ok(new_version_num)
    } else if observed < latest.version {
        let conflict_id = id::allocate_conflict(&mut txn)?;
        let conflict = Conflict {
            conflict_id: conflict_id.clone(),
            node_id: node_id.to_string(),
            losing_author: agent.to_string(),
            losing_content: new_content.to_string(),
            losing_summary: summary,
            losing_base_version: observed,
            winning_version: latest.version,
            status: ConflictStatus::Pending,
            resolution: None,
            created_at: now,
            resolved_at: None,
        };
        save(&mut txn, &conflict)?;
        agent_mod::touch(&mut txn, agent, now)?;
        txn.commit()?;
        Err(Error::ConflictDetected {
            node_id: node_id.to_string(),
            conflict_id,
            losing_content: conflict.losing_content,
            winning_version: latest.version,
            winning_content: latest.content,
        })
    } else {
        Err(Error::CorruptState(format!(
            "observed version {} exceeds current version {} for node {}",
            observed, latest.version, node_id
        )))
    }
}

/// Picks the conflict `resolve` should act on: the most recent pending
/// conflict authored by `agent` on `node_id`, falling back to the single
/// pending conflict on that node if there's exactly one and none of
/// `agent`'s own (spec §9 open question b).
fn pick_conflict<E: Engine>(txn: &Txn<'_, E>, node_id: &str, agent: &str) -> CResult<Conflict> {
    let pending: Vec<Conflict> = all_txn(txn)?
        .into_iter()
        .filter(|c| c.node_id == node_id && c.status == ConflictStatus::Pending)
        .collect();

    if pending.is_empty() {
        return Err(Error::NoPendingConflict(node_id.to_string()));
    }

    let mut by_agent: Vec<Conflict> =
        pending.iter().filter(|c| c.losing_author == agent).cloned().collect();
    if !by_agent.is_empty() {
        by_agent.sort_by(|a, b| a.conflict_id.cmp(&b.conflict_id));
        return Ok(by_agent.pop().unwrap());
    }

    if pending.len() == 1 {
        return Ok(pending.into_iter().next().unwrap());
    }

    Err(Error::NoPendingConflict(node_id.to_string()))
}

/// Applies one of the three fixed resolution actions to the conflict chosen
/// by `pick_conflict`. Returns the node's `current_version` after the
/// resolution. Both `AcceptYours` and `Merge` append a fresh version with
/// `base_version` set to the *current* (not the stale) version; `Merge`
/// requires `merged_content`.
pub fn resolve<E: Engine>(
    store: &Store<E>,
    node_id: &str,
    agent: &str,
    action: Resolution,
    merged_content: Option<String>,
    now: DateTime<Utc>,
) -> CResult<u64> {
    let mut txn = store.begin();
    let mut conflict = pick_conflict(&txn, node_id, agent)?;
    let mut target = node::load_txn(&txn, node_id)?;

    let new_current_version = match action {
        Resolution::AcceptTheirs => target.current_version,
        Resolution::AcceptYours => {
            let new_version_num = target.current_version + 1;
            version::append(
                &mut txn,
                &Version {
                    node_id: node_id.to_string(),
                    version: new_version_num,
                    content: conflict.losing_content.clone(),
                    author: conflict.losing_author.clone(),
                    summary: conflict.losing_summary.clone(),
                    timestamp: now,
                    base_version: Some(target.current_version),
                },
            )?;
            target.current_version = new_version_num;
            node::save(&mut txn, &target)?;
            new_version_num
        }
        Resolution::Merge => {
            let content =
                merged_content.ok_or_else(|| Error::MergeContentRequired(node_id.to_string()))?;
            let new_version_num = target.current_version + 1;
            version::append(
                &mut txn,
                &Version {
                    node_id: node_id.to_string(),
                    version: new_version_num,
                    content,
                    author: agent.to_string(),
                    summary: conflict.losing_summary.clone(),
                    timestamp: now,
                    base_version: Some(target.current_version),
                },
            )?;
            target.current_version = new_version_num;
            node::save(&mut txn, &target)?;
            new_version_num
        }
    };

    conflict.status = ConflictStatus::Resolved;
    conflict.resolution = Some(action);
    conflict.resolved_at = Some(now);
    save(&mut txn, &conflict)?;

    read_tracker::clear(&mut txn, agent, node_id)?;
    agent_mod::touch(&mut txn, agent, now)?;
    txn.commit()?;

    Ok(new_current_version)
}
