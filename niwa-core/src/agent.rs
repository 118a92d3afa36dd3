use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::store::{Store, Txn};

/// A lightweight record of a writer, created lazily the first time its
/// identifier appears in any write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

fn key(agent_id: &str) -> Vec<u8> {
    format!("agent/{}", agent_id).into_bytes()
}

const PREFIX: &[u8] = b"agent/";

/// Upserts the agent record: creates it on first sight, otherwise just
/// bumps `last_seen`. Call within the same transaction as the write that
/// triggered it.
pub fn touch<E: Engine>(txn: &mut Txn<'_, E>, agent_id: &str, now: DateTime<Utc>) -> CResult<()> {
    let agent = match txn.get(&key(agent_id)) {
        Some(bytes) => {
            let mut agent: Agent = bincode::deserialize(&bytes)?;
            agent.last_seen = now;
            agent
        }
        None => Agent { agent_id: agent_id.to_string(), first_seen: now, last_seen: now },
    };
    txn.put(key(agent_id), bincode::serialize(&agent)?);
    Ok(())
}

pub fn all<E: Engine>(store: &Store<E>) -> CResult<Vec<Agent>> {
    store
        .range(PREFIX)
        .into_iter()
        .map(|(_, v)| bincode::deserialize(&v).map_err(crate::error::Error::from))
        .collect()
}
