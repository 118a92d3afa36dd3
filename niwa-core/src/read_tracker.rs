use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::store::Txn;

/// `(agent, node_id, observed_version, timestamp)`. At most one receipt per
/// `(agent, node_id)` pair; later reads overwrite earlier ones.
///
/// Stored as `Option<Receipt>` rather than a bare `Receipt` so that `clear`
/// can overwrite a slot back to "no receipt" without the underlying engine
/// needing a real delete operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Receipt {
    version: u64,
    timestamp: DateTime<Utc>,
}

fn key(agent: &str, node_id: &str) -> Vec<u8> {
    format!("read/{}/{}", agent, node_id).into_bytes()
}

/// Upserts the receipt for `(agent, node_id)` to `version`.
pub fn record<E: Engine>(
    txn: &mut Txn<'_, E>,
    agent: &str,
    node_id: &str,
    version: u64,
    now: DateTime<Utc>,
) -> CResult<()> {
    let slot: Option<Receipt> = Some(Receipt { version, timestamp: now });
    txn.put(key(agent, node_id), bincode::serialize(&slot)?);
    Ok(())
}

/// The version last observed by `agent` for `node_id`, or `None` if it has
/// never read the node, or its receipt has since been cleared.
pub fn observed<E: Engine>(txn: &Txn<'_, E>, agent: &str, node_id: &str) -> CResult<Option<u64>> {
    match txn.get(&key(agent, node_id)) {
        Some(bytes) => {
            let slot: Option<Receipt> = bincode::deserialize(&bytes)?;
            Ok(slot.map(|r| r.version))
        }
        None => Ok(None),
    }
}

/// Invoked by the conflict engine after a successful commit or resolution.
/// Clears the receipt so a subsequent `edit` without an intervening `read`
/// is rejected with `UnreadEdit` rather than spuriously quarantined.
pub fn clear<E: Engine>(txn: &mut Txn<'_, E>, agent: &str, node_id: &str) -> CResult<()> {
    let slot: Option<Receipt> = None;
    txn.put(key(agent, node_id), bincode::serialize(&slot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::Memory;
    use crate::store::Store;

    #[test]
    fn record_then_observed_round_trips() {
        let store = Store::new(Memory::new()).unwrap();
        let mut txn = store.begin();
        record(&mut txn, "a1", "h1_0", 3, Utc::now()).unwrap();
        assert_eq!(observed(&txn, "a1", "h1_0").unwrap(), Some(3));
    }

    #[test]
    fn clear_resets_to_none() {
        let store = Store::new(Memory::new()).unwrap();
        let mut txn = store.begin();
        record(&mut txn, "a1", "h1_0", 3, Utc::now()).unwrap();
        clear(&mut txn, "a1", "h1_0").unwrap();
        assert_eq!(observed(&txn, "a1", "h1_0").unwrap(), None);
    }
}
