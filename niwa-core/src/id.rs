use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::store::Txn;

fn key(depth: u32) -> Vec<u8> {
    format!("idalloc/{}", depth).into_bytes()
}

fn named_key(name: &str) -> Vec<u8> {
    format!("idalloc/{}", name).into_bytes()
}

fn read_counter<E: Engine>(txn: &Txn<'_, E>, key: &[u8]) -> CResult<u64> {
    match txn.get(key) {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(0),
    }
}

/// Allocates a stable node id `h{depth}_{ordinal}`, persisting the bumped
/// counter in the same transaction as the node it identifies. Ordinals
/// start at 0 per depth and are never reused, even across deletions (the
/// core never deletes nodes, but the counter would still hold even if it
/// did).
pub fn allocate<E: Engine>(txn: &mut Txn<'_, E>, depth: u32) -> CResult<String> {
    let key = key(depth);
    let ordinal = read_counter(txn, &key)?;
    txn.put(key, bincode::serialize(&(ordinal + 1))?);
    Ok(format!("h{}_{}", depth, ordinal))
}

/// Allocates a conflict id `c{ordinal}`, drawing from a counter namespace
/// separate from the per-depth node counters. Zero-padded so lexicographic
/// string order matches numeric order, the same trick `version.rs` uses for
/// its keys — conflict ids are sorted as strings by `conflict::pending` and
/// `conflict::pick_conflict`.
pub fn allocate_conflict<E: Engine>(txn: &mut Txn<'_, E>) -> CResult<String> {
    let key = named_key("conflict");
    let ordinal = read_counter(txn, &key)?;
    txn.put(key, bincode::serialize(&(ordinal + 1))?);
    Ok(format!("c{:020}", ordinal))
}
