use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::store::Store;
use crate::tree;
use crate::version;

/// Case-insensitive substring search over `title ∪ latest_content`.
/// Results are returned in pre-order of the tree; an empty query or no
/// match both yield an empty result, never an error.
pub fn search<E: Engine>(store: &Store<E>, query: &str) -> CResult<Vec<String>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let needle = query.to_lowercase();
    let mut results = Vec::new();

    for entry in tree::traverse(store)? {
        let latest = version::latest(store, &entry.node_id)?;
        if entry.title.to_lowercase().contains(&needle) || latest.content.to_lowercase().contains(&needle) {
            results.push(entry.node_id);
        }
    }

    Ok(results)
}
