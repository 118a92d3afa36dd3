use std::collections::BTreeMap;

use crate::error::CResult;
use crate::storage::EngineStatus;

/// A raw byte-oriented storage engine for whole transaction batches.
///
/// Unlike a general-purpose key/value engine, `Engine` does not expose
/// point gets or incremental scans: `Store` always reconstructs the full
/// key/value map from `load_all()` at the start of a process (spec §5),
/// since a document tree's live data is small enough to keep entirely in
/// memory. Each call to `append_batch` durably persists one `Store`
/// transaction as a single atomic unit.
pub trait Engine: std::fmt::Display + Send + Sync {
    /// Reconstructs the full current key/value map by replaying every
    /// committed batch in order.
    fn load_all(&mut self) -> CResult<BTreeMap<Vec<u8>, Vec<u8>>>;

    /// Durably appends one transaction's writes as a single record. Either
    /// all writes in `batch` become visible to the next `load_all()`, or
    /// (if the process crashes mid-write) none do.
    fn append_batch(&mut self, batch: &[(Vec<u8>, Vec<u8>)]) -> CResult<()>;

    /// Returns engine status.
    fn status(&mut self) -> CResult<EngineStatus>;
}
