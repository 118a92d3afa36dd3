use std::collections::BTreeMap;

use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::storage::EngineStatus;

/// A purely in-memory `Engine`, used by niwa-core's own unit tests. Never
/// touches disk; `append_batch` just folds writes into a map.
pub struct Memory {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Memory {
    pub fn new() -> Self {
        Self { data: BTreeMap::new() }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memory")
    }
}

impl Engine for Memory {
    fn load_all(&mut self) -> CResult<BTreeMap<Vec<u8>, Vec<u8>>> {
        Ok(self.data.clone())
    }

    fn append_batch(&mut self, batch: &[(Vec<u8>, Vec<u8>)]) -> CResult<()> {
        for (key, value) in batch {
            self.data.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn status(&mut self) -> CResult<EngineStatus> {
        let keys = self.data.len() as u64;
        let size = self.data.iter().fold(0, |acc, (k, v)| acc + k.len() as u64 + v.len() as u64);
        Ok(EngineStatus { name: self.to_string(), keys, size, total_disk_size: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::Memory;

    super::super::tests::test_engine!(Memory::new());
}
