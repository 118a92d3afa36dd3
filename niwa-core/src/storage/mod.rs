pub mod engine;
pub mod log;
pub mod log_cask;
pub mod memory;

use serde_derive::{Deserialize, Serialize};

/// Status of the underlying byte-storage engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// The name of the storage engine.
    pub name: String,

    /// The number of live keys in the engine.
    pub keys: u64,

    /// The logical size of live key/value pairs.
    pub size: u64,

    /// On-disk size of all data, live and garbage. 0 for in-memory engines.
    pub total_disk_size: u64,
}

#[cfg(test)]
pub(crate) mod tests {
    /// Generates common tests for any Engine implementation.
    macro_rules! test_engine {
        ($setup:expr) => {
            #[test]
            fn point_ops() -> crate::error::CResult<()> {
                let mut s = $setup;
                assert_eq!(s.load_all()?.get(b"a".as_slice()), None);

                s.append_batch(&[(b"a".to_vec(), b"1".to_vec())])?;
                assert_eq!(s.load_all()?.get(b"a".as_slice()), Some(&b"1".to_vec()));

                s.append_batch(&[(b"b".to_vec(), b"2".to_vec())])?;
                let all = s.load_all()?;
                assert_eq!(all.get(b"a".as_slice()), Some(&b"1".to_vec()));
                assert_eq!(all.get(b"b".as_slice()), Some(&b"2".to_vec()));

                // Re-setting a key overwrites it.
                s.append_batch(&[(b"a".to_vec(), b"3".to_vec())])?;
                assert_eq!(s.load_all()?.get(b"a".as_slice()), Some(&b"3".to_vec()));

                Ok(())
            }

            #[test]
            fn batch_is_one_atomic_write() -> crate::error::CResult<()> {
                let mut s = $setup;
                s.append_batch(&[
                    (b"x".to_vec(), b"1".to_vec()),
                    (b"y".to_vec(), b"2".to_vec()),
                ])?;
                let all = s.load_all()?;
                assert_eq!(all.get(b"x".as_slice()), Some(&b"1".to_vec()));
                assert_eq!(all.get(b"y".as_slice()), Some(&b"2".to_vec()));
                Ok(())
            }

            #[test]
            fn status_reports_key_count() -> crate::error::CResult<()> {
                let mut s = $setup;
                s.append_batch(&[(b"a".to_vec(), vec![1, 2, 3])])?;
                s.append_batch(&[(b"b".to_vec(), vec![1])])?;
                let status = s.status()?;
                assert_eq!(status.keys, 2);
                Ok(())
            }
        };
    }

    pub(crate) use test_engine;
}
