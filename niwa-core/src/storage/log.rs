use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use fs4::FileExt;

use crate::error::{CResult, Error};

/// An append-only log file containing a sequence of bincode-encoded
/// transaction batches, each framed as:
///
/// - Record length as big-endian u32.
/// - Record bytes: a bincode-encoded `Vec<(Vec<u8>, Vec<u8>)>`.
///
/// Framing a whole transaction as one record (rather than one record per
/// key, as a plain log-structured store would) is what gives `Store`
/// transactions crash atomicity: on recovery, an incomplete trailing
/// record is truncated and discarded wholesale, so a transaction is either
/// entirely visible or entirely absent.
pub struct Log {
    /// Path to the log file.
    pub(crate) path: PathBuf,
    /// The opened file containing the log.
    pub(crate) file: std::fs::File,
}

impl Log {
    /// Opens or creates a log file without taking an exclusive lock.
    /// Used for read-only snapshots, which must not block a concurrent writer.
    pub fn open_read_only(path: PathBuf) -> CResult<Self> {
        Self::open(path, false)
    }

    /// Opens or creates a log file, taking out an exclusive lock immediately.
    /// Returns `Error::StoreBusy` if another process already holds it.
    pub fn open_for_write(path: PathBuf) -> CResult<Self> {
        Self::open(path, true)
    }

    fn open(path: PathBuf, exclusive: bool) -> CResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|err| Error::Io(format!("{}: {:?}", err, dir)))?;
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        if exclusive {
            file.try_lock_exclusive().map_err(|_| {
                Error::StoreBusy(format!("{} is locked by another process", path.display()))
            })?;
        }

        Ok(Self { path, file })
    }

    /// Replays every record from the start of the file, applying each
    /// batch's writes in order. If an incomplete trailing record is found
    /// (a crash mid-write), it is truncated and a warning logged.
    pub fn replay(&mut self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut len_buf = [0u8; 4];
        let mut writes = Vec::new();
        let file_len = self.file.metadata()?.len();
        let mut r = BufReader::new(&mut self.file);
        let mut pos = r.seek(SeekFrom::Start(0))?;

        while pos < file_len {
            let mut read_record = || -> std::io::Result<Vec<u8>> {
                r.read_exact(&mut len_buf)?;
                let record_len = u32::from_be_bytes(len_buf);
                if pos + 4 + record_len as u64 > file_len {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "record extends beyond end of file",
                    ));
                }
                let mut record = vec![0; record_len as usize];
                r.read_exact(&mut record)?;
                Ok(record)
            };

            match read_record() {
                Ok(record) => {
                    let batch: Vec<(Vec<u8>, Vec<u8>)> = bincode::deserialize(&record)?;
                    pos += 4 + record.len() as u64;
                    writes.extend(batch);
                }
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    log::warn!("found incomplete record at offset {}, truncating file", pos);
                    self.file.set_len(pos)?;
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(writes)
    }

    /// Appends one transaction batch as a single record and fsyncs.
    pub fn append_batch(&mut self, batch: &[(Vec<u8>, Vec<u8>)]) -> CResult<()> {
        let record = bincode::serialize(&batch.to_vec())?;
        let record_len = record.len() as u32;

        self.file.seek(SeekFrom::End(0))?;
        let mut w = BufWriter::with_capacity(4 + record.len(), &mut self.file);
        w.write_all(&record_len.to_be_bytes())?;
        w.write_all(&record)?;
        w.flush()?;
        drop(w);

        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Log;

    #[test]
    fn replay_recovers_written_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.log");

        {
            let mut log = Log::open_for_write(path.clone()).unwrap();
            log.append_batch(&[(b"node/h1_0".to_vec(), b"a".to_vec())]).unwrap();
            log.append_batch(&[
                (b"node/h1_1".to_vec(), b"b".to_vec()),
                (b"version/h1_1/1".to_vec(), b"c".to_vec()),
            ])
            .unwrap();
        }

        let mut log = Log::open_read_only(path).unwrap();
        let writes = log.replay().unwrap();
        assert_eq!(
            writes,
            vec![
                (b"node/h1_0".to_vec(), b"a".to_vec()),
                (b"node/h1_1".to_vec(), b"b".to_vec()),
                (b"version/h1_1/1".to_vec(), b"c".to_vec()),
            ]
        );
    }

    #[test]
    fn truncates_incomplete_trailing_record() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.log");

        {
            let mut log = Log::open_for_write(path.clone()).unwrap();
            log.append_batch(&[(b"a".to_vec(), b"1".to_vec())]).unwrap();
        }

        // Simulate a crash mid-write: a length prefix with no body.
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&100u32.to_be_bytes()).unwrap();
        }

        let mut log = Log::open_read_only(path.clone()).unwrap();
        let writes = log.replay().unwrap();
        assert_eq!(writes, vec![(b"a".to_vec(), b"1".to_vec())]);

        // The incomplete record was truncated away.
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() < 100);
    }
}
