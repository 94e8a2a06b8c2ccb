// Data fingerprint: size plus SHA-256 of the head and tail blocks of a
// file — a fast proxy for identity without hashing the whole (possibly
// multi-GB) snapshot. Ported from the reference runner's
// `DataFingerprint`/`fingerprint_file`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

const DEFAULT_BLOCK_BYTES: u64 = 4096;

#[derive(Debug, Clone, Serialize)]
pub struct DataFingerprint {
    pub path: String,
    pub size_bytes: u64,
    pub head_sha256: String,
    pub tail_sha256: String,
}

pub fn fingerprint_file(path: &Path) -> std::io::Result<DataFingerprint> {
    fingerprint_file_with_block(path, DEFAULT_BLOCK_BYTES)
}

pub fn fingerprint_file_with_block(path: &Path, block_bytes: u64) -> std::io::Result<DataFingerprint> {
    let mut file = File::open(path)?;
    let size_bytes = file.metadata()?.len();

    let head_len = block_bytes.min(size_bytes) as usize;
    let mut head_buf = vec![0u8; head_len];
    file.read_exact(&mut head_buf)?;
    let head_sha256 = hex::encode(Sha256::digest(&head_buf));

    let tail_start = size_bytes.saturating_sub(block_bytes);
    file.seek(SeekFrom::Start(tail_start))?;
    let mut tail_buf = Vec::new();
    file.read_to_end(&mut tail_buf)?;
    let tail_sha256 = hex::encode(Sha256::digest(&tail_buf));

    Ok(DataFingerprint {
        path: path.display().to_string(),
        size_bytes,
        head_sha256,
        tail_sha256,
    })
}

/// Streaming SHA-256 of an entire file, in 1 MiB chunks — used for digesting
/// the emitted artifact streams (`fills.jsonl`, `events.jsonl`, etc).
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fingerprint_of_small_file_hashes_whole_thing_as_both_head_and_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let fp = fingerprint_file(&path).unwrap();
        assert_eq!(fp.size_bytes, 11);
        assert_eq!(fp.head_sha256, fp.tail_sha256);
    }

    #[test]
    fn fingerprint_differs_for_head_and_tail_of_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        let mut f = File::create(&path).unwrap();
        let mut data = vec![0u8; 20_000];
        data[0] = 1;
        data[19_999] = 2;
        f.write_all(&data).unwrap();
        let fp = fingerprint_file_with_block(&path, 4096).unwrap();
        assert_ne!(fp.head_sha256, fp.tail_sha256);
    }

    #[test]
    fn file_sha256_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"deterministic content").unwrap();
        let a = file_sha256(&path).unwrap();
        let b = file_sha256(&path).unwrap();
        assert_eq!(a, b);
    }
}
