// Snapshot file header — bit-exact with the external raw-CSV→snapshot
// converter's output. Layout (little-endian, 40 bytes):
//
//   [4: magic][2: version][2: depth][4: record_size][4: endian_check]
//   [8: price_scale][8: qty_scale][8: record_count]
//
// Confirmed field-for-field against the converter's own sanity-check
// tooling (`struct.Struct("<IHHIIqqQ")`), not guessed from the prose spec.

use thiserror::Error;

pub const HEADER_SIZE: usize = 40;
pub const MAGIC: u32 = 0x4C32424F;
pub const ENDIAN_CHECK: u32 = 0x01020304;
pub const SUPPORTED_VERSION: u16 = 1;

pub const ASK_NULL_PRICE_Q: i64 = i64::MAX;
pub const BID_NULL_PRICE_Q: i64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("snapshot file too short: need at least {need} bytes, have {have}")]
    FileTooShort { need: usize, have: usize },
    #[error("header invalid: {0}")]
    HeaderInvalid(String),
    #[error("file size inconsistent: {0}")]
    FileSizeInconsistent(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub depth: u16,
    pub record_size: u32,
    pub price_scale: i64,
    pub qty_scale: i64,
    /// As declared in the file; may be 0 if unknown at write time. Use
    /// [`Header::inferred_record_count`] for the authoritative count.
    pub declared_record_count: u64,
}

impl Header {
    /// Parses and validates the 40-byte header. Does not look at the rest
    /// of the file — callers combine this with [`Header::validate_file_size`].
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::FileTooShort {
                need: HEADER_SIZE,
                have: bytes.len(),
            });
        }
        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
        let depth = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let record_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let endian_check = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let price_scale = i64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let qty_scale = i64::from_le_bytes(bytes[24..32].try_into().unwrap());
        let declared_record_count = u64::from_le_bytes(bytes[32..40].try_into().unwrap());

        if magic != MAGIC {
            return Err(CodecError::HeaderInvalid(format!(
                "bad magic: expected {:#010x}, got {:#010x}",
                MAGIC, magic
            )));
        }
        if endian_check != ENDIAN_CHECK {
            return Err(CodecError::HeaderInvalid(format!(
                "bad endian_check: expected {:#010x}, got {:#010x}",
                ENDIAN_CHECK, endian_check
            )));
        }
        if version != SUPPORTED_VERSION {
            return Err(CodecError::HeaderInvalid(format!(
                "unsupported version {version}"
            )));
        }
        if depth == 0 {
            return Err(CodecError::HeaderInvalid("depth must be > 0".into()));
        }
        if price_scale <= 0 {
            return Err(CodecError::HeaderInvalid("price_scale must be > 0".into()));
        }
        if qty_scale <= 0 {
            return Err(CodecError::HeaderInvalid("qty_scale must be > 0".into()));
        }
        let expected_record_size = 16 + 32 * depth as u32;
        if record_size != expected_record_size {
            return Err(CodecError::HeaderInvalid(format!(
                "record_size {record_size} does not match depth {depth} (expected {expected_record_size})"
            )));
        }

        Ok(Header {
            version,
            depth,
            record_size,
            price_scale,
            qty_scale,
            declared_record_count,
        })
    }

    /// Validates `(file_size - HEADER_SIZE) % record_size == 0` and, if a
    /// non-zero record count was declared, that it matches the inferred
    /// count. Returns the authoritative record count.
    pub fn validate_file_size(&self, file_size: u64) -> Result<u64, CodecError> {
        if file_size < HEADER_SIZE as u64 {
            return Err(CodecError::FileSizeInconsistent(format!(
                "file size {file_size} smaller than header size {HEADER_SIZE}"
            )));
        }
        let body = file_size - HEADER_SIZE as u64;
        if body % self.record_size as u64 != 0 {
            return Err(CodecError::FileSizeInconsistent(format!(
                "body size {body} is not a multiple of record_size {}",
                self.record_size
            )));
        }
        let inferred = body / self.record_size as u64;
        if self.declared_record_count != 0 && self.declared_record_count != inferred {
            return Err(CodecError::FileSizeInconsistent(format!(
                "declared record_count {} does not match inferred {inferred}",
                self.declared_record_count
            )));
        }
        Ok(inferred)
    }

    /// Serializes back to the 40-byte on-disk layout. Used by the codec
    /// round-trip property (R2).
    pub fn to_bytes(&self, record_count: u64) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6..8].copy_from_slice(&self.depth.to_le_bytes());
        out[8..12].copy_from_slice(&self.record_size.to_le_bytes());
        out[12..16].copy_from_slice(&ENDIAN_CHECK.to_le_bytes());
        out[16..24].copy_from_slice(&self.price_scale.to_le_bytes());
        out[24..32].copy_from_slice(&self.qty_scale.to_le_bytes());
        out[32..40].copy_from_slice(&record_count.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes(depth: u16, record_count: u64) -> Vec<u8> {
        let h = Header {
            version: SUPPORTED_VERSION,
            depth,
            record_size: 16 + 32 * depth as u32,
            price_scale: 100_000_000,
            qty_scale: 1,
            declared_record_count: record_count,
        };
        h.to_bytes(record_count).to_vec()
    }

    #[test]
    fn parses_valid_header() {
        let bytes = sample_header_bytes(20, 5);
        let h = Header::parse(&bytes).unwrap();
        assert_eq!(h.depth, 20);
        assert_eq!(h.record_size, 656);
        assert_eq!(h.price_scale, 100_000_000);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header_bytes(20, 0);
        bytes[0] = 0xAA;
        assert!(matches!(
            Header::parse(&bytes),
            Err(CodecError::HeaderInvalid(_))
        ));
    }

    #[test]
    fn rejects_mismatched_record_size() {
        let mut bytes = sample_header_bytes(20, 0);
        bytes[8..12].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            Header::parse(&bytes),
            Err(CodecError::HeaderInvalid(_))
        ));
    }

    #[test]
    fn file_size_validation_infers_count() {
        let h = Header::parse(&sample_header_bytes(20, 0)).unwrap();
        let inferred = h.validate_file_size(HEADER_SIZE as u64 + 656 * 3).unwrap();
        assert_eq!(inferred, 3);
    }

    #[test]
    fn file_size_validation_rejects_partial_record() {
        let h = Header::parse(&sample_header_bytes(20, 0)).unwrap();
        let err = h.validate_file_size(HEADER_SIZE as u64 + 656 * 3 + 10);
        assert!(matches!(err, Err(CodecError::FileSizeInconsistent(_))));
    }

    #[test]
    fn file_size_validation_rejects_declared_mismatch() {
        let h = Header::parse(&sample_header_bytes(20, 99)).unwrap();
        let err = h.validate_file_size(HEADER_SIZE as u64 + 656 * 3);
        assert!(matches!(err, Err(CodecError::FileSizeInconsistent(_))));
    }

    #[test]
    fn header_round_trips_through_bytes() {
        let bytes = sample_header_bytes(5, 42);
        let h = Header::parse(&bytes).unwrap();
        assert_eq!(h.to_bytes(42).to_vec(), bytes);
    }
}
