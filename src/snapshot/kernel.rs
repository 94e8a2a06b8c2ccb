// The Replay Kernel — a lazy, finite, forward-only sequence of L2 records
// read from one `.snap` file.
//
// WHY MMAP:
// The snapshot file is read sequentially exactly once per run; mapping it
// lets the OS page in data on demand and lets `RecordView` borrow directly
// from the file's pages with zero copies. Platforms where mapping fails
// fall back to a single reused record-sized buffer — the contract is
// "forward-only, zero allocation per step", not mmap specifically.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;

use super::codec::RecordView;
use super::header::{CodecError, Header, HEADER_SIZE};

enum Backing {
    Mapped(Mmap),
    Buffered { file: File, buf: Vec<u8> },
}

pub struct ReplayKernel {
    backing: Backing,
    header: Header,
    record_count: u64,
    cursor: u64,
}

impl ReplayKernel {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let mut file = File::open(path)?;
        let mut head = [0u8; HEADER_SIZE];
        file.read_exact(&mut head)?;
        let header = Header::parse(&head)?;
        let file_len = file.metadata()?.len();
        let record_count = header.validate_file_size(file_len)?;

        let backing = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Backing::Mapped(mmap),
            Err(_) => {
                file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
                Backing::Buffered {
                    file,
                    buf: vec![0u8; header.record_size as usize],
                }
            }
        };

        Ok(ReplayKernel {
            backing,
            header,
            record_count,
            cursor: 0,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Advances to the next record, or `None` once the file is exhausted.
    /// Non-restartable: there is no `reset`, matching the kernel's
    /// forward-only contract.
    pub fn next(&mut self) -> Result<Option<RecordView<'_>>, CodecError> {
        if self.cursor >= self.record_count {
            return Ok(None);
        }
        let record_size = self.header.record_size as usize;
        let depth = self.header.depth as usize;
        let index = self.cursor as usize;
        self.cursor += 1;

        match &mut self.backing {
            Backing::Mapped(mmap) => {
                let start = HEADER_SIZE + index * record_size;
                let end = start + record_size;
                Ok(Some(RecordView::new(&mmap[start..end], depth)))
            }
            Backing::Buffered { file, buf } => {
                file.read_exact(buf)?;
                Ok(Some(RecordView::new(buf, depth)))
            }
        }
    }
}
