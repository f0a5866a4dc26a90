//! Initial buffer content: either in-memory bytes or a read-only file map.

use std::fs::File;
use std::io;

use memmap2::Mmap;

/// Backing storage for a buffer's initial content. The piece table keeps
/// ranges into this storage for every piece that survives from the original
/// file, so the `Content` must live exactly as long as its buffer. Dropping
/// the buffer unmaps the file.
#[derive(Debug, Default)]
pub enum Content {
    #[default]
    Empty,
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Content {
    /// Map `file` read-only. Empty files get an empty `Content` since a
    /// zero-length map is an error on some platforms.
    pub fn map_file(file: &File) -> io::Result<Content> {
        if file.metadata()?.len() == 0 {
            return Ok(Content::Empty);
        }
        // Safety: the file is opened read-only and the mapping is private to
        // this buffer. Concurrent truncation by another process is the usual
        // mmap caveat and out of scope here.
        let map = unsafe { Mmap::map(file)? };
        Ok(Content::Mapped(map))
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Content::Empty => &[],
            Content::Owned(v) => v,
            Content::Mapped(m) => m,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for Content {
    fn from(v: Vec<u8>) -> Self {
        if v.is_empty() {
            Content::Empty
        } else {
            Content::Owned(v)
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::from(s.as_bytes().to_vec())
    }
}
