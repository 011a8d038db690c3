// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use crate::error::SenderError;
use crate::protocol::BLOCK_LEN;

/// One block's worth of file data. `len` may be short only on the last chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub data: [u8; BLOCK_LEN],
    pub len: usize,
    pub is_last: bool,
}

impl Chunk {
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// Where packet payloads come from
pub trait ChunkSource {
    /// Size in bytes, fixed when the source is opened
    fn total_size(&self) -> u64;

    /// Next block of data; returns `None` once everything has been handed out.
    fn read_chunk(&mut self) -> std::io::Result<Option<Chunk>>;

    /// Number of packets needed for the whole source
    fn packet_count(&self) -> u64 {
        self.total_size().div_ceil(BLOCK_LEN as u64)
    }
}

/// Reads any seekable stream in `BLOCK_LEN` pieces.
pub struct BlockReader<R> {
    inner: R,
    total: u64,
    position: u64,
}

impl<R: Read + Seek> BlockReader<R> {
    /// Measures the stream once, then rewinds to the start.
    pub fn new(mut inner: R) -> std::io::Result<Self> {
        let total = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(BlockReader { inner, total, position: 0 })
    }
}

impl BlockReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SenderError> {
        let open_err = |source| SenderError::Open { path: path.to_path_buf(), source };
        let file = File::open(path).map_err(open_err)?;
        BlockReader::new(BufReader::new(file)).map_err(open_err)
    }
}

impl<R: Read + Seek> ChunkSource for BlockReader<R> {
    fn total_size(&self) -> u64 {
        self.total
    }

    fn read_chunk(&mut self) -> std::io::Result<Option<Chunk>> {
        let remaining = self.total.saturating_sub(self.position);
        if remaining == 0 {
            return Ok(None);
        }

        let want = remaining.min(BLOCK_LEN as u64) as usize;
        let mut data = [0u8; BLOCK_LEN];
        let mut len = 0;
        while len < want {
            match self.inner.read(&mut data[len..want]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if len < want {
            // File shrank under us; what we have is the end
            self.total = self.position + len as u64;
        }
        if len == 0 {
            return Ok(None);
        }

        self.position += len as u64;
        Ok(Some(Chunk {
            data,
            len,
            is_last: self.position >= self.total,
        }))
    }
}
