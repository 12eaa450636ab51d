//! Prepared write reassembly
//!
//! A long write arrives as a series of prepare fragments followed by one
//! execute request. Fragments are held here until the execute request
//! either commits them (delivered in one piece) or cancels them.

use alloc::vec::Vec;

use embedded_io_async::Write;

/// Errors raised while reassembling a prepared write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Allocation for a fragment or the joined buffer failed
    OutOfMemory,
    /// The serial writer rejected the joined buffer
    WriteFailed,
}

/// Reassembly state
#[derive(Debug, Default)]
enum State {
    /// No prepared write in flight
    #[default]
    Idle,
    /// Fragments received so far, in arrival order
    Collecting { chunks: Vec<Vec<u8>>, total_len: usize },
}

/// Accumulator for one in-flight prepared write
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    state: State,
}

impl ReassemblyBuffer {
    /// Create an idle buffer
    pub const fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Store a copy of one prepare fragment
    ///
    /// If memory runs out the whole in-flight write is discarded, since
    /// committing the remaining fragments would deliver a gap.
    pub fn append(&mut self, data: &[u8]) -> Result<(), ReassemblyError> {
        let result = self.try_append(data);
        self.discard_on_failure(result, data.len())
    }

    fn discard_on_failure(
        &mut self,
        result: Result<(), ReassemblyError>,
        len: usize,
    ) -> Result<(), ReassemblyError> {
        if result.is_err() {
            log::error!("Reassembly: out of memory storing {} bytes, write discarded", len);
            self.cancel();
        }
        result
    }

    fn try_append(&mut self, data: &[u8]) -> Result<(), ReassemblyError> {
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(data.len())
            .map_err(|_| ReassemblyError::OutOfMemory)?;
        chunk.extend_from_slice(data);

        if let State::Idle = self.state {
            self.state = State::Collecting {
                chunks: Vec::new(),
                total_len: 0,
            };
        }

        if let State::Collecting { chunks, total_len } = &mut self.state {
            chunks.try_reserve(1).map_err(|_| ReassemblyError::OutOfMemory)?;
            chunks.push(chunk);
            *total_len += data.len();
        }

        Ok(())
    }

    /// Join all fragments in arrival order and write them out
    ///
    /// The writer sees either the whole joined buffer or nothing. Returns
    /// the number of bytes delivered; zero when no write was in flight.
    /// The buffer is idle afterwards in every case.
    pub async fn commit<W: Write>(&mut self, writer: &mut W) -> Result<usize, ReassemblyError> {
        let (chunks, total_len) = match core::mem::take(&mut self.state) {
            State::Idle => return Ok(0),
            State::Collecting { chunks, total_len } => (chunks, total_len),
        };

        if total_len == 0 {
            return Ok(0);
        }

        let mut joined = Vec::new();
        if joined.try_reserve_exact(total_len).is_err() {
            log::error!("Reassembly: out of memory joining {} bytes, write discarded", total_len);
            return Err(ReassemblyError::OutOfMemory);
        }
        for chunk in &chunks {
            joined.extend_from_slice(chunk);
        }

        writer
            .write_all(&joined)
            .await
            .map_err(|_| ReassemblyError::WriteFailed)?;

        Ok(total_len)
    }

    /// Drop all fragments without delivering them
    pub fn cancel(&mut self) {
        self.state = State::Idle;
    }

    /// True when no prepared write is in flight
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Total bytes held
    pub fn len(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Collecting { total_len, .. } => *total_len,
        }
    }

    /// Returns true if no bytes are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fragments held
    pub fn chunk_count(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Collecting { chunks, .. } => chunks.len(),
        }
    }
}
