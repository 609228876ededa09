//! Per-connection state owned by the task driving that connection.
//!
//! Each context carries a fixed primary buffer and an optional extended buffer
//! that handlers can allocate when a message does not fit. Exactly one of the two
//! is active at a time; reads land in the active buffer and writes send its content.

use std::fmt;
use std::net::SocketAddr;

use crate::ensure;
use crate::server::ServerError;

/// What the driver does once the current handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferChoice {
    Default,
    Extended,
}

pub struct ConnectionContext {
    id: u64,
    peer_addr: SocketAddr,

    buffer: Box<[u8]>,
    content_size: usize,

    extended: Option<Vec<u8>>,
    extended_content_size: usize,

    active: BufferChoice,
    pending: bool,
    signal: u64,
    next_operation: Operation,
    bytes_transferred: usize,
}

impl ConnectionContext {
    pub fn new(id: u64, peer_addr: SocketAddr, buffer_size: usize) -> Self {
        Self {
            id,
            peer_addr,
            buffer: vec![0; buffer_size].into_boxed_slice(),
            content_size: 0,
            extended: None,
            extended_content_size: 0,
            active: BufferChoice::Default,
            pending: false,
            signal: 0,
            next_operation: Operation::Close,
            bytes_transferred: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn active_buffer(&self) -> BufferChoice {
        self.active
    }

    /// Capacity of the active buffer.
    pub fn capacity(&self) -> usize {
        match (self.active, &self.extended) {
            (BufferChoice::Extended, Some(extended)) => extended.len(),
            _ => self.buffer.len(),
        }
    }

    pub fn primary_capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn extended_capacity(&self) -> usize {
        self.extended.as_ref().map_or(0, Vec::len)
    }

    /// The whole active buffer, including bytes past the content.
    pub fn buffer(&self) -> &[u8] {
        match (self.active, &self.extended) {
            (BufferChoice::Extended, Some(extended)) => extended,
            _ => &self.buffer,
        }
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        match (self.active, &mut self.extended) {
            (BufferChoice::Extended, Some(extended)) => extended,
            _ => &mut self.buffer,
        }
    }

    /// The meaningful bytes of the active buffer.
    pub fn content(&self) -> &[u8] {
        let size = self.content_size();
        &self.buffer()[..size]
    }

    pub fn content_size(&self) -> usize {
        match self.active {
            BufferChoice::Default => self.content_size,
            BufferChoice::Extended => self.extended_content_size,
        }
    }

    pub fn set_content_size(&mut self, size: usize) -> Result<(), ServerError> {
        let capacity = self.capacity();
        ensure!(size <= capacity, ServerError::ContentOverflow { size, capacity });
        match self.active {
            BufferChoice::Default => self.content_size = size,
            BufferChoice::Extended => self.extended_content_size = size,
        }
        Ok(())
    }

    /// Replaces the content with `bytes`, using the primary buffer when they fit and
    /// the extended buffer otherwise.
    pub fn set_content(&mut self, bytes: &[u8]) {
        if bytes.len() <= self.buffer.len() {
            self.active = BufferChoice::Default;
            self.buffer[..bytes.len()].copy_from_slice(bytes);
            self.content_size = bytes.len();
            return;
        }

        self.extend_buffer(bytes.len());
        if let Some(extended) = self.extended.as_mut() {
            extended[..bytes.len()].copy_from_slice(bytes);
        }
        self.extended_content_size = bytes.len();
    }

    /// Zeroes the primary buffer and makes it active with no content.
    pub fn reset_buffer(&mut self) {
        self.buffer.fill(0);
        self.content_size = 0;
        self.active = BufferChoice::Default;
    }

    /// Grows the extended buffer to at least `size` bytes, keeping what it already
    /// holds, and makes it the active buffer.
    pub fn extend_buffer(&mut self, size: usize) {
        let extended = self.extended.get_or_insert_with(Vec::new);
        if extended.len() < size {
            extended.resize(size, 0);
        }
        self.active = BufferChoice::Extended;
    }

    pub fn set_active_buffer(&mut self, choice: BufferChoice) -> Result<(), ServerError> {
        ensure!(choice == BufferChoice::Default || self.extended.is_some(), ServerError::NoExtendedBuffer);
        self.active = choice;
        Ok(())
    }

    /// Makes the primary buffer active and empty and forgets the extended content.
    pub fn restore_primary(&mut self) {
        self.active = BufferChoice::Default;
        self.content_size = 0;
        self.reset_extended();
    }

    /// Forgets the extended buffer's content. The allocation is kept for reuse.
    pub fn reset_extended(&mut self) {
        self.extended_content_size = 0;
    }

    /// Keeps the current content for the next read: the content is appended to the
    /// extended buffer, which becomes active and doubles whenever it has no room left.
    pub fn retain_content(&mut self) {
        if self.active == BufferChoice::Default {
            let needed = self.extended_content_size + self.content_size;
            let capacity = self.extended_capacity().max(self.buffer.len() * 2);
            self.extend_buffer(grow_to(capacity, needed + 1));

            let start = self.extended_content_size;
            if let Some(extended) = self.extended.as_mut() {
                extended[start..needed].copy_from_slice(&self.buffer[..self.content_size]);
            }
            self.extended_content_size = needed;
            self.content_size = 0;
            return;
        }

        if self.extended_content_size >= self.extended_capacity() {
            let capacity = grow_to(self.extended_capacity().max(1), self.extended_content_size + 1);
            self.extend_buffer(capacity);
        }
    }

    /// Free space where the next read should land, `None` when the active buffer is full.
    ///
    /// The primary buffer is always read from its start; the extended buffer is
    /// appended to.
    pub(crate) fn read_slot(&mut self) -> Option<&mut [u8]> {
        match (self.active, &mut self.extended) {
            (BufferChoice::Extended, Some(extended)) => {
                let slot = &mut extended[self.extended_content_size..];
                (!slot.is_empty()).then_some(slot)
            }
            _ => Some(&mut self.buffer),
        }
    }

    pub(crate) fn commit_read(&mut self, n: usize) {
        match self.active {
            BufferChoice::Default => self.content_size = n,
            BufferChoice::Extended => self.extended_content_size += n,
        }
        self.bytes_transferred = n;
    }

    pub(crate) fn commit_write(&mut self, n: usize) {
        self.bytes_transferred = n;
    }

    /// Marks an operation as in flight, returning `false` if one already was.
    pub(crate) fn begin_io(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub(crate) fn end_io(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Byte count of the last completed read or write.
    pub fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    /// Opaque value handlers use to pass state between events of one connection.
    pub fn signal(&self) -> u64 {
        self.signal
    }

    pub fn set_signal(&mut self, signal: u64) {
        self.signal = signal;
    }

    pub fn next_operation(&self) -> Operation {
        self.next_operation
    }

    pub fn set_next_operation(&mut self, operation: Operation) {
        self.next_operation = operation;
    }
}

fn grow_to(mut capacity: usize, needed: usize) -> usize {
    while capacity < needed {
        capacity *= 2;
    }
    capacity
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("active", &self.active)
            .field("content_size", &self.content_size())
            .field("capacity", &self.capacity())
            .field("next_operation", &self.next_operation)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}
