//! Newline line codec.
//!
//! Bytes are accumulated until a `\n` arrives, so a line split across
//! several UART reads is still delivered whole.  The terminator is stripped;
//! everything else (including any `\r`) is passed through untouched.
//!
//! A line that fills the buffer before its terminator is flushed as-is and
//! the remainder starts a new line.  A terminator arriving right after such a
//! flush closes the flushed line and yields nothing.

/// Longest line delivered in one piece.
pub const MAX_LINE_LEN: usize = 256;

const TERMINATOR: u8 = b'\n';

/// Streaming line decoder.
pub struct LineDecoder {
    buf: [u8; MAX_LINE_LEN],
    len: usize,
    /// The previous call returned a line; clear before accepting more.
    delivered: bool,
    /// The previous call flushed a full buffer without seeing `\n`.
    flushed_full: bool,
}

impl LineDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_LINE_LEN],
            len: 0,
            delivered: false,
            flushed_full: false,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Some(line)` when a line is complete.  The slice is valid
    /// until the next call.
    pub fn feed_byte(&mut self, byte: u8) -> Option<&[u8]> {
        if self.delivered {
            self.len = 0;
            self.delivered = false;
        }

        let after_full_flush = core::mem::replace(&mut self.flushed_full, false);

        if byte == TERMINATOR {
            if after_full_flush {
                return None;
            }
            self.delivered = true;
            return Some(&self.buf[..self.len]);
        }

        self.buf[self.len] = byte;
        self.len += 1;

        if self.len == MAX_LINE_LEN {
            // Overlong line; hand over what we have.
            self.delivered = true;
            self.flushed_full = true;
            return Some(&self.buf[..self.len]);
        }

        None
    }

    /// Bytes of the line currently being assembled.
    pub fn pending(&self) -> usize {
        if self.delivered { 0 } else { self.len }
    }

    /// Drop any partial line (e.g. after the link is reopened).
    pub fn reset(&mut self) {
        self.len = 0;
        self.delivered = false;
        self.flushed_full = false;
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
