//! Probe payload - the ASCII datagram sent to the peer
//!
//! Layout: `"<sent_timestamp> <sequence>"`, never longer than
//! [`MAX_PAYLOAD_LEN`] bytes. The encoder writes into a fixed buffer and
//! truncates instead of growing.

use std::fmt::{self, Write};

use crate::Tick;

/// Maximum serialized probe size in bytes
pub const MAX_PAYLOAD_LEN: usize = 30;

/// A serialized probe, stored inline
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProbePayload {
    buf: [u8; MAX_PAYLOAD_LEN],
    len: usize,
    truncated: bool,
}

impl ProbePayload {
    /// Encode a probe sent at `sent` carrying sequence number `seq`
    pub fn encode(sent: Tick, seq: u32) -> Self {
        let mut payload = ProbePayload {
            buf: [0u8; MAX_PAYLOAD_LEN],
            len: 0,
            truncated: false,
        };
        // BoundedWriter never returns an error
        let _ = write!(payload.writer(), "{} {}", sent.raw(), seq);
        payload
    }

    /// Encode arbitrary text under the same bound
    pub fn from_text(text: &str) -> Self {
        let mut payload = ProbePayload {
            buf: [0u8; MAX_PAYLOAD_LEN],
            len: 0,
            truncated: false,
        };
        let _ = payload.writer().write_str(text);
        payload
    }

    fn writer(&mut self) -> BoundedWriter<'_> {
        BoundedWriter { payload: self }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the encoder had to drop bytes to stay within the bound
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Debug for ProbePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProbePayload({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for ProbePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

struct BoundedWriter<'a> {
    payload: &'a mut ProbePayload,
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = MAX_PAYLOAD_LEN - self.payload.len;
        let take = s.len().min(remaining);
        let start = self.payload.len;
        self.payload.buf[start..start + take].copy_from_slice(&s.as_bytes()[..take]);
        self.payload.len += take;
        if take < s.len() {
            self.payload.truncated = true;
        }
        Ok(())
    }
}
