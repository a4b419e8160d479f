// Line framing for the upstream event feed.
//
// The feed is newline-delimited and frames may span network reads, so bytes
// are buffered and only complete lines are interpreted. The decoder is a
// plain state machine with no I/O, which keeps the split-tolerance easy to
// test exhaustively.

/// Literal payload that marks the normal end of an event feed.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// One decoded frame to forward to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// A content payload, forwarded verbatim.
    Data(String),
    /// The terminal sentinel; the relay emits it and stops.
    Done,
}

/// Accumulates raw bytes and yields complete frames as newlines arrive.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every frame completed by it, in order.
    ///
    /// Blank lines and `:`-prefixed keepalive comments are dropped. Lines
    /// without the data prefix are ignored rather than treated as errors,
    /// matching how browsers skip unknown SSE fields.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RelayFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                if payload == DONE_SENTINEL {
                    frames.push(RelayFrame::Done);
                } else {
                    frames.push(RelayFrame::Data(payload.to_string()));
                }
            }
        }
        frames
    }
}
