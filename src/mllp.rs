//! MLLP (Minimal Lower Layer Protocol) framing.
//!
//! The wire protocol wraps each message between a Start-Block byte `0x0B`
//! and the End-Block pair `0x1C 0x0D`.  The framer owns no I/O: a
//! transport feeds it whatever bytes arrived and collects zero or more
//! complete frames per call, which makes it equally at home on a blocking
//! socket loop, a single-threaded reactor or an async runtime.
//!
//! Framing is a three-state machine and is idempotent under arbitrary
//! chunking: feeding a stream byte-by-byte or as one blob yields the same
//! frames.

use log::{trace, warn};
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, PathLocator};
use crate::parser::CancelToken;
use crate::pool::{self, ObjectPool, Pooled};

/// Start-of-block.
pub const START_BLOCK: u8 = 0x0B;
/// End-of-block; must be followed by [`CARRIAGE_RETURN`].
pub const END_BLOCK: u8 = 0x1C;
/// Frame trailer byte.
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// One complete MLLP frame: the bytes between the framing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Vec<u8>,
}

impl Frame {
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InBody,
    SawFs,
}

/// Incremental MLLP de-framer.
pub struct Framer {
    state: State,
    pool: Arc<ObjectPool<Vec<u8>>>,
    buffer: Pooled<Vec<u8>>,
    max_buffer_size: usize,
    diags: Diagnostics,
    junk_run: usize,
    cancel: Option<CancelToken>,
}

impl Framer {
    pub fn new() -> Framer {
        Framer::with_pool(pool::global_buffer_pool())
    }

    pub fn with_pool(pool: Arc<ObjectPool<Vec<u8>>>) -> Framer {
        let buffer = pool.acquire();
        Framer {
            state: State::Idle,
            pool,
            buffer,
            max_buffer_size: 1024 * 1024,
            diags: Diagnostics::new(),
            junk_run: 0,
            cancel: None,
        }
    }

    /// Bound the receive buffer; a frame body larger than this is
    /// abandoned with a truncation diagnostic.
    pub fn with_max_buffer_size(mut self, max: usize) -> Framer {
        self.max_buffer_size = max;
        self
    }

    /// Check this token between feeds; when it fires the partial frame is
    /// discarded.
    pub fn with_cancellation(mut self, token: CancelToken) -> Framer {
        self.cancel = Some(token);
        self
    }

    /// Whether a frame body is currently being assembled.
    pub fn is_mid_frame(&self) -> bool {
        self.state != State::Idle
    }

    /// How many more body bytes fit before the frame is abandoned.  A
    /// transport can use this to pause reads.
    pub fn remaining_capacity(&self) -> usize {
        self.max_buffer_size.saturating_sub(self.buffer.len())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Hand over the accumulated diagnostics, clearing the internal list.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diags)
    }

    /// Discard any partial frame and return to idle.
    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
    }

    /// Consume bytes, yielding every frame completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                self.cancel();
                return Vec::new();
            }
        }

        let mut frames = Vec::new();

        for &byte in bytes {
            match self.state {
                State::Idle => {
                    if byte == START_BLOCK {
                        self.flush_junk();
                        self.state = State::InBody;
                        trace!("frame start");
                    } else {
                        self.junk_run += 1;
                    }
                }
                State::InBody => {
                    if byte == END_BLOCK {
                        self.state = State::SawFs;
                    } else {
                        self.push_body(byte);
                    }
                }
                State::SawFs => {
                    if byte == CARRIAGE_RETURN {
                        let payload = std::mem::replace(&mut *self.buffer, Vec::new());
                        trace!("frame complete, {} bytes", payload.len());
                        frames.push(Frame { payload });
                        self.state = State::Idle;
                    } else {
                        // a lone 0x1C inside the body
                        self.push_body(END_BLOCK);
                        self.push_body(byte);
                        self.state = State::InBody;
                    }
                }
            }
        }

        self.flush_junk();
        frames
    }

    /// Wrap a payload in the MLLP envelope for transmission.
    pub fn wrap(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 3);
        out.push(START_BLOCK);
        out.extend_from_slice(payload);
        out.push(END_BLOCK);
        out.push(CARRIAGE_RETURN);
        out
    }

    fn push_body(&mut self, byte: u8) {
        if self.buffer.len() >= self.max_buffer_size {
            warn!("frame exceeded {} bytes, abandoning", self.max_buffer_size);
            self.diags.push(Diagnostic::warning(
                DiagnosticCode::MessageTruncated,
                PathLocator::new(),
                format!("frame exceeded the {} byte buffer bound", self.max_buffer_size),
            ));
            self.buffer.clear();
            self.state = State::Idle;
            return;
        }
        self.buffer.push(byte);
    }

    fn flush_junk(&mut self) {
        if self.junk_run > 0 {
            self.diags.push(Diagnostic::warning(
                DiagnosticCode::ProtocolJunk,
                PathLocator::new(),
                format!("{} byte(s) outside any frame", self.junk_run),
            ));
            self.junk_run = 0;
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Framer::new()
    }
}
