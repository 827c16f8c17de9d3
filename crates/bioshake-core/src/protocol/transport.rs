//! Transport abstraction
//!
//! The driver talks to the device through a [`Transport`]: a byte link that
//! can write a frame, read one line with a bounded wait, and be closed.
//! [`SerialTransport`](super::SerialTransport) is the production
//! implementation; tests substitute scripted transports.

use std::time::{Duration, Instant};

use super::ProtocolError;

/// A line-oriented byte link to a device
pub trait Transport {
    /// Write a complete frame, respecting the link's minimum write spacing.
    /// Returns the number of bytes written.
    fn write(&mut self, frame: &[u8]) -> Result<usize, ProtocolError>;

    /// Read one line, excluding the `\n` terminator.
    ///
    /// Fails with [`ProtocolError::Timeout`] when no terminator arrives
    /// within `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, ProtocolError>;

    /// Drop any bytes received but not yet read.
    ///
    /// Called before every request so a reply that arrived after an earlier
    /// timeout is never taken as the answer to a later command.
    fn discard_input(&mut self) -> Result<(), ProtocolError>;

    /// Release the link. Must be safe to call more than once.
    fn close(&mut self);

    /// Whether the link is still open
    fn is_open(&self) -> bool;
}

/// Enforces a minimum delay between consecutive writes.
///
/// BioShake firmware drops or misparses frames that arrive too close
/// together, so every write is preceded by [`WriteThrottle::wait`] and
/// followed by [`WriteThrottle::mark`].
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    min_spacing: Duration,
    last_write: Option<Instant>,
}

impl WriteThrottle {
    /// Create a throttle with the given minimum spacing
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_write: None,
        }
    }

    /// Configured minimum spacing
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Time still to wait before the next write is allowed
    pub fn remaining(&self) -> Duration {
        match self.last_write {
            Some(last) => self.min_spacing.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the next write is allowed
    pub fn wait(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Record that a write just completed
    pub fn mark(&mut self) {
        self.last_write = Some(Instant::now());
    }
}
