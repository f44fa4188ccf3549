//! Random payload generation

use rand::rngs::StdRng;
use rand::RngCore;

/// Produces fixed-size buffers of pseudo-random bytes
///
/// The buffer is reused between attempts; only its contents are redrawn,
/// and only when a target asks for them.
#[derive(Debug, Clone)]
pub struct PayloadGenerator {
    buf: Vec<u8>,
    rng: StdRng,
}

impl PayloadGenerator {
    /// Create a generator for payloads of `size` bytes drawn from `rng`
    pub fn new(size: usize, rng: StdRng) -> Self {
        Self {
            buf: vec![0; size],
            rng,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Redraw the buffer and return it
    pub fn fill(&mut self) -> &[u8] {
        self.rng.fill_bytes(&mut self.buf);
        &self.buf
    }
}
