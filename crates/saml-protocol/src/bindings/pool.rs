//! Bounded pool of raw DEFLATE encoders.

use flate2::write::DeflateEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::io::Write;

use crate::error::{SamlError, SamlResult};

/// Reusable raw DEFLATE encoders, shared between codec instances and threads.
///
/// At most `capacity` idle encoders are kept. Checkout never blocks: when
/// the pool is empty a fresh encoder is created.
#[derive(Debug)]
pub struct CompressorPool {
    idle: Mutex<Vec<DeflateEncoder<Vec<u8>>>>,
    capacity: usize,
    level: Compression,
}

impl CompressorPool {
    /// Creates an empty pool.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if `level` is above 9.
    pub fn new(capacity: usize, level: u32) -> SamlResult<Self> {
        if level > 9 {
            return Err(SamlError::Config(format!(
                "compression level must be 0-9, got {level}"
            )));
        }
        Ok(Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            level: Compression::new(level),
        })
    }

    /// Returns the maximum number of idle encoders kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of idle encoders currently pooled.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Compresses `data` with a pooled encoder.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SerializationFailed`] if the encoder fails. The
    /// failed encoder is dropped rather than returned to the pool.
    pub fn compress(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let mut encoder = self.checkout();
        let compressed = encoder
            .write_all(data)
            .and_then(|()| encoder.reset(Vec::new()))
            .map_err(|e| SamlError::SerializationFailed(format!("deflate failed: {e}")))?;
        self.checkin(encoder);
        Ok(compressed)
    }

    fn checkout(&self) -> DeflateEncoder<Vec<u8>> {
        self.idle
            .lock()
            .pop()
            .unwrap_or_else(|| DeflateEncoder::new(Vec::new(), self.level))
    }

    /// The encoder must already be reset.
    fn checkin(&self, encoder: DeflateEncoder<Vec<u8>>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(encoder);
        }
    }
}

impl Default for CompressorPool {
    fn default() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            capacity: 16,
            level: Compression::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;
    use std::sync::Arc;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn reused_encoder_starts_clean() {
        let pool = CompressorPool::new(2, 6).unwrap();
        let first = pool.compress(b"<a>first</a>").unwrap();
        assert_eq!(pool.idle(), 1);
        let second = pool.compress(b"<b>second</b>").unwrap();
        assert_eq!(pool.idle(), 1);

        assert_eq!(inflate(&first), b"<a>first</a>");
        assert_eq!(inflate(&second), b"<b>second</b>");
    }

    #[test]
    fn rejects_bad_level() {
        assert!(matches!(CompressorPool::new(4, 10), Err(SamlError::Config(_))));
    }

    #[test]
    fn never_exceeds_capacity_across_threads() {
        let pool = Arc::new(CompressorPool::new(3, 6).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let payload = format!("<m n=\"{i}-{j}\"/>");
                        let out = pool.compress(payload.as_bytes()).unwrap();
                        assert_eq!(inflate(&out), payload.as_bytes());
                        assert!(pool.idle() <= pool.capacity());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle() <= 3);
    }
}
