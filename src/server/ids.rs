//! Document id generation.
//!
//! The store asks an [`IdGenerator`] for a fresh id whenever a create request
//! omits one. Generated ids are always valid document names.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of ids for documents created without an explicit id.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random opaque ids: 12 random bytes, base64url encoded (16 characters).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; 12];
        rand::rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Deterministic ids of the form `{prefix}{n}`, starting at 1.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("doc-")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_unique() {
        let generator = RandomIdGenerator;

        let id1 = generator.generate();
        let id2 = generator.generate();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 16); // 12 bytes base64url = 16 chars
    }

    #[test]
    fn test_random_id_format() {
        let id = RandomIdGenerator.generate();
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_sequential_ids() {
        let generator = SequentialIdGenerator::new("n");
        assert_eq!(generator.generate(), "n1");
        assert_eq!(generator.generate(), "n2");
        assert_eq!(generator.generate(), "n3");
    }
}
