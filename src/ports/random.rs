use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

/// Nonces are drawn from `[0, NONCE_RANGE)`
pub const NONCE_RANGE: u32 = 1_000_000;

/// Session tokens carry 256 bits of entropy
const SESSION_TOKEN_BYTES: usize = 32;

/// Cryptographically strong byte source
pub trait RandomSource: Send + Sync {
    fn bytes(&self, n: usize) -> Vec<u8>;
}

/// Operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn bytes(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        OsRng.fill_bytes(&mut buf);
        buf
    }
}

/// A URL-safe random session token
pub fn session_token(random: &dyn RandomSource) -> String {
    URL_SAFE_NO_PAD.encode(random.bytes(SESSION_TOKEN_BYTES))
}

/// Draw a nonce that differs from `previous`
pub fn draw_nonce(random: &dyn RandomSource, previous: Option<i64>) -> i64 {
    loop {
        let raw = random.bytes(4);
        let mut word = [0u8; 4];
        word.copy_from_slice(&raw[..4]);
        let nonce = (u32::from_le_bytes(word) % NONCE_RANGE) as i64;
        if Some(nonce) != previous {
            return nonce;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    /// Yields the same byte pattern twice, then increments
    struct Repeating(AtomicU8);

    impl RandomSource for Repeating {
        fn bytes(&self, n: usize) -> Vec<u8> {
            let v = self.0.fetch_add(1, Ordering::SeqCst) / 2;
            vec![v; n]
        }
    }

    #[test]
    fn test_session_token_shape() {
        let token = session_token(&OsRandom);
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, session_token(&OsRandom));
    }

    #[test]
    fn test_nonce_in_range() {
        for _ in 0..100 {
            let n = draw_nonce(&OsRandom, None);
            assert!((0..NONCE_RANGE as i64).contains(&n));
        }
    }

    #[test]
    fn test_nonce_never_repeats_previous() {
        let random = Repeating(AtomicU8::new(0));
        let first = draw_nonce(&random, None);
        let second = draw_nonce(&random, Some(first));
        assert_ne!(first, second);
    }
}
