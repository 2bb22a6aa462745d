//! Wallet signature verification
//!
//! Wallets sign the login challenge with EIP-191 `personal_sign`. The server
//! recovers the signer from the 65-byte `r || s || v` signature and compares
//! it with the claimed address.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use tracing::debug;

use crate::types::{PeacemakingError, Result};

/// Checks that `signature` over `challenge` was produced by `address`
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, address: &str, challenge: &str, signature: &str) -> bool;
}

/// The exact string a wallet signs to prove control of its address
pub fn challenge_for(nonce: i64) -> String {
    format!("Sign this nonce: {}", nonce)
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Digest signed by `personal_sign`
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut prefixed =
        format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Lowercase `0x` address of a public key
pub fn address_from_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// secp256k1 recovery verifier
#[derive(Debug, Default, Clone, Copy)]
pub struct Eip191Verifier;

impl Eip191Verifier {
    /// Recover the signing address of `challenge`
    pub fn recover(&self, challenge: &str, signature: &str) -> Result<String> {
        let raw = hex::decode(signature.trim_start_matches("0x"))
            .map_err(|e| PeacemakingError::BadRequest(format!("signature is not hex: {}", e)))?;
        if raw.len() != 65 {
            return Err(PeacemakingError::BadRequest(format!(
                "signature must be 65 bytes, got {}",
                raw.len()
            )));
        }

        let recovery_id = match raw[64] {
            0 | 27 => 0u8,
            1 | 28 => 1u8,
            v => {
                return Err(PeacemakingError::BadRequest(format!(
                    "invalid recovery id: {}",
                    v
                )))
            }
        };
        let recovery_id = RecoveryId::try_from(recovery_id)
            .map_err(|_| PeacemakingError::BadRequest("invalid recovery id".into()))?;
        let sig = Signature::from_slice(&raw[..64])
            .map_err(|_| PeacemakingError::BadRequest("malformed signature".into()))?;

        let digest = eip191_hash(challenge.as_bytes());
        let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
            .map_err(|_| PeacemakingError::Unauthorized("signature recovery failed".into()))?;

        Ok(address_from_key(&key))
    }
}

impl SignatureVerifier for Eip191Verifier {
    fn verify(&self, address: &str, challenge: &str, signature: &str) -> bool {
        match self.recover(challenge, signature) {
            Ok(recovered) => recovered.eq_ignore_ascii_case(address),
            Err(e) => {
                debug!(address = %address, error = %e, "Signature rejected");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_wallet {
    use super::*;
    use k256::ecdsa::SigningKey;

    /// A throwaway wallet that signs like `personal_sign`
    pub struct TestWallet {
        key: SigningKey,
    }

    impl TestWallet {
        pub fn random() -> Self {
            Self {
                key: SigningKey::random(&mut rand::thread_rng()),
            }
        }

        pub fn address(&self) -> String {
            address_from_key(self.key.verifying_key())
        }

        pub fn sign(&self, message: &str) -> String {
            let digest = eip191_hash(message.as_bytes());
            let (sig, recid) = self.key.sign_prehash_recoverable(&digest).unwrap();
            let mut raw = sig.to_bytes().to_vec();
            raw.push(recid.to_byte() + 27);
            format!("0x{}", hex::encode(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_wallet::TestWallet;
    use super::*;

    #[test]
    fn test_challenge_text() {
        assert_eq!(challenge_for(42), "Sign this nonce: 42");
    }

    #[test]
    fn test_eip191_known_vector() {
        // personal_sign digest of "hello"
        assert_eq!(
            hex::encode(eip191_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[test]
    fn test_verify_roundtrip() {
        let wallet = TestWallet::random();
        let challenge = challenge_for(7);
        let sig = wallet.sign(&challenge);

        let verifier = Eip191Verifier;
        assert!(verifier.verify(&wallet.address(), &challenge, &sig));
        assert!(verifier.verify(&wallet.address().to_uppercase().replace("0X", "0x"), &challenge, &sig));
        assert!(!verifier.verify(&wallet.address(), &challenge_for(8), &sig));
        assert!(!verifier.verify(&TestWallet::random().address(), &challenge, &sig));
    }

    #[test]
    fn test_malformed_signatures() {
        let verifier = Eip191Verifier;
        assert!(verifier.recover("x", "0x1234").is_err());
        assert!(verifier.recover("x", "not-hex").is_err());

        let mut raw = vec![1u8; 64];
        raw.push(5);
        assert!(verifier.recover("x", &hex::encode(raw)).is_err());
    }
}
