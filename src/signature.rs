use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use sha2::{Digest, Sha256};

use crate::error::{MagistrateError, Result};

/// Length of a compact ECDSA signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Length of a compressed public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// SHA-256 of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash = hasher.finalize();

    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Key pair derived from a passphrase: the secret key is SHA-256 of the UTF-8 passphrase.
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        let secret_key = SecretKey::from_slice(&sha256(passphrase.as_bytes()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Compressed public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Signs a 32-byte digest and returns the compact signature as hex.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<String> {
        sign_hash(&self.secret_key, hash)
    }
}

/// Signs a 32-byte digest (low-S ECDSA) and returns the 64-byte compact signature as hex.
pub fn sign_hash(secret_key: &SecretKey, hash: &[u8; 32]) -> Result<String> {
    let msg = Message::from_digest_slice(hash)
        .map_err(|e| MagistrateError::Signature(format!("Invalid message hash: {}", e)))?;
    let signature = SECP256K1.sign_ecdsa(&msg, secret_key);
    Ok(hex::encode(signature.serialize_compact()))
}

/// Verifies a compact hex signature over a 32-byte digest.
pub fn verify_hash(hash: &[u8; 32], signature_hex: &str, public_key_hex: &str) -> Result<bool> {
    let msg = Message::from_digest_slice(hash)
        .map_err(|e| MagistrateError::Signature(format!("Invalid message hash: {}", e)))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| MagistrateError::Signature(format!("Invalid signature hex: {}", e)))?;
    let signature = Signature::from_compact(&sig_bytes)
        .map_err(|e| MagistrateError::Signature(format!("Invalid compact signature: {}", e)))?;

    let pub_key_bytes = hex::decode(public_key_hex)
        .map_err(|e| MagistrateError::Signature(format!("Invalid public key hex: {}", e)))?;
    let public_key = PublicKey::from_slice(&pub_key_bytes)
        .map_err(|e| MagistrateError::Signature(format!("Invalid public key: {}", e)))?;

    Ok(SECP256K1.verify_ecdsa(&msg, &signature, &public_key).is_ok())
}
