//! Addresses and signing identities.
//!
//! Every account (market, job, vault, token account, stake) and every signer
//! is named by a 32-byte [`Address`]. Signer addresses are Ed25519 public keys.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Domain prefix for derived addresses.
const PDA_DOMAIN: &[u8] = b"nosana:program-derived-address";

/// A 32-byte account key, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address, used as the "unset" sentinel.
    pub const SYSTEM: Self = Self([0u8; 32]);

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a random address for a fresh account.
    #[must_use]
    pub fn unique() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true for the all-zero sentinel.
    #[must_use]
    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(format!("invalid base58: {e}")))?;
        let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidAddress(format!("address must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(array))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Derives a deterministic address from a list of seeds.
///
/// Seeds are length-prefixed before hashing so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
#[must_use]
pub fn find_program_address(seeds: &[&[u8]]) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PDA_DOMAIN);
    for seed in seeds {
        hasher.update(&(seed.len() as u64).to_le_bytes());
        hasher.update(seed);
    }
    Address(*hasher.finalize().as_bytes())
}

/// An Ed25519 signing identity.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new keypair from the operating system's CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restores a keypair from its 32 secret bytes.
    #[must_use]
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Returns the secret key bytes.
    ///
    /// # Security
    ///
    /// This exposes the private key material. Handle with care.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Returns the signer address (the public key).
    #[must_use]
    pub fn address(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Creates a signature from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verifies this signature over `message` for the signer `address`.
    ///
    /// Uses strict verification to reject malleable signatures.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Crypto` if the address is not a valid public key
    /// and `CoreError::InvalidSignature` if verification fails.
    pub fn verify(&self, address: &Address, message: &[u8]) -> Result<(), CoreError> {
        let key = VerifyingKey::from_bytes(address.as_bytes())
            .map_err(|e| CoreError::Crypto(e.to_string()))?;
        key.verify_strict(message, &DalekSignature::from_bytes(&self.0))
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::Crypto(format!("invalid base58: {e}")))?;
        let array: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::Crypto(format!("signature must be 64 bytes, got {}", v.len()))
        })?;
        Ok(Self(array))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_parses_back() {
        let address = Address::unique();
        let parsed: Address = address.to_string().parse().expect("parse");
        assert_eq!(address, parsed);
    }

    #[test]
    fn address_rejects_wrong_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(matches!(
            short.parse::<Address>(),
            Err(CoreError::InvalidAddress(_))
        ));
        assert!("0OIl".parse::<Address>().is_err());
    }

    #[test]
    fn address_serializes_as_base58_string() {
        let address = Address::new([7u8; 32]);
        let json = serde_json::to_string(&address).expect("serialize");
        assert_eq!(json, format!("\"{address}\""));
        let back: Address = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, address);
    }

    #[test]
    fn system_address_is_zero() {
        assert!(Address::SYSTEM.is_system());
        assert!(!Address::unique().is_system());
        assert_eq!(Address::default(), Address::SYSTEM);
    }

    #[test]
    fn program_address_is_deterministic() {
        let owner = Address::unique();
        let a = find_program_address(&[b"stake", owner.as_bytes()]);
        let b = find_program_address(&[b"stake", owner.as_bytes()]);
        assert_eq!(a, b);
        assert_ne!(a, find_program_address(&[b"vault", owner.as_bytes()]));
    }

    #[test]
    fn program_address_seeds_are_length_prefixed() {
        let a = find_program_address(&[b"ab", b"c"]);
        let b = find_program_address(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn keypair_signature_verifies() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"list job");
        assert!(signature.verify(&keypair.address(), b"list job").is_ok());
    }

    #[test]
    fn signature_rejects_tampered_message() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"original");
        assert_eq!(
            signature.verify(&keypair.address(), b"tampered"),
            Err(CoreError::InvalidSignature)
        );
    }

    #[test]
    fn signature_rejects_wrong_signer() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let signature = signer.sign(b"work");
        assert!(signature.verify(&other.address(), b"work").is_err());
    }

    #[test]
    fn keypair_restores_from_secret() {
        let keypair = Keypair::generate();
        let restored = Keypair::from_secret_bytes(&keypair.secret_bytes());
        assert_eq!(keypair.address(), restored.address());
    }

    #[test]
    fn signature_serde_roundtrip() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"finish");
        let json = serde_json::to_string(&signature).expect("serialize");
        let back: Signature = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(signature, back);
    }
}
