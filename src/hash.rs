// src/hash.rs

//! Integrity checksums for source archives
//!
//! Recipes pin archive versions with a prefixed digest such as
//! `sha256:fb67ab9a...`. Supported algorithms:
//! - **SHA-256**: the default for new recipes
//! - **SHA-512**: accepted for upstreams that only publish SHA-512
//! - **MD5**: legacy recipes only; not collision resistant

use md5::Md5;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Checksum algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Md5,
}

impl HashAlgorithm {
    /// Get the digest length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
            Self::Md5 => 16,
        }
    }

    /// Get the digest length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the algorithm name as used in prefixed checksums
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Checksum parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown hash algorithm name
    UnknownAlgorithm(String),
    /// Digest has wrong length for algorithm
    InvalidLength { expected: usize, got: usize },
    /// Digest contains invalid hex characters
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid digest length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in digest: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A digest together with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest
    pub value: String,
}

impl Checksum {
    /// Create a checksum, validating digest length and hex characters
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let expected_len = algorithm.hex_len();

        if value.len() != expected_len {
            return Err(HashError::InvalidLength {
                expected: expected_len,
                got: value.len(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }

        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    /// Parse a prefixed checksum ("sha256:abc123..."); unprefixed means SHA-256
    pub fn parse_prefixed(s: &str) -> Result<Self, HashError> {
        match s.trim().split_once(':') {
            Some((algo, digest)) => Self::new(algo.parse()?, digest),
            None => Self::new(HashAlgorithm::Sha256, s.trim()),
        }
    }

    /// Format as a prefixed string (e.g., "sha256:abc123...")
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }

    /// Check whether `data` hashes to this checksum
    pub fn matches(&self, data: &[u8]) -> bool {
        hash_bytes(self.algorithm, data) == self.value
    }

    /// Hash a file and compare it against this checksum
    ///
    /// Returns the actual digest on mismatch so callers can report it.
    pub fn verify_file(&self, path: &Path) -> io::Result<Result<(), String>> {
        let actual = hash_reader(self.algorithm, File::open(path)?)?;
        if actual == self.value {
            Ok(Ok(()))
        } else {
            Ok(Err(actual))
        }
    }
}

impl Checksum {
    /// Hash `path` and fail with `ChecksumMismatch` unless it matches
    pub fn verify_path(&self, path: &Path) -> crate::Result<()> {
        match self.verify_file(path)? {
            Ok(()) => Ok(()),
            Err(actual) => Err(crate::Error::ChecksumMismatch {
                path: path.display().to_string(),
                expected: self.to_prefixed_string(),
                actual: format!("{}:{}", self.algorithm.name(), actual),
            }),
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefixed_string())
    }
}

impl FromStr for Checksum {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Checksum::parse_prefixed(s)
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_string())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Checksum::parse_prefixed(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the hex digest of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
    }
}

/// Compute the hex digest of everything a reader yields
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, mut reader: R) -> io::Result<String> {
    fn drain<D: Digest, R: Read>(mut hasher: D, reader: &mut R) -> io::Result<String> {
        let mut buffer = [0u8; 8192];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    match algorithm {
        HashAlgorithm::Sha256 => drain(Sha256::new(), &mut reader),
        HashAlgorithm::Sha512 => drain(Sha512::new(), &mut reader),
        HashAlgorithm::Md5 => drain(Md5::new(), &mut reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_hash_bytes_known_values() {
        assert_eq!(hash_bytes(HashAlgorithm::Sha256, b"hello"), HELLO_SHA256);
        assert_eq!(hash_bytes(HashAlgorithm::Md5, b"hello"), HELLO_MD5);
        assert_eq!(hash_bytes(HashAlgorithm::Sha512, b"hello").len(), 128);
    }

    #[test]
    fn test_checksum_parse_prefixed() {
        let c = Checksum::parse_prefixed(&format!("sha256:{}", HELLO_SHA256)).unwrap();
        assert_eq!(c.algorithm, HashAlgorithm::Sha256);
        assert_eq!(c.to_prefixed_string(), format!("sha256:{}", HELLO_SHA256));

        // Unprefixed digests default to SHA-256
        let c = Checksum::parse_prefixed(HELLO_SHA256).unwrap();
        assert_eq!(c.algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_checksum_rejects_bad_digest() {
        assert_eq!(
            Checksum::new(HashAlgorithm::Md5, "abc"),
            Err(HashError::InvalidLength { expected: 32, got: 3 })
        );
        let not_hex = "z".repeat(64);
        assert!(matches!(
            Checksum::new(HashAlgorithm::Sha256, not_hex),
            Err(HashError::InvalidHex(_))
        ));
        assert!(Checksum::parse_prefixed("blake2:00").is_err());
    }

    #[test]
    fn test_checksum_normalizes_case() {
        let c = Checksum::new(HashAlgorithm::Md5, HELLO_MD5.to_uppercase()).unwrap();
        assert_eq!(c.value, HELLO_MD5);
        assert!(c.matches(b"hello"));
        assert!(!c.matches(b"hello\n"));
    }

    #[test]
    fn test_verify_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        let good = Checksum::new(HashAlgorithm::Sha256, HELLO_SHA256).unwrap();
        assert_eq!(good.verify_file(file.path()).unwrap(), Ok(()));

        let bad = Checksum::new(HashAlgorithm::Sha256, "0".repeat(64)).unwrap();
        assert_eq!(
            bad.verify_file(file.path()).unwrap(),
            Err(HELLO_SHA256.to_string())
        );
    }

    #[test]
    fn test_verify_path_mismatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        let good = Checksum::parse_prefixed(&format!("sha256:{}", HELLO_SHA256)).unwrap();
        assert!(good.verify_path(file.path()).is_ok());

        let bad = Checksum::new(HashAlgorithm::Md5, "0".repeat(32)).unwrap();
        match bad.verify_path(file.path()) {
            Err(crate::Error::ChecksumMismatch { actual, .. }) => {
                assert_eq!(actual, format!("md5:{}", HELLO_MD5));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
