// src/hash.rs

//! Source integrity hashes as they appear in recipes
//!
//! Recipes pin their sources with one of two hash spellings:
//! - **Separate**: an algorithm field (`outputHashAlgo = "sha256"`) next to a
//!   bare digest in hex, base32 or base64
//! - **Combined**: a self-describing string carrying the algorithm, either
//!   SRI style (`sha256-<base64>`) or prefixed (`sha256:<digest>`)
//!
//! | Algorithm | Digest bytes | Hex length | Base32 length | Base64 length |
//! |-----------|--------------|------------|---------------|---------------|
//! | SHA-256   | 32           | 64         | 52            | 44            |
//! | SHA-512   | 64           | 128        | 103           | 88            |
//!
//! Base32 here is the package manager's variant: its own alphabet, digits
//! emitted from the most significant end, no padding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256 (256-bit cryptographic hash)
    #[default]
    Sha256,

    /// SHA-512 (512-bit cryptographic hash)
    Sha512,
}

impl HashAlgorithm {
    /// All algorithms a recipe hash can be updated for
    pub const ALL: [HashAlgorithm; 2] = [Self::Sha256, Self::Sha512];

    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the hash output length in base32 characters
    #[inline]
    pub const fn base32_len(&self) -> usize {
        (self.output_len() * 8 - 1) / 5 + 1
    }

    /// Get the hash output length in padded base64 characters
    #[inline]
    pub const fn base64_len(&self) -> usize {
        self.output_len().div_ceil(3) * 4
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
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
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown hash algorithm name
    UnknownAlgorithm(String),
    /// Digest has wrong length for algorithm
    InvalidLength { expected: usize, got: usize },
    /// Digest is not valid hex, base32 or base64
    InvalidEncoding(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid digest length: expected {} bytes, got {}", expected, got)
            }
            Self::InvalidEncoding(s) => write!(f, "digest is not hex, base32 or base64: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A hash value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The hash value as a lowercase hex string
    pub value: String,
}

impl Hash {
    /// Create a hash from a hex digest
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let bytes =
            hex::decode(&value).map_err(|_| HashError::InvalidEncoding(value.clone()))?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// Create a hash from raw digest bytes
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != algorithm.output_len() {
            return Err(HashError::InvalidLength {
                expected: algorithm.output_len(),
                got: bytes.len(),
            });
        }
        Ok(Self {
            algorithm,
            value: hex::encode(bytes),
        })
    }

    /// Create a hash from a digest in hex, base32 or base64
    ///
    /// The encoding is told apart by length, which differs for all three.
    pub fn from_digest(algorithm: HashAlgorithm, digest: &str) -> Result<Self, HashError> {
        match DigestEncoding::detect(algorithm, digest) {
            Some(DigestEncoding::Hex) => Self::new(algorithm, digest.to_lowercase()),
            Some(DigestEncoding::Base32) => {
                let bytes = decode_base32(digest, algorithm.output_len())?;
                Self::from_bytes(algorithm, &bytes)
            }
            Some(DigestEncoding::Base64) | None => {
                let bytes = BASE64
                    .decode(digest)
                    .map_err(|_| HashError::InvalidEncoding(digest.to_string()))?;
                Self::from_bytes(algorithm, &bytes)
            }
        }
    }

    /// Parse a digest with or without an algorithm prefix
    pub fn parse_any(algorithm: HashAlgorithm, s: &str) -> Result<Self, HashError> {
        match split_algorithm_prefix(s) {
            Some(_) => Self::parse_combined(s),
            None => Self::from_digest(algorithm, s),
        }
    }

    /// The all-zero digest used while the real hash is being determined
    pub fn placeholder(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            value: "0".repeat(algorithm.hex_len()),
        }
    }

    /// Get the hash value as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Parse a combined hash string (`sha256-<base64>` or `sha256:<digest>`)
    pub fn parse_combined(s: &str) -> Result<Self, HashError> {
        match split_algorithm_prefix(s) {
            Some((algorithm, digest)) => Self::from_digest(algorithm.parse()?, digest),
            None => Err(HashError::InvalidEncoding(s.to_string())),
        }
    }

    /// Format as an SRI string (`sha256-<base64>`)
    pub fn to_sri(&self) -> String {
        format!("{}-{}", self.algorithm.name(), self.encode(DigestEncoding::Base64))
    }

    /// Spell the bare digest in the given encoding
    pub fn encode(&self, encoding: DigestEncoding) -> String {
        match encoding {
            DigestEncoding::Hex => self.value.clone(),
            DigestEncoding::Base32 => encode_base32(&self.bytes()),
            DigestEncoding::Base64 => BASE64.encode(self.bytes()),
        }
    }

    fn bytes(&self) -> Vec<u8> {
        // value is always valid hex of the right length by construction
        hex::decode(&self.value).unwrap_or_default()
    }

    /// Format as a prefixed string (`sha256:<hex>`)
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Split `sha256-...` / `sha512:...` into algorithm name and digest
///
/// Only algorithm names recipes are updated for are recognized, so a bare
/// base64 digest that happens to contain `-` is not mistaken for one.
pub fn split_algorithm_prefix(s: &str) -> Option<(&str, &str)> {
    HashAlgorithm::ALL.iter().find_map(|algorithm| {
        let rest = s.strip_prefix(algorithm.name())?;
        let digest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('-'))?;
        Some((algorithm.name(), digest))
    })
}

/// Spelling of a bare digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestEncoding {
    Hex,
    Base32,
    Base64,
}

impl DigestEncoding {
    /// Recognize the encoding of a bare digest for `algorithm`
    pub fn detect(algorithm: HashAlgorithm, digest: &str) -> Option<Self> {
        let len = digest.len();
        if len == algorithm.hex_len() && digest.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self::Hex)
        } else if len == algorithm.base32_len() && digest.bytes().all(|b| BASE32_ALPHABET.contains(&b)) {
            Some(Self::Base32)
        } else if len == algorithm.base64_len() {
            Some(Self::Base64)
        } else {
            None
        }
    }
}

/// Base32 digits, without `e`, `o`, `t` and `u`
const BASE32_ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

fn encode_base32(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let len = (bytes.len() * 8 - 1) / 5 + 1;
    (0..len)
        .rev()
        .map(|n| {
            let (i, j) = (n * 5 / 8, n * 5 % 8);
            let low = u32::from(bytes[i]) >> j;
            let high = bytes.get(i + 1).map_or(0, |&next| u32::from(next) << (8 - j));
            BASE32_ALPHABET[((low | high) & 0x1f) as usize] as char
        })
        .collect()
}

fn decode_base32(digest: &str, len: usize) -> Result<Vec<u8>, HashError> {
    let invalid = || HashError::InvalidEncoding(digest.to_string());
    let mut bytes = vec![0u8; len];

    for (n, c) in digest.bytes().rev().enumerate() {
        let digit = BASE32_ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(invalid)? as u32;
        let (i, j) = (n * 5 / 8, n * 5 % 8);

        let byte = bytes.get_mut(i).ok_or_else(invalid)?;
        *byte |= (digit << j) as u8;
        let carry = digit >> (8 - j);
        match bytes.get_mut(i + 1) {
            Some(next) => *next |= carry as u8,
            None if carry != 0 => return Err(invalid()),
            None => {}
        }
    }

    Ok(bytes)
}

/// Whether two spellings of a hash name the same digest
///
/// Spellings that cannot be decoded are compared as written.
pub fn same_digest(algorithm: HashAlgorithm, a: &str, b: &str) -> bool {
    match (Hash::parse_any(algorithm, a), Hash::parse_any(algorithm, b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// How a recipe spells its source hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashEncoding {
    /// Algorithm recorded separately, digest stands alone
    Separate,
    /// Algorithm embedded in the hash string
    Combined,
}

/// The hash currently pinned by a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSpec {
    /// Algorithm name as found (may be unsupported)
    pub algorithm: String,
    /// Encoding of the pinned string
    pub encoding: HashEncoding,
    /// The pinned string exactly as it appears in the recipe
    pub value: String,
}

impl HashSpec {
    /// Work out the encoding of a pinned hash
    ///
    /// `reported_algorithm` is the separately evaluated algorithm field.
    /// Returns `None` when the hash carries no prefix and the algorithm was
    /// reported as `null`, since the format cannot be determined.
    pub fn detect(value: &str, reported_algorithm: &str) -> Option<Self> {
        if let Some((algorithm, _)) = split_algorithm_prefix(value) {
            return Some(Self {
                algorithm: algorithm.to_string(),
                encoding: HashEncoding::Combined,
                value: value.to_string(),
            });
        }
        if reported_algorithm == "null" {
            return None;
        }
        Some(Self {
            algorithm: reported_algorithm.to_string(),
            encoding: HashEncoding::Separate,
            value: value.to_string(),
        })
    }

    /// Whether the algorithm is embedded in the hash string
    pub fn is_combined(&self) -> bool {
        self.encoding == HashEncoding::Combined
    }

    /// Resolve the algorithm name to a supported algorithm
    pub fn algorithm(&self) -> Result<HashAlgorithm, HashError> {
        self.algorithm.parse()
    }
}

/// Hasher that can compute hashes using any supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    /// Create a new hasher with the specified algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
        };
        Self { algorithm, state }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Sha512(hasher) => hasher.update(data),
        }
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Hash {
        let value = match self.state {
            HasherState::Sha256(hasher) => hex::encode(hasher.finalize()),
            HasherState::Sha512(hasher) => hex::encode(hasher.finalize()),
        };
        Hash {
            algorithm: self.algorithm,
            value,
        }
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Compute hash of data from a reader
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}
