//! Typed leaf schema and Solidity ABI encoding.
//!
//! A leaf is a tuple of static Solidity values whose types are fixed when the
//! tree is built (the `leafEncoding` of a persisted tree). Every supported
//! type occupies exactly one 32-byte ABI word, so `abi.encode` of a leaf is
//! the concatenation of its words.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use serde_json::Value;
use thiserror::Error;

use crate::hash::hash_leaf;

/// Errors raised while parsing or checking leaves against a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeafError {
    #[error("Unknown leaf type: {0}")]
    UnknownType(String),
    #[error("Leaf schema must contain at least one type")]
    EmptySchema,
    #[error("Leaf has {found} value(s), schema expects {expected}")]
    Arity { expected: usize, found: usize },
    #[error("Leaf value {position} is {found}, schema expects {expected}")]
    TypeMismatch {
        position: usize,
        expected: AbiType,
        found: AbiType,
    },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid uint256: {0}")]
    InvalidUint(String),
    #[error("Invalid bytes32: {0}")]
    InvalidBytes32(String),
    #[error("Expected a JSON string for {0}, got {1}")]
    UnexpectedJson(AbiType, String),
}

/// Static Solidity types accepted in a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbiType {
    Address,
    Uint256,
    Bytes32,
}

impl AbiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbiType::Address => "address",
            AbiType::Uint256 => "uint256",
            AbiType::Bytes32 => "bytes32",
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AbiType {
    type Err = LeafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address" => Ok(AbiType::Address),
            "uint256" | "uint" => Ok(AbiType::Uint256),
            "bytes32" => Ok(AbiType::Bytes32),
            other => Err(LeafError::UnknownType(other.to_string())),
        }
    }
}

/// A single typed leaf value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AbiValue {
    Address(Address),
    Uint256(U256),
    Bytes32(B256),
}

impl AbiValue {
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::Uint256(_) => AbiType::Uint256,
            AbiValue::Bytes32(_) => AbiType::Bytes32,
        }
    }

    /// The 32-byte ABI word for this value.
    pub fn word(&self) -> B256 {
        match self {
            AbiValue::Address(addr) => addr.into_word(),
            AbiValue::Uint256(n) => B256::from(n.to_be_bytes::<32>()),
            AbiValue::Bytes32(b) => *b,
        }
    }

    /// Parse a value of type `ty` from its text form.
    pub fn parse_str(ty: AbiType, s: &str) -> Result<Self, LeafError> {
        let s = s.trim();
        match ty {
            AbiType::Address => parse_address(s).map(AbiValue::Address),
            AbiType::Uint256 => {
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16),
                    Some(_) => return Err(LeafError::InvalidUint(s.to_string())),
                    None if !s.is_empty() => U256::from_str_radix(s, 10),
                    None => return Err(LeafError::InvalidUint(s.to_string())),
                };
                parsed
                    .map(AbiValue::Uint256)
                    .map_err(|_| LeafError::InvalidUint(s.to_string()))
            }
            AbiType::Bytes32 => {
                let digits = s
                    .strip_prefix("0x")
                    .ok_or_else(|| LeafError::InvalidBytes32(s.to_string()))?;
                let bytes =
                    hex::decode(digits).map_err(|_| LeafError::InvalidBytes32(s.to_string()))?;
                if bytes.len() != 32 {
                    return Err(LeafError::InvalidBytes32(s.to_string()));
                }
                Ok(AbiValue::Bytes32(B256::from_slice(&bytes)))
            }
        }
    }

    /// Parse a value of type `ty` from JSON.
    ///
    /// `uint256` also accepts plain JSON integers; everything else must be a
    /// string.
    pub fn from_json(ty: AbiType, value: &Value) -> Result<Self, LeafError> {
        match (ty, value) {
            (_, Value::String(s)) => Self::parse_str(ty, s),
            (AbiType::Uint256, Value::Number(n)) => n
                .as_u64()
                .map(|n| AbiValue::Uint256(U256::from(n)))
                .ok_or_else(|| LeafError::InvalidUint(n.to_string())),
            (ty, other) => Err(LeafError::UnexpectedJson(ty, other.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Address(addr) => f.write_str(&addr.to_checksum(None)),
            AbiValue::Uint256(n) => write!(f, "{}", n),
            AbiValue::Bytes32(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// Parse a `0x`-prefixed, 40 hex digit address. Checksum casing is not
/// enforced; addresses compare by bytes.
pub fn parse_address(s: &str) -> Result<Address, LeafError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| LeafError::InvalidAddress(s.to_string()))?;
    if digits.len() != 40 {
        return Err(LeafError::InvalidAddress(s.to_string()));
    }
    let bytes = hex::decode(digits).map_err(|_| LeafError::InvalidAddress(s.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Ordered list of leaf types, fixed for the lifetime of a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafSchema {
    types: Vec<AbiType>,
}

impl LeafSchema {
    pub fn new(types: Vec<AbiType>) -> Result<Self, LeafError> {
        if types.is_empty() {
            return Err(LeafError::EmptySchema);
        }
        Ok(Self { types })
    }

    /// The allow-list schema: a single `address`.
    pub fn address() -> Self {
        Self {
            types: vec![AbiType::Address],
        }
    }

    /// Parse a schema from type names, e.g. `["address", "uint256"]`.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, LeafError> {
        let types = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(types)
    }

    pub fn types(&self) -> &[AbiType] {
        &self.types
    }

    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.as_str().to_string()).collect()
    }

    /// Check that `leaf` has the arity and types this schema expects.
    pub fn check(&self, leaf: &Leaf) -> Result<(), LeafError> {
        if leaf.values.len() != self.types.len() {
            return Err(LeafError::Arity {
                expected: self.types.len(),
                found: leaf.values.len(),
            });
        }
        for (position, (expected, value)) in self.types.iter().zip(&leaf.values).enumerate() {
            let found = value.abi_type();
            if found != *expected {
                return Err(LeafError::TypeMismatch {
                    position,
                    expected: *expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Parse a leaf from a JSON tuple such as `["0xabc…", "100"]`.
    pub fn leaf_from_json(&self, values: &[Value]) -> Result<Leaf, LeafError> {
        if values.len() != self.types.len() {
            return Err(LeafError::Arity {
                expected: self.types.len(),
                found: values.len(),
            });
        }
        let values = self
            .types
            .iter()
            .zip(values)
            .map(|(ty, value)| AbiValue::from_json(*ty, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Leaf { values })
    }

    /// Leaf hash for `leaf`, after checking it against the schema.
    pub fn leaf_hash(&self, leaf: &Leaf) -> Result<B256, LeafError> {
        self.check(leaf)?;
        Ok(leaf.hash())
    }
}

impl Default for LeafSchema {
    fn default() -> Self {
        Self::address()
    }
}

/// An ordered tuple of typed values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Leaf {
    values: Vec<AbiValue>,
}

impl Leaf {
    pub fn new(values: Vec<AbiValue>) -> Self {
        Self { values }
    }

    /// Single-address leaf.
    pub fn address(addr: Address) -> Self {
        Self {
            values: vec![AbiValue::Address(addr)],
        }
    }

    pub fn values(&self) -> &[AbiValue] {
        &self.values
    }

    /// The address when this is a single-address leaf.
    pub fn as_address(&self) -> Option<Address> {
        match self.values.as_slice() {
            [AbiValue::Address(addr)] => Some(*addr),
            _ => None,
        }
    }

    /// `abi.encode` of the tuple.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * self.values.len());
        for value in &self.values {
            out.extend_from_slice(value.word().as_slice());
        }
        out
    }

    /// Domain-separated leaf hash.
    pub fn hash(&self) -> B256 {
        hash_leaf(&self.encode())
    }

    pub fn to_json(&self) -> Vec<Value> {
        self.values.iter().map(AbiValue::to_json).collect()
    }
}

impl From<Address> for Leaf {
    fn from(addr: Address) -> Self {
        Leaf::address(addr)
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}
