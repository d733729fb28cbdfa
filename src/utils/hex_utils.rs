//! Serde helpers for hex encoded trace values
//!
//! Traces encode addresses as lower-case `0x` hex and quantities as minimal
//! `0x` hex (`0x0` for zero). Fixtures may carry numbers either as `0x` hex
//! or as decimal strings, and sometimes as plain JSON numbers.

use alloy::primitives::{hex, Address, U256};
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// Lower-case `0x` hex for an address
pub fn address_to_hex(address: &Address) -> String {
    hex::encode_prefixed(address.as_slice())
}

/// Minimal `0x` hex for a quantity
pub fn quantity_to_hex(value: U256) -> String {
    format!("0x{value:x}")
}

/// Minimal `0x` hex for a u64
pub fn u64_to_hex(value: u64) -> String {
    format!("0x{value:x}")
}

/// Parses `0x` hex or decimal into a u64
pub fn parse_u64(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => Ok(0),
        Some(digits) => u64::from_str_radix(digits, 16).map_err(|e| format!("{raw}: {e}")),
        None => raw.parse::<u64>().map_err(|e| format!("{raw}: {e}")),
    }
}

/// Parses `0x` hex or decimal into a U256
pub fn parse_u256(raw: &str) -> Result<U256, String> {
    let raw = raw.trim();
    if raw == "0x" || raw == "0X" {
        return Ok(U256::ZERO);
    }
    U256::from_str(raw).map_err(|e| format!("{raw}: {e}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Address as lower-case `0x` hex
pub mod address_hex {
    use super::*;

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address_to_hex(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_str(&raw).map_err(D::Error::custom)
    }
}

/// Optional U256 as minimal `0x` hex
pub mod quantity_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&quantity_to_hex(*value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_u256(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

/// Optional u64 as minimal `0x` hex
pub mod u64_hex_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&u64_to_hex(*value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_u64(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

/// u64 read from hex, decimal string or JSON number; written as decimal string
pub mod hex_or_decimal_u64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(value),
            NumberOrString::String(raw) => parse_u64(&raw).map_err(D::Error::custom),
        }
    }
}

/// U256 read from hex, decimal string or JSON number; written as decimal string
pub mod hex_or_decimal_u256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(U256::from(value)),
            NumberOrString::String(raw) => parse_u256(&raw).map_err(D::Error::custom),
        }
    }
}
