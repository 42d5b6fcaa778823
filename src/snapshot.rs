//! Wire format for a complete pool: the serde-serializable value produced by
//! `PoolEngine::to_snapshot` and consumed by `PoolEngine::from_snapshot`.
//! Every wide integer goes through a decimal-string shim so nothing is lost
//! crossing a `serde_json` boundary.

use std::collections::BTreeMap;

use ethnum::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::oracle::Observation;
use crate::position::{Position, PositionKey};
use crate::tick::Tick;

pub mod u256_decimal {
    use ethnum::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(D::Error::custom)
    }
}

pub mod i256_decimal {
    use ethnum::I256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &I256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        let s = String::deserialize(deserializer)?;
        I256::from_str_radix(&s, 10).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutablesSnapshot {
    pub pool_address: String,
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
    pub token_0: TokenInfo,
    pub token_1: TokenInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub liquidity: u128,
    #[serde(with = "u256_decimal")]
    pub fee_growth_global_0: U256,
    #[serde(with = "u256_decimal")]
    pub fee_growth_global_1: U256,
    #[serde(with = "i256_decimal")]
    pub balance_0: I256,
    #[serde(with = "i256_decimal")]
    pub balance_1: I256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot0Snapshot {
    #[serde(with = "u256_decimal")]
    pub sqrt_price: U256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
    pub fee_protocol: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub block_timestamp: u32,
    pub block_number: u64,
    pub protocol_fee_0: u128,
    pub protocol_fee_1: u128,
    pub immutables: ImmutablesSnapshot,
    pub state: StateSnapshot,
    pub slot0: Slot0Snapshot,
    pub ticks: BTreeMap<String, Tick>,
    pub positions: BTreeMap<String, Position>,
    pub observations: Vec<Observation>,
}

/// `"owner_tickLower_tickUpper"`. The owner itself may contain underscores,
/// so the two tick fields are peeled off the right rather than the whole
/// string split uniformly.
pub fn format_position_key(key: &PositionKey) -> String {
    format!("{}_{}_{}", key.0, key.1, key.2)
}

pub fn parse_position_key(s: &str) -> PoolResult<PositionKey> {
    let invalid = || PoolError::InvalidSnapshot {
        reason: format!("malformed position key {s:?}"),
    };
    let mut parts = s.rsplitn(3, '_');
    let tick_upper = parts.next().ok_or_else(invalid)?;
    let tick_lower = parts.next().ok_or_else(invalid)?;
    let owner = parts.next().ok_or_else(invalid)?;
    let tick_lower: i32 = tick_lower.parse().map_err(|_| invalid())?;
    let tick_upper: i32 = tick_upper.parse().map_err(|_| invalid())?;
    Ok((owner.to_string(), tick_lower, tick_upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn position_key_round_trips() {
        let key = ("0xalice_sub".to_string(), -60, 120);
        let s = format_position_key(&key);
        assert_eq!(parse_position_key(&s).unwrap(), key);
    }

    #[test]
    fn u256_decimal_round_trips_through_json() {
        let value = U256::from_str_radix(
            "113427455640312821154458202477256070485",
            10,
        )
        .unwrap();
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "u256_decimal")] U256);
        let json = serde_json::to_string(&Wrapper(value)).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.0, value);
    }
}
