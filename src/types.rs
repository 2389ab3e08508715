use std::{fmt, str::FromStr};

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{RateLimitError, invalid_amount};

pub type ChannelId = String;
pub type Denom = String;
pub type Sequence = u64;
pub type UnixSeconds = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketDirection {
    Send,
    Receive,
}

impl PacketDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketDirection::Send => "send",
            PacketDirection::Receive => "receive",
        }
    }
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative token amount, bounded to 256 bits like the chain's integer type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = RateLimitError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Err(invalid_amount("amount cannot be empty"));
        }
        if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid_amount(format!(
                "unable to parse amount '{raw}' as a non-negative integer"
            )));
        }

        U256::from_dec_str(raw)
            .map(Amount)
            .map_err(|_| invalid_amount(format!("amount '{raw}' exceeds 256 bits")))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: Sequence,
    pub source_port: String,
    pub source_channel: ChannelId,
    pub destination_port: String,
    pub destination_channel: ChannelId,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketContext {
    pub block_height: u64,
    pub block_time: UnixSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub channel_id: ChannelId,
    pub denom: Denom,
    pub amount: Amount,
    pub sender: String,
    pub receiver: String,
}
