use sha2::{Digest, Sha256};

use crate::error::{RateLimitError, malformed_denom};

const IBC_DENOM_PREFIX: &str = "ibc";
const CHANNEL_ID_PREFIX: &str = "channel-";
const PORT_ID_MIN_LEN: usize = 2;
const PORT_ID_MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenomTrace {
    pub path: String,
    pub base_denom: String,
}

impl DenomTrace {
    /// Splits a prefixed denom such as `transfer/channel-2/uosmo` into its hop
    /// path and base denom. Slashes that do not form `port/channel-N` pairs stay
    /// in the base denom.
    pub fn parse(raw_denom: &str) -> Result<Self, RateLimitError> {
        if raw_denom.trim().is_empty() {
            return Err(malformed_denom("denom cannot be blank"));
        }

        let items: Vec<&str> = raw_denom.split('/').collect();
        if items.len() == 1 {
            return Ok(Self {
                path: String::new(),
                base_denom: raw_denom.to_string(),
            });
        }

        if items.last().is_none_or(|item| item.trim().is_empty()) {
            return Err(malformed_denom(format!(
                "base denomination of '{raw_denom}' cannot be blank"
            )));
        }

        let path_len = trace_path_len(&items);
        let (path_items, base_items) = items.split_at(path_len);
        if base_items.is_empty() {
            return Err(malformed_denom(format!(
                "denom '{raw_denom}' has a trace path but no base denomination"
            )));
        }

        for hop in path_items.chunks(2) {
            if !is_valid_port_id(hop[0]) {
                return Err(malformed_denom(format!(
                    "invalid port identifier '{}' in denom trace '{raw_denom}'",
                    hop[0]
                )));
            }
        }

        Ok(Self {
            path: path_items.join("/"),
            base_denom: base_items.join("/"),
        })
    }

    pub fn is_native(&self) -> bool {
        self.path.is_empty()
    }

    pub fn full_path(&self) -> String {
        if self.path.is_empty() {
            self.base_denom.clone()
        } else {
            format!("{}/{}", self.path, self.base_denom)
        }
    }

    pub fn hash_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.full_path().as_bytes());
        format!("{:X}", hasher.finalize())
    }

    pub fn ibc_denom(&self) -> String {
        if self.is_native() {
            return self.base_denom.clone();
        }
        format!("{IBC_DENOM_PREFIX}/{}", self.hash_hex())
    }
}

// Pairs are consumed while the second element looks like a channel id and
// more elements follow. Mirrors how transfer modules split the full denom.
fn trace_path_len(items: &[&str]) -> usize {
    let length = items.len();
    let mut index = 0;
    while index + 1 < length && length > 2 && is_valid_channel_id(items[index + 1]) {
        index += 2;
    }
    index
}

pub fn denom_prefix(port_id: &str, channel_id: &str) -> String {
    format!("{port_id}/{channel_id}/")
}

pub fn is_valid_channel_id(channel_id: &str) -> bool {
    channel_id
        .strip_prefix(CHANNEL_ID_PREFIX)
        .is_some_and(|sequence| {
            !sequence.is_empty()
                && sequence.bytes().all(|byte| byte.is_ascii_digit())
                && sequence.parse::<u64>().is_ok()
        })
}

pub fn is_valid_port_id(port_id: &str) -> bool {
    (PORT_ID_MIN_LEN..=PORT_ID_MAX_LEN).contains(&port_id.len())
        && port_id.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '.' | '_' | '+' | '-' | '#' | '[' | ']' | '<' | '>')
        })
}
