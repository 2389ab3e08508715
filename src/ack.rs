use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::error::{RateLimitError, malformed_acknowledgement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Error(String),
    Timeout,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success => "success",
            DeliveryOutcome::Error(_) => "error",
            DeliveryOutcome::Timeout => "timeout",
        }
    }

    /// Failed deliveries give the counted outflow back.
    pub fn restores_capacity(&self) -> bool {
        !matches!(self, DeliveryOutcome::Success)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAcknowledgement {
    result: Option<String>,
    error: Option<String>,
}

/// Decodes a channel acknowledgement, `{"result": "<base64>"}` or
/// `{"error": "<message>"}`.
pub fn parse_acknowledgement(ack: &[u8]) -> Result<DeliveryOutcome, RateLimitError> {
    let raw: RawAcknowledgement = serde_json::from_slice(ack).map_err(|err| {
        malformed_acknowledgement(format!(
            "cannot unmarshal transfer packet acknowledgement: {err}"
        ))
    })?;

    match (raw.result, raw.error) {
        (Some(result), None) => {
            let decoded = STANDARD.decode(result.as_bytes()).map_err(|err| {
                malformed_acknowledgement(format!("acknowledgement result is not base64: {err}"))
            })?;
            if decoded.is_empty() {
                return Err(malformed_acknowledgement(
                    "acknowledgement result cannot be empty",
                ));
            }
            Ok(DeliveryOutcome::Success)
        }
        (None, Some(error)) => Ok(DeliveryOutcome::Error(error)),
        (Some(_), Some(_)) => Err(malformed_acknowledgement(
            "acknowledgement cannot carry both result and error",
        )),
        (None, None) => Err(malformed_acknowledgement(
            "unsupported acknowledgement response: neither result nor error is set",
        )),
    }
}
