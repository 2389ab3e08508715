use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitErrorKind {
    MalformedPacket,
    InvalidAmount,
    MalformedDenom,
    QuotaExceeded,
    MalformedAcknowledgement,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RateLimitError {
    pub kind: RateLimitErrorKind,
    pub message: String,
}

impl RateLimitError {
    pub fn new(kind: RateLimitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn malformed_packet(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::MalformedPacket, message)
}

pub fn invalid_amount(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::InvalidAmount, message)
}

pub fn malformed_denom(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::MalformedDenom, message)
}

pub fn quota_exceeded(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::QuotaExceeded, message)
}

pub fn malformed_acknowledgement(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::MalformedAcknowledgement, message)
}

pub fn internal_error(message: impl Into<String>) -> RateLimitError {
    RateLimitError::new(RateLimitErrorKind::Internal, message)
}
