pub mod ack;
pub mod config;
pub mod denom;
pub mod error;
pub mod ledger;
pub mod limiter;
pub mod logging;
pub mod packet;
pub mod persistence;
pub mod quota;
pub mod telemetry;
pub mod types;

pub use error::{RateLimitError, RateLimitErrorKind};
pub use limiter::{RateLimiter, Resolution};
