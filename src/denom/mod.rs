pub mod resolver;
pub mod trace;

pub use resolver::{resolve_denom, resolve_receive_denom, resolve_send_denom};
pub use trace::{DenomTrace, denom_prefix, is_valid_channel_id, is_valid_port_id};
