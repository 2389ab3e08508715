pub mod flow;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod pending;
pub mod types;

pub use ledger::{FlowLedger, FlowUpdate};
pub use pending::PendingSendRegistry;
pub use types::{FlowKey, FlowState, PendingSendEntry, PendingSendKey};
