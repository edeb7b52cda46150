//! One module per state-machine stage. Each handler is idempotent: it first
//! checks the module is still in the state it cares about and no-ops
//! otherwise, which is what lets [`crate::dispatch::dispatch`] and the
//! poller call them freely.

pub mod build;
pub mod failed;
pub mod wait;
