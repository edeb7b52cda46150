//! The message bus adapter: the event taxonomy the orchestrator reacts to
//! ([`event`]), and the transport that delivers it ([`transport`]).

pub mod error;
pub mod event;
pub mod mock;
pub mod transport;

pub use error::BusError;
pub use event::{BusEvent, ComponentStateChanged, ModuleStateChanged, RepoRegenerated, TagChanged};
pub use mock::MockBus;
pub use transport::{BusSubscription, BusTransport, ChannelBus};
