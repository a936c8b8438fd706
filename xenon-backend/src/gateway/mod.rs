//! Event fan-out for everything that watches the orchestration from outside
//! the cycle: the log subscriber in `main`, and tests.

pub mod events;
pub mod protocol;

pub use events::EventBroadcaster;
pub use protocol::{EventType, GatewayEvent};
