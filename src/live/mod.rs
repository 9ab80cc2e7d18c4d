//! Live updates over WebSocket
//!
//! Every connection to `/ws` is registered with the shared [`LiveHub`] and
//! receives one JSON text frame per poll mutation. Connections that fail a
//! send are closed and forgotten.

pub mod broadcaster;
pub mod events;
pub mod registry;
pub mod subscriber;
pub mod ws_handler;

pub use broadcaster::{Broadcaster, DEFAULT_SEND_TIMEOUT};
pub use events::PollEvent;
pub use registry::{ConnectionRegistry, SubscriberId};
pub use subscriber::{SendError, Subscriber, WsSubscriber};
pub use ws_handler::ws_handler;

/// The broadcaster wired to real WebSocket connections.
pub type LiveHub = Broadcaster<WsSubscriber>;
