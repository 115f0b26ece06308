//! Streaming session engine.
//!
//! A [`session::Session`] pulls raw packets from a transport on a listener task, decodes
//! them and queues them; a drainer task converts and dispatches them in order to a
//! [`vigil_core::session::port::SessionHandler`].

mod catchup;
pub mod channel;
pub mod convert;
pub mod decoder;
mod drainer;
mod listener;
pub mod merge;
pub mod queue;
pub mod session;

pub use channel::{ChannelHandler, SessionEvent};
pub use session::Session;
