//! Realtime Channel Handling
//!
//! This module owns the WebSocket side of the event bridge:
//!
//! - `protocol`: the `{event, data}` message format in both directions and
//!   the closed inbound command set.
//! - `session`: the connection lifecycle — attach, the single-writer send
//!   pump, the receive loop that demultiplexes binary frames from structured
//!   commands, and detach on disconnect.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
