//! Vigil API Library Crate
//!
//! This library contains all the core logic for the Vigil web service: the
//! orchestration state, the broadcast bridge, the worker lifecycle
//! controller, the WebSocket dispatcher, the control-plane handlers, and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod broadcast;
pub mod config;
pub mod handlers;
pub mod models;
pub mod presence;
pub mod router;
pub mod sink;
pub mod state;
pub mod worker;
pub mod ws;
