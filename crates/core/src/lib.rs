//! Domain types and collaborator contracts for the Vigil backend.
//!
//! Everything here is runtime-agnostic: the shared mode register, the
//! cooperative cancellation flag, the latest-frame buffer, the audit log
//! book, and the seams to external collaborators (the sensing loop, the
//! thinking response generator, the streaming-token service, the durable
//! log sink, and the held input peripheral). The `vigil-api` service wires
//! these together around its WebSocket and HTTP surfaces.

pub mod cancel;
pub mod capture;
pub mod frames;
pub mod logbook;
pub mod mode;
pub mod presence;
pub mod thinker;
pub mod token;
