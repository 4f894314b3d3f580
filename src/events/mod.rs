//! Event sourcing: the outbound event log and inbound decision stream.
//!
//! - `Event`: one committed state change, in wire form via `to_contract_json`
//! - `EventBus`: per-match log, subscriber fan-out and inbound channel
//! - `Responder`: the host's handle for answering decisions

mod bus;
mod event;

pub use bus::{EventBus, Responder};
pub use event::{Event, EventKind, EventPayload, SearchParams, Zone};
