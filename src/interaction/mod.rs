//! Player decisions: requests, responses and the broker that pairs them.

mod broker;

pub use broker::{DecisionResponse, InteractionBroker, InteractionKind, InteractionRequest, Selection};
