pub mod bid;
pub mod bid_registry;
pub mod commands;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod geo;
pub mod lead;
pub mod lifecycle;
pub mod negotiation;
pub mod ports;
pub mod professional;
pub mod ranking;
