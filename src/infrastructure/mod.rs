pub mod lead_store;
pub mod memory;
pub mod models;
