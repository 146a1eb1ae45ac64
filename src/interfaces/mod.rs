//! Inbound adapters for driving the engine without the HTTP layer.

pub mod csv;
