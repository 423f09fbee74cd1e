//! # homesim-app
//!
//! Application layer: the simulation runtime and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **transport port** adapters must implement:
//!   - `Transport`: publish, subscribe, unsubscribe, disconnect
//!   - `TransportEvent`: asynchronous notifications delivered over a channel
//! - Serialize every outbound operation through the **publish gate**
//! - Hold devices in the **registry** and route inbound commands by
//!   receive topic and id
//! - Run **device workers**:
//!   - `PublishLoop`: periodic status publishing
//!   - `CommandHandler`: applies inbound state requests
//! - Drive the connection lifecycle and inbound routing in the **dispatcher**
//! - Start and join every worker from the **simulator** controller
//!
//! ## Dependency rule
//! Depends on `homesim-domain` only (plus `tokio` for tasks, channels and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatcher;
pub mod ports;
pub mod publish_gate;
pub mod registry;
pub mod services;
pub mod simulator;

#[cfg(test)]
mod testing;
