//! Device workers.
//!
//! Each service takes the transport through a [`PublishGate`](crate::publish_gate::PublishGate)
//! generic parameter, keeping this layer decoupled from concrete adapters.

pub mod command_handler;
pub mod publish_loop;

pub use command_handler::{CommandHandler, CommandOutcome};
pub use publish_loop::PublishLoop;
