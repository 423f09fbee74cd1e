//! # homesim-domain
//!
//! Pure domain model for the homesim smart-home device simulator.
//!
//! ## Responsibilities
//! - Foundational types: device handles, routing keys, error conventions
//! - Define **Devices** (thermometer, hygrometer, wattmeter, move sensor,
//!   light, camera, relay, valve) and their invariants
//! - Define **State generators** (bounded random walks, random state picks,
//!   randomized cadences)
//! - Define **Messages** (inbound commands, outbound status lines)
//! - Define **Descriptors** (the device file and its validation)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod descriptor;
pub mod device;
pub mod generator;
pub mod message;
