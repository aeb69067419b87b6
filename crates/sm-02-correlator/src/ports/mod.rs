//! Ports for the Correlator subsystem.

pub mod inbound;
pub mod outbound;
