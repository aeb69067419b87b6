//! Cross-subsystem integration flows.

pub mod federation_flows;
pub mod flows;
