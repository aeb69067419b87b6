//! # Sentinel-Mesh Test Suite
//!
//! Unified test crate containing cross-subsystem integration flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs              # Signal → incident → score → action flows
//!     └── federation_flows.rs   # Multi-node gossip and verification
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sm-tests
//!
//! # By category
//! cargo test -p sm-tests integration::flows::
//! cargo test -p sm-tests integration::federation_flows::
//! ```

pub mod integration;
