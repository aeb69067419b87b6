//! Port adapters connecting subsystems to each other and to the shared bus.

mod bus;
mod capabilities;
mod pipeline;

pub use bus::{BusEventAdapter, WallClock};
pub use capabilities::{DynTransport, HeuristicScoringModel, LoggingActionHandler};
pub use pipeline::{
    CorrelationSinkAdapter, DispatchGatewayAdapter, NodeFederation, PeerIntelAdapter,
};
