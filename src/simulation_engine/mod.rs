// simulation_engine/mod.rs
pub mod hardware;
pub mod intersection;
pub mod traffic;

pub use intersection::SimulatedIntersection;
pub use traffic::{TrafficGenerator, TrafficProfile};
