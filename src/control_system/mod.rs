// control_system/mod.rs
pub mod arbiter;
pub mod junction;
pub mod pedestrian;
pub mod remote;

pub use arbiter::{
    run_control_loop, ArbiterState, IntersectionArbiter, IntersectionHardware, JunctionHardware,
};
pub use junction::{JunctionController, PendingChange};
pub use pedestrian::{CountdownStatus, PedestrianPhase, PedestrianRequestLatch};
pub use remote::{RemoteCommand, RemoteCommandHandler};
