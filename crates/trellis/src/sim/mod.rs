//! Force-directed simulation: the engine, its wire protocol and the strategies that drive it.

mod engine;
mod force_layout;
mod protocol;
mod worker;

pub use engine::{SimulationEngine, StepOutcome};
pub use force_layout::{ForceLayout, InlineForceLayout};
pub use protocol::{Command, EdgeSnapshot, EngineEvent, NodeSnapshot, PositionEntry};
