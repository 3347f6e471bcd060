//! 编排层：Decision Node、Action Node、Router 与驱动它们的执行器

pub mod actor;
pub mod events;
pub mod loop_;
pub mod planner;
pub mod router;

pub use actor::ActionNode;
pub use events::{EventSink, RunEvent};
pub use loop_::{Engine, EngineLimits};
pub use planner::{DecisionNode, DEFAULT_DIRECTIVE};
pub use router::{route, route_history, Route};
