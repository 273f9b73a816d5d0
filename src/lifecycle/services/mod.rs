//! Application services for the entity lifecycles.

mod engine;

pub use engine::{
    DEFAULT_PROMOTION_TITLE, EngineOutput, EngineSettings, LifecycleEngine, LifecycleEngineError,
    LifecycleEngineResult, PlannedTransition,
};
