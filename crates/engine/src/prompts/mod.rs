//! Prompt builders.
//!
//! Pure functions from task state to prompt text. Every prompt that feeds
//! the robust invoker instructs the model to answer with a single JSON
//! object and names its required keys.

mod debate;
mod plan_explore;
mod write;

pub use debate::*;
pub use plan_explore::*;
pub use write::*;
