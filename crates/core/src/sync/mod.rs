//! Concurrency primitives: the resource gate and the task group.

mod gate;
mod task_group;

pub use gate::{Permit, ResourceGate};
pub use task_group::{GroupOutcome, TaskGroup};
