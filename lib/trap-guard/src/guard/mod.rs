//! Checkpoints, guarded calls and the per-thread guard stack.
mod catch;
mod checkpoint;
mod platform;

pub use catch::{
    catch_faults, catch_faults_with_result, current_checkpoint, guard_depth, GuardRestore,
};
pub use checkpoint::{guard, unwind, Checkpoint, CheckpointHandle, Outcome, Workload};
