use thiserror::Error;

/// A guarded call was diverted by [`unwind`](crate::unwind) before its
/// workload returned.
///
/// Which fault caused the unwind is not recorded here; the fault handler that
/// triggered it is expected to keep that information on its own side.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("guarded call was unwound by a fault")]
pub struct Faulted;

/// Errors when detaching a guarded call with
/// [`GuardRestore`](crate::GuardRestore).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreError {
    /// There is no active guarded call on the current thread.
    #[error("no guarded call is active on the current thread")]
    NotGuarded,
}
