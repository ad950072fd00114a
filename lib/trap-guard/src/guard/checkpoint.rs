//! The raw guard/unwind pair.
//!
//! [`guard`] captures a [`Checkpoint`] on its own stack frame, publishes its
//! address through a caller-provided slot and runs a workload. [`unwind`]
//! jumps back to that checkpoint, which makes the pending [`guard`] call
//! return [`Outcome::Faulted`].

use super::platform;
use crate::error::Faulted;
use std::cell::Cell;
use std::marker::{PhantomData, PhantomPinned};
use std::ptr::NonNull;

/// Execution state captured by [`guard`]: stack pointer, program counter,
/// callee-saved registers and, where the platform needs it, the signal mask.
///
/// The layout is platform-defined and never exposed. A checkpoint only ever
/// lives inside the stack frame of the [`guard`] call that captured it and is
/// reached through a [`CheckpointHandle`].
#[repr(C)]
pub struct Checkpoint {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Address of a live [`Checkpoint`].
///
/// Handles are only created by [`guard`]. A handle is valid until the
/// [`guard`] call that wrote it returns, and only on the thread that called
/// it, which is why it is neither `Send` nor `Sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct CheckpointHandle(NonNull<Checkpoint>);

impl CheckpointHandle {
    /// Returns the address of the checkpoint.
    pub fn as_ptr(self) -> *const Checkpoint {
        self.0.as_ptr()
    }
}

/// Entry point of a guarded workload. It receives the payload passed to
/// [`guard`].
pub type Workload = unsafe extern "C" fn(payload: *mut u8);

/// How a [`guard`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Outcome {
    /// The workload returned normally.
    Completed,
    /// Control came back through [`unwind`] before the workload returned.
    Faulted,
}

impl Outcome {
    /// Returns `true` if the workload ran to its end.
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }

    /// Returns `true` if the guarded call was unwound.
    pub fn is_faulted(self) -> bool {
        self == Self::Faulted
    }

    /// Converts the outcome into a `Result`.
    pub fn into_result(self) -> Result<(), Faulted> {
        match self {
            Self::Completed => Ok(()),
            Self::Faulted => Err(Faulted),
        }
    }
}

/// Runs `workload(payload)` under a fresh checkpoint.
///
/// The handle of the checkpoint is written to `slot` before the workload
/// starts, so a fault handler that reads `slot` always finds a live handle
/// while the workload runs. Once the call returns, `slot` holds whatever it
/// held on entry again; sharing one slot between nested calls is therefore
/// fine, the outer handle is live again as soon as the inner call is done.
///
/// Returns [`Outcome::Faulted`] if [`unwind`] was called with the handle
/// before the workload returned. The workload is never re-run.
///
/// # Safety
///
/// * `workload` must be safe to call with `payload`.
/// * Frames between this call and an eventual [`unwind`] are discarded without
///   running destructors, so the workload must not own anything that needs
///   dropping at the point where it can fault.
pub unsafe fn guard(
    slot: &Cell<Option<CheckpointHandle>>,
    workload: Workload,
    payload: *mut u8,
) -> Outcome {
    let prev = slot.get();
    // `Option<CheckpointHandle>` has the layout of a nullable pointer, so the
    // shim can store the address directly.
    let completed = unsafe {
        platform::capture_and_run(slot.as_ptr().cast::<*const Checkpoint>(), workload, payload)
    };
    slot.set(prev);
    if completed {
        Outcome::Completed
    } else {
        Outcome::Faulted
    }
}

/// Resumes the [`guard`] call that owns `handle`, making it return
/// [`Outcome::Faulted`]. This function never returns.
///
/// It only restores registers (and the signal mask where the platform
/// requires it): no allocation, no locks. This makes it usable from a signal
/// handler or a vectored exception handler.
///
/// # Safety
///
/// * The [`guard`] call that produced `handle` must not have returned yet.
/// * It must be called on the thread that made that [`guard`] call.
/// * No frames with pending destructors may sit between here and that call.
pub unsafe fn unwind(handle: CheckpointHandle) -> ! {
    unsafe { platform::resume(handle.as_ptr()) }
}
