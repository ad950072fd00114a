//! Fault recovery primitive for the Wasmer runtime.
//!
//! Compiled WebAssembly runs with guard pages around its memories and stack,
//! so an out-of-bounds access, a division by zero or an `unreachable`
//! instruction is reported by the operating system as a signal (or a
//! structured exception on Windows) instead of a return value. This crate
//! provides the two halves that turn such a fault back into an ordinary
//! return:
//!
//! * [`guard`] captures a [`Checkpoint`] and runs a workload under it,
//!   returning [`Outcome::Completed`] or [`Outcome::Faulted`].
//! * [`unwind`] is called by the embedder's fault handler with the
//!   [`CheckpointHandle`] of the faulting thread, and makes the matching
//!   [`guard`] call return [`Outcome::Faulted`].
//!
//! On top of that, [`catch_faults`] and [`catch_faults_with_result`] keep a
//! per-thread stack of active guarded calls so that nested calls compose and
//! a signal handler can find the handle to resume with
//! [`current_checkpoint`].
//!
//! Installing the signal or exception handlers themselves is left to the
//! embedder.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(
    clippy::mut_mut,
    clippy::nonminimal_bool,
    clippy::map_unwrap_or,
    clippy::print_stdout,
    clippy::unicode_not_nfc,
    clippy::use_self
)]

mod error;
mod guard;

pub use crate::error::{Faulted, RestoreError};
pub use crate::guard::*;

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
