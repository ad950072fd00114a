//! Windows reports faults as structured exceptions, which the embedder's
//! vectored exception handler deals with before it calls `unwind`. There is no
//! signal mask to preserve, so a plain `setjmp`/`longjmp` checkpoint is enough.

use super::JumpStrategy;

pub(crate) const STRATEGY: JumpStrategy = JumpStrategy::RegistersOnly;
