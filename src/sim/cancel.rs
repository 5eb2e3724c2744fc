//! Cooperative cancellation
//!
//! One token per run, shared by the interpreter and the animator. Tripping it
//! never interrupts anything by itself; both check it at every tick boundary.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Idempotent.
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}
