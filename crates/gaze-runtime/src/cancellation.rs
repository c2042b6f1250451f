#![forbid(unsafe_code)]

//! Cooperative cancellation for scripted sequences.
//!
//! A [`CancellationSource`] owns the flag; any number of
//! [`CancellationToken`]s observe it. The autopilot checks its token before
//! every step and on every poll, so cancelling from anywhere (a UI button, a
//! test, another thread) stops the script at the next suspension point.
//!
//! # Example
//!
//! ```
//! use gaze_runtime::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! assert!(!token.is_cancelled());
//! assert!(source.cancel());
//! assert!(token.is_cancelled());
//! assert!(!source.cancel(), "second cancel is a no-op");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observes a [`CancellationSource`].
#[derive(Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

/// Triggers cancellation for every token it handed out.
///
/// Dropping the source does **not** cancel its tokens.
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A token observing this source.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Request cancellation. Returns `true` only for the call that flipped
    /// the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSource")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Cancel through the token. Returns `true` if this call flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
