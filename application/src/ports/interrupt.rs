//! Interrupt port
//!
//! Lets the input loop request an orderly stop of the whole session (servers
//! shut down, supervising tasks cancelled) when the user interrupts at the
//! prompt.

use async_trait::async_trait;

#[async_trait]
pub trait InterruptPort: Send + Sync {
    /// Run the shutdown path and mark the session as interrupted.
    ///
    /// Completes once shutdown has finished.
    async fn interrupt(&self);

    fn is_interrupted(&self) -> bool;
}

/// For tests and one-shot runs where nothing needs stopping.
pub struct NoInterrupt;

#[async_trait]
impl InterruptPort for NoInterrupt {
    async fn interrupt(&self) {}

    fn is_interrupted(&self) -> bool {
        false
    }
}
