//! Platform seams: media handle, gesture prompt, probe and runtime
//!
//! Everything here is single-threaded; implementations hold `Rc`/`Cell`
//! state and their futures are `!Send`.

use crate::Result;
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Duration;

/// A playable media element owned by the embedding page
#[async_trait(?Send)]
pub trait MediaHandle {
    /// Current mute flag
    fn muted(&self) -> bool;

    /// Set the mute flag
    fn set_muted(&self, muted: bool);

    /// Start playback. Rejections by the autoplay policy must surface as
    /// [`Error::PlaybackBlocked`](crate::Error::PlaybackBlocked).
    async fn play(&self) -> Result<()>;

    /// Mount a user-gesture prompt into the element's container
    fn mount_gesture_prompt(&self) -> Result<Rc<dyn GestureSurface>>;
}

/// A mounted play prompt waiting for user activation
#[async_trait(?Send)]
pub trait GestureSurface {
    /// Resolves on the next click/tap. `None` once the prompt is gone.
    async fn next_activation(&self) -> Option<()>;

    /// Remove the prompt from its container
    fn dismiss(&self);
}

/// What the synthetic probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAttempt {
    /// The play promise resolved
    Resolved,
    /// Legacy synchronous play path, nothing to await
    NoPendingResult,
}

/// One-shot unattended playback test with a muted minimal resource
#[async_trait(?Send)]
pub trait AutoplayProbe {
    async fn attempt(&self) -> Result<ProbeAttempt>;
}

/// Timer and task primitives of the hosting event loop
pub trait Runtime {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}
