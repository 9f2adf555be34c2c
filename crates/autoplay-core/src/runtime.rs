//! Tokio-backed runtime for native hosts
//!
//! Tasks are spawned with `spawn_local`, so callers must be inside a
//! `tokio::task::LocalSet`.

use crate::media::Runtime;
use futures::future::{FutureExt, LocalBoxFuture};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntime;

impl Runtime for TokioRuntime {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}
