//! Browser event-loop runtime

use autoplay_core::Runtime;
use futures::future::{FutureExt, LocalBoxFuture};
use gloo_timers::future::TimeoutFuture;
use std::time::Duration;

/// Timers via `setTimeout`, tasks via the microtask queue
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserRuntime;

impl Runtime for BrowserRuntime {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = duration.as_millis().min(u32::MAX as u128) as u32;
        TimeoutFuture::new(millis).boxed_local()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
