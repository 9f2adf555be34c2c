//! Media handle over an `HTMLVideoElement`

use crate::overlay::PlayPromptOverlay;
use async_trait::async_trait;
use autoplay_core::{Error, GestureSurface, MediaHandle, Result};
use js_sys::Promise;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomException, HtmlVideoElement};

/// A `play()` promise started inside a gesture listener
pub type GesturePlay = Rc<RefCell<Option<Promise>>>;

/// The page's video element as seen by the sequencer
pub struct VideoElementHandle {
    video: HtmlVideoElement,
    gesture_play: GesturePlay,
}

impl VideoElementHandle {
    pub fn new(video: HtmlVideoElement) -> Self {
        Self {
            video,
            gesture_play: Rc::new(RefCell::new(None)),
        }
    }
}

#[async_trait(?Send)]
impl MediaHandle for VideoElementHandle {
    fn muted(&self) -> bool {
        self.video.muted()
    }

    fn set_muted(&self, muted: bool) {
        self.video.set_muted(muted);
    }

    async fn play(&self) -> Result<()> {
        // Prefer the call made while the user activation was still live
        let pending = self.gesture_play.borrow_mut().take();
        let promise = match pending {
            Some(promise) => promise,
            None => self.video.play().map_err(play_error)?,
        };
        JsFuture::from(promise).await.map_err(play_error)?;
        Ok(())
    }

    fn mount_gesture_prompt(&self) -> Result<Rc<dyn GestureSurface>> {
        let container = self
            .video
            .parent_element()
            .ok_or_else(|| Error::MountFailed("video element has no container".into()))?;

        Ok(Rc::new(PlayPromptOverlay::mount(
            &container,
            &self.video,
            self.gesture_play.clone(),
        )?))
    }
}

/// Map a rejected play() to the autoplay error taxonomy
pub(crate) fn play_error(err: JsValue) -> Error {
    match err.dyn_ref::<DomException>() {
        Some(e) if e.name() == "NotAllowedError" => Error::PlaybackBlocked(e.message()),
        Some(e) => Error::PlaybackError(format!("{}: {}", e.name(), e.message())),
        None => Error::PlaybackError(js_message(&err)),
    }
}

pub(crate) fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
