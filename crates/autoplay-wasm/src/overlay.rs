//! Play prompt overlay - last-resort gesture affordance
//!
//! Mounted over the video's container when every unattended attempt failed.
//! Clicks and taps call `play()` inside the listener, while user activation
//! is still live, then wake the sequencer through a channel. The element is
//! removed at most once.

use crate::media::{js_message, GesturePlay};
use async_trait::async_trait;
use autoplay_core::{Error, GestureSurface, Result};
use futures::channel::mpsc;
use futures::StreamExt;
use std::cell::{Cell, RefCell};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement, HtmlVideoElement};

/// Class applied to the overlay root
pub const OVERLAY_CLASS: &str = "kino-autoplay-overlay";

const OVERLAY_STYLE: &str = "position:absolute;inset:0;display:flex;\
align-items:center;justify-content:center;background:rgba(12, 10, 18, 0.6);\
cursor:pointer;z-index:10;";

const BUTTON_STYLE: &str = "padding:14px 28px;border:0;border-radius:999px;\
background:#9b30ff;color:#f6f2ff;font-size:18px;cursor:pointer;\
box-shadow:0 4px 20px rgba(155, 48, 255, 0.4);";

const GESTURE_EVENTS: [&str; 2] = ["click", "touchend"];

pub struct PlayPromptOverlay {
    root: HtmlElement,
    tx: mpsc::UnboundedSender<()>,
    rx: RefCell<Option<mpsc::UnboundedReceiver<()>>>,
    removed: Cell<bool>,
    _listeners: Vec<Closure<dyn FnMut(Event)>>,
}

impl PlayPromptOverlay {
    /// Build the overlay and append it to `container`. Activations start
    /// `video` and leave the pending promise in `gesture_play`.
    pub fn mount(
        container: &Element,
        video: &HtmlVideoElement,
        gesture_play: GesturePlay,
    ) -> Result<Self> {
        let document = container
            .owner_document()
            .ok_or_else(|| Error::MountFailed("container is detached".into()))?;

        let root = document
            .create_element("div")
            .map_err(mount_error)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| Error::MountFailed("div is not an HtmlElement".into()))?;
        root.set_class_name(OVERLAY_CLASS);
        root.style().set_css_text(OVERLAY_STYLE);

        let button = document
            .create_element("button")
            .map_err(mount_error)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| Error::MountFailed("button is not an HtmlElement".into()))?;
        button.set_attribute("type", "button").map_err(mount_error)?;
        button.set_attribute("aria-label", "Play video").map_err(mount_error)?;
        button.set_text_content(Some("\u{25B6} Click to play"));
        button.style().set_css_text(BUTTON_STYLE);
        root.append_child(&button).map_err(mount_error)?;

        let (tx, rx) = mpsc::unbounded();
        let mut listeners = Vec::with_capacity(GESTURE_EVENTS.len());

        for name in GESTURE_EVENTS {
            let tx = tx.clone();
            let video = video.clone();
            let gesture_play = gesture_play.clone();
            let listener = Closure::wrap(Box::new(move |event: Event| {
                // Suppress the synthetic click that follows touchend
                event.prevent_default();
                if let Ok(promise) = video.play() {
                    *gesture_play.borrow_mut() = Some(promise);
                }
                let _ = tx.unbounded_send(());
            }) as Box<dyn FnMut(Event)>);

            root.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
                .map_err(mount_error)?;
            listeners.push(listener);
        }

        // Absolute overlay needs a positioned container
        if let Some(host) = container.dyn_ref::<HtmlElement>() {
            let style = host.style();
            if style.get_property_value("position").unwrap_or_default().is_empty() {
                let _ = style.set_property("position", "relative");
            }
        }

        container.append_child(&root).map_err(mount_error)?;
        web_sys::console::info_1(&"[Kino Autoplay] Play prompt mounted".into());

        Ok(Self {
            root,
            tx,
            rx: RefCell::new(Some(rx)),
            removed: Cell::new(false),
            _listeners: listeners,
        })
    }

    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }
}

#[async_trait(?Send)]
impl GestureSurface for PlayPromptOverlay {
    async fn next_activation(&self) -> Option<()> {
        let mut rx = self.rx.borrow_mut().take()?;
        let next = rx.next().await;
        *self.rx.borrow_mut() = Some(rx);
        next
    }

    fn dismiss(&self) {
        if self.removed.replace(true) {
            return;
        }
        self.root.remove();
        self.tx.close_channel();
    }
}

fn mount_error(err: JsValue) -> Error {
    Error::MountFailed(js_message(&err))
}
