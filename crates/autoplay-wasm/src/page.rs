//! Player page wiring
//!
//! Binds the URL input, load button, status line and error banner to a
//! [`PageSession`], hands load requests to the JavaScript streaming library
//! adapter, and runs the autoplay sequencer once the adapter reports the
//! stream ready.

use crate::media::VideoElementHandle;
use crate::runtime::BrowserRuntime;
use crate::probe::VideoElementProbe;
use crate::WasmAutoplayConfig;
use autoplay_core::{
    AutoplayIntent, AutoplaySequencer, MediaHandle, PageEvent, PageSession, SequencerEvent,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlVideoElement, KeyboardEvent};

/// CSS class toggled on the error banner
pub const BANNER_VISIBLE_CLASS: &str = "visible";

#[wasm_bindgen]
extern "C" {
    /// Adapter around the streaming library (hls.js or similar)
    #[wasm_bindgen(typescript_type = "KinoPlayerAdapter")]
    #[derive(Debug, Clone)]
    pub type PlayerAdapter;

    /// Attach the stream at `url` to `video`
    #[wasm_bindgen(method)]
    fn load(this: &PlayerAdapter, url: &str, video: &HtmlVideoElement);
}

/// Element ids of the player page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageElements {
    pub url_input: String,
    pub load_button: String,
    pub video: String,
    pub status: String,
    pub error_banner: String,
}

impl Default for PageElements {
    fn default() -> Self {
        Self {
            url_input: "stream-url".to_string(),
            load_button: "load-button".to_string(),
            video: "video".to_string(),
            status: "status".to_string(),
            error_banner: "error-banner".to_string(),
        }
    }
}

struct PageInner {
    session: PageSession,
    sequencer: Rc<AutoplaySequencer>,
    intent: AutoplayIntent,
    adapter: PlayerAdapter,
    video: HtmlVideoElement,
    input: HtmlInputElement,
    button: HtmlButtonElement,
    status: HtmlElement,
    banner: HtmlElement,
}

impl PageInner {
    fn load_from_input(&self) {
        if let Err(e) = self.session.request_load(&self.input.value()) {
            tracing::debug!(error = %e, "Load rejected");
        }
    }

    fn render(&self, event: &PageEvent) {
        match event {
            PageEvent::LoadRequested { url } => {
                // A prompt left by the previous stream would stack under the next one
                self.sequencer.dismiss_prompt();
                self.adapter.load(url, &self.video);
            }
            PageEvent::StatusChanged { text } => self.status.set_text_content(Some(text)),
            PageEvent::ErrorShown { message } => {
                self.banner.set_text_content(Some(message));
                let _ = self.banner.class_list().add_1(BANNER_VISIBLE_CLASS);
            }
            PageEvent::ErrorCleared => {
                self.banner.set_text_content(None);
                let _ = self.banner.class_list().remove_1(BANNER_VISIBLE_CLASS);
            }
            PageEvent::LoadButtonEnabled { enabled } => self.button.set_disabled(!enabled),
        }
    }
}

/// The player page: controls, session and autoplay sequencer
#[wasm_bindgen]
pub struct AutoplayPage {
    inner: Rc<PageInner>,
}

#[wasm_bindgen]
impl AutoplayPage {
    /// Bind to the page. `elements` overrides default element ids.
    #[wasm_bindgen(constructor)]
    pub fn new(
        adapter: PlayerAdapter,
        elements: JsValue,
        config: Option<WasmAutoplayConfig>,
    ) -> Result<AutoplayPage, JsValue> {
        let ids: PageElements = if elements.is_undefined() || elements.is_null() {
            PageElements::default()
        } else {
            serde_wasm_bindgen::from_value(elements)?
        };

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let query = window.location().search().unwrap_or_default();
        let intent = AutoplayIntent::from_query(&query);

        let config = config.unwrap_or_default().to_core()?;
        let sequencer = Rc::new(AutoplaySequencer::new(
            config,
            Rc::new(BrowserRuntime),
            Rc::new(VideoElementProbe::new()),
        ));

        let inner = Rc::new(PageInner {
            session: PageSession::new(),
            sequencer,
            intent,
            adapter,
            video: element(&document, &ids.video)?,
            input: element(&document, &ids.url_input)?,
            button: element(&document, &ids.load_button)?,
            status: element(&document, &ids.status)?,
            banner: element(&document, &ids.error_banner)?,
        });

        // Listeners live as long as the page
        let renderer = Rc::downgrade(&inner);
        inner.session.subscribe(move |event| {
            if let Some(page) = renderer.upgrade() {
                page.render(event);
            }
        });

        let on_prompt = Rc::downgrade(&inner);
        inner.sequencer.subscribe(move |event| {
            if let (SequencerEvent::PromptDismissed, Some(page)) = (event, on_prompt.upgrade()) {
                let _ = page.session.playback_started(true);
            }
        });

        let on_click = inner.clone();
        let click = Closure::wrap(Box::new(move |_: Event| {
            on_click.load_from_input();
        }) as Box<dyn FnMut(Event)>);
        inner
            .button
            .add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();

        let on_key = inner.clone();
        let keydown = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if event.key() == "Enter" {
                on_key.load_from_input();
            }
        }) as Box<dyn FnMut(KeyboardEvent)>);
        inner
            .input
            .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();

        tracing::info!(
            autoplay = intent.autoplay,
            unmute = ?intent.unmute,
            "Player page bound"
        );

        Ok(AutoplayPage { inner })
    }

    /// Load the URL currently in the input
    #[wasm_bindgen]
    pub fn load(&self) {
        self.inner.load_from_input();
    }

    /// Called by the adapter once the stream can play
    #[wasm_bindgen]
    pub fn notify_media_ready(&self) {
        if let Err(e) = self.inner.session.media_ready() {
            tracing::warn!(error = %e, "Ready notification out of order");
            return;
        }

        let media: Rc<dyn MediaHandle> = Rc::new(VideoElementHandle::new(self.inner.video.clone()));
        let pending = self.inner.sequencer.on_ready(media, self.inner.intent);
        let page = self.inner.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let Ok(outcome) = pending.await else {
                return;
            };

            if outcome.started {
                let _ = page.session.playback_started(false);
            } else if outcome.prompt_mounted {
                page.session.awaiting_gesture();
            }
        });
    }

    /// Called by the adapter on playback or network errors
    #[wasm_bindgen]
    pub fn notify_error(&self, message: &str, fatal: bool) {
        self.inner.session.player_error(message, fatal);
    }

    /// Current page state name
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.session.state().to_string()
    }

    /// URL of the current stream, if any
    #[wasm_bindgen(getter)]
    pub fn current_url(&self) -> Option<String> {
        self.inner.session.current_url().map(|u| u.to_string())
    }
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{} has the wrong type", id)))
}
