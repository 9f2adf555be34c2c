//! Kino Autoplay WASM - browser bindings for the autoplay sequencer
//!
//! Provides:
//! - Autoplay escalation over an `HTMLVideoElement` (immediate, delayed, play prompt)
//! - A cached autoplay support probe
//! - Player page wiring around a JavaScript streaming library adapter
//!
//! ## Integration with hls.js
//!
//! ```javascript
//! import init, { AutoplayPage } from '@kino/autoplay';
//!
//! await init();
//! const hls = new Hls();
//! const page = new AutoplayPage({
//!   load(url, video) {
//!     hls.loadSource(url);
//!     hls.attachMedia(video);
//!   },
//! });
//! hls.on(Hls.Events.MANIFEST_PARSED, () => page.notify_media_ready());
//! hls.on(Hls.Events.ERROR, (_, data) => page.notify_error(data.details, data.fatal));
//! ```

use autoplay_core::{AutoplayIntent, AutoplaySequencer, MediaHandle, SequencerConfig};
use js_sys::{Function, Promise};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::HtmlVideoElement;

mod logging;
mod media;
mod overlay;
mod page;
mod probe;
mod runtime;

pub use logging::ConsoleMakeWriter;
pub use media::VideoElementHandle;
pub use overlay::{PlayPromptOverlay, OVERLAY_CLASS};
pub use page::{AutoplayPage, PageElements, PlayerAdapter};
pub use probe::{silent_wav_uri, VideoElementProbe};
pub use runtime::BrowserRuntime;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init("info");
    autoplay_core::init();
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Autoplay timing configuration
#[wasm_bindgen]
#[derive(Clone, Serialize, Deserialize)]
pub struct WasmAutoplayConfig {
    /// Waits before each delayed retry (ms)
    retry_delays_ms: Vec<u32>,
    /// Pause before escalating to the next strategy (ms)
    pub step_pause_ms: u32,
    /// Delay between stream ready and the first attempt (ms)
    pub ready_delay_ms: u32,
}

#[wasm_bindgen]
impl WasmAutoplayConfig {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::from_core(&SequencerConfig::default())
    }

    /// Shorter waits, prompt shows up sooner
    #[wasm_bindgen]
    pub fn aggressive() -> Self {
        Self::from_core(&SequencerConfig::aggressive())
    }

    /// Parse a JSON config (`retry_delays_ms`, `step_pause_ms`, `ready_delay_ms`)
    #[wasm_bindgen]
    pub fn from_json(json: &str) -> Result<WasmAutoplayConfig, JsValue> {
        let config = SequencerConfig::from_json(json).map_err(to_js_error)?;
        Ok(Self::from_core(&config))
    }

    #[wasm_bindgen(getter)]
    pub fn retry_delays_ms(&self) -> Vec<u32> {
        self.retry_delays_ms.clone()
    }

    #[wasm_bindgen(setter)]
    pub fn set_retry_delays_ms(&mut self, delays: Vec<u32>) {
        self.retry_delays_ms = delays;
    }

    /// Convert to JSON string
    #[wasm_bindgen]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl WasmAutoplayConfig {
    fn from_core(config: &SequencerConfig) -> Self {
        Self {
            retry_delays_ms: config
                .retry_delays_ms
                .iter()
                .map(|&ms| ms.min(u32::MAX as u64) as u32)
                .collect(),
            step_pause_ms: config.step_pause_ms.min(u32::MAX as u64) as u32,
            ready_delay_ms: config.ready_delay_ms.min(u32::MAX as u64) as u32,
        }
    }

    /// Validated core config
    pub fn to_core(&self) -> Result<SequencerConfig, JsValue> {
        let config = SequencerConfig {
            retry_delays_ms: self.retry_delays_ms.iter().map(|&ms| ms as u64).collect(),
            step_pause_ms: self.step_pause_ms as u64,
            ready_delay_ms: self.ready_delay_ms as u64,
        };
        config.validate().map_err(to_js_error)?;
        Ok(config)
    }
}

impl Default for WasmAutoplayConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Standalone autoplay sequencer for pages that do their own wiring
#[wasm_bindgen]
pub struct KinoAutoplay {
    sequencer: Rc<AutoplaySequencer>,
}

#[wasm_bindgen]
impl KinoAutoplay {
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<WasmAutoplayConfig>) -> Result<KinoAutoplay, JsValue> {
        let config = config.unwrap_or_default().to_core()?;

        Ok(Self {
            sequencer: Rc::new(AutoplaySequencer::new(
                config,
                Rc::new(BrowserRuntime),
                Rc::new(VideoElementProbe::new()),
            )),
        })
    }

    /// Resolves to "supported" or "unsupported"; probes at most once
    #[wasm_bindgen]
    pub fn detect_support(&self) -> Promise {
        let sequencer = self.sequencer.clone();
        future_to_promise(async move {
            let verdict = sequencer.detect_support().await;
            Ok(JsValue::from_str(&verdict.to_string()))
        })
    }

    /// Cached verdict: "unknown", "supported" or "unsupported"
    #[wasm_bindgen(getter)]
    pub fn verdict(&self) -> String {
        self.sequencer.verdict().to_string()
    }

    /// Run the escalation after the ready delay. `query` is a page query
    /// string carrying `autoplay` and `unmute`. Resolves to the outcome.
    #[wasm_bindgen]
    pub fn on_ready(&self, video: HtmlVideoElement, query: &str) -> Promise {
        let media: Rc<dyn MediaHandle> = Rc::new(VideoElementHandle::new(video));
        let pending = self
            .sequencer
            .on_ready(media, AutoplayIntent::from_query(query));

        future_to_promise(async move {
            let outcome = pending
                .await
                .map_err(|_| JsValue::from_str("escalation dropped"))?;
            Ok(serde_wasm_bindgen::to_value(&outcome)?)
        })
    }

    /// Run the escalation now with explicit intent
    #[wasm_bindgen]
    pub fn run_escalation(
        &self,
        video: HtmlVideoElement,
        autoplay: bool,
        unmute: Option<bool>,
    ) -> Promise {
        let sequencer = self.sequencer.clone();
        let media: Rc<dyn MediaHandle> = Rc::new(VideoElementHandle::new(video));

        future_to_promise(async move {
            let outcome = sequencer
                .run_escalation(media, AutoplayIntent::new(autoplay, unmute))
                .await;
            Ok(serde_wasm_bindgen::to_value(&outcome)?)
        })
    }

    /// Remove a play prompt left by an earlier run
    #[wasm_bindgen]
    pub fn dismiss_prompt(&self) -> bool {
        self.sequencer.dismiss_prompt()
    }

    /// Receive sequencer events as plain objects
    #[wasm_bindgen]
    pub fn subscribe(&self, callback: Function) {
        self.sequencer.subscribe(move |event| {
            if let Ok(value) = serde_wasm_bindgen::to_value(event) {
                let _ = callback.call1(&JsValue::NULL, &value);
            }
        });
    }
}

fn to_js_error(err: autoplay_core::Error) -> JsValue {
    JsValue::from_str(&format!("{} ({})", err, err.error_code()))
}
