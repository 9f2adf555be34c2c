//! Page Session - state behind the player page controls
//!
//! Owns what the page would otherwise keep in globals: the current stream
//! URL, the load state, the status line and the error banner. DOM bindings
//! subscribe to [`PageEvent`]s and mirror them.

use crate::{Error, Result};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use tracing::{info, warn};
use url::Url;

/// Page load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Idle,
    Loading,
    Ready,
    Playing,
    Failed,
}

impl PageState {
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        matches!(
            (*self, next),
            (Idle, Loading)
                | (Loading, Ready)
                | (Ready, Playing)
                | (Ready, Loading)
                | (Playing, Loading)
                | (Failed, Loading)
                | (_, Failed)
        )
    }

    /// Whether the load button accepts input in this state
    pub fn accepts_load(&self) -> bool {
        !matches!(self, PageState::Loading)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::Idle => write!(f, "idle"),
            PageState::Loading => write!(f, "loading"),
            PageState::Ready => write!(f, "ready"),
            PageState::Playing => write!(f, "playing"),
            PageState::Failed => write!(f, "failed"),
        }
    }
}

/// Observable page side effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    LoadRequested { url: String },
    StatusChanged { text: String },
    ErrorShown { message: String },
    ErrorCleared,
    LoadButtonEnabled { enabled: bool },
}

type Listener = Box<dyn Fn(&PageEvent)>;

/// Player page state, one per page load
pub struct PageSession {
    state: Cell<PageState>,
    current_url: RefCell<Option<Url>>,
    status: RefCell<String>,
    error: RefCell<Option<String>>,
    listeners: RefCell<Vec<Listener>>,
}

impl PageSession {
    pub fn new() -> Self {
        Self {
            state: Cell::new(PageState::Idle),
            current_url: RefCell::new(None),
            status: RefCell::new(String::new()),
            error: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&PageEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn state(&self) -> PageState {
        self.state.get()
    }

    pub fn current_url(&self) -> Option<Url> {
        self.current_url.borrow().clone()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    fn emit(&self, event: PageEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(&event);
        }
    }

    fn set_state(&self, next: PageState) -> Result<()> {
        let current = self.state.get();
        if current == next {
            return Ok(());
        }

        if !current.can_transition_to(next) {
            return Err(Error::InvalidConfig(format!(
                "page cannot go from {} to {}",
                current, next
            )));
        }

        self.state.set(next);
        info!(from = %current, to = %next, "Page state transition");

        let enabled = next.accepts_load();
        if enabled != current.accepts_load() {
            self.emit(PageEvent::LoadButtonEnabled { enabled });
        }
        Ok(())
    }

    fn set_status(&self, text: impl Into<String>) {
        let text = text.into();
        *self.status.borrow_mut() = text.clone();
        self.emit(PageEvent::StatusChanged { text });
    }

    /// Validate the URL input and start a load
    pub fn request_load(&self, input: &str) -> Result<Url> {
        let input = input.trim();
        if input.is_empty() {
            self.show_error("Please enter a stream URL");
            return Err(Error::InvalidUrl("empty input".into()));
        }

        let url = match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                let err = Error::InvalidUrl(format!("unsupported scheme '{}'", url.scheme()));
                self.show_error(&err.to_string());
                return Err(err);
            }
            Err(e) => {
                let err = Error::from(e);
                self.show_error(&err.to_string());
                return Err(err);
            }
        };

        if !self.state.get().accepts_load() {
            return Err(Error::InvalidConfig("a stream is already loading".into()));
        }

        self.clear_error();
        self.set_state(PageState::Loading)?;
        *self.current_url.borrow_mut() = Some(url.clone());

        info!(url = %url, "Loading stream");
        self.set_status(format!("Loading {}", url));
        // The adapter may report ready synchronously from this event
        self.emit(PageEvent::LoadRequested {
            url: url.to_string(),
        });
        Ok(url)
    }

    /// The playback library attached the stream and can play
    pub fn media_ready(&self) -> Result<()> {
        self.set_state(PageState::Ready)?;
        self.set_status("Ready");
        Ok(())
    }

    pub fn playback_started(&self, by_gesture: bool) -> Result<()> {
        self.set_state(PageState::Playing)?;
        self.set_status(if by_gesture { "Playing" } else { "Playing (autoplay)" });
        Ok(())
    }

    /// Autoplay exhausted; the play prompt is waiting
    pub fn awaiting_gesture(&self) {
        self.set_status("Click to play");
    }

    /// Error reported by the playback library
    pub fn player_error(&self, message: &str, fatal: bool) {
        warn!(error = message, fatal, "Player error");
        self.show_error(message);

        if fatal {
            let _ = self.set_state(PageState::Failed);
            self.set_status("Playback failed");
        }
    }

    pub fn clear_error(&self) {
        if self.error.borrow_mut().take().is_some() {
            self.emit(PageEvent::ErrorCleared);
        }
    }

    fn show_error(&self, message: &str) {
        *self.error.borrow_mut() = Some(message.to_string());
        self.emit(PageEvent::ErrorShown {
            message: message.to_string(),
        });
    }
}

impl Default for PageSession {
    fn default() -> Self {
        Self::new()
    }
}
