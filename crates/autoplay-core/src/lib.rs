//! Kino Autoplay Core - autoplay fallback for browser video pages
//!
//! This crate provides the platform-independent pieces:
//! - Autoplay support probing (memoized)
//! - Escalating play strategies: immediate, delayed retries, play prompt
//! - Escalation state machine with observer events
//! - Intent parsing from page query parameters
//! - Page session state behind the player controls
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Kino Autoplay Core                     │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                           │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//! │  │    Intent    │   │    Probe     │   │   Strategy   │   │
//! │  │    Parser    │   │   (cached)   │   │     List     │   │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘   │
//! │         └──────────────────┼──────────────────┘           │
//! │                     ┌──────┴──────┐                       │
//! │                     │  Autoplay   │                       │
//! │                     │  Sequencer  │                       │
//! │                     └──────┬──────┘                       │
//! │         ┌──────────────────┼──────────────────┐           │
//! │  ┌──────┴───────┐   ┌──────┴──────┐   ┌───────┴──────┐    │
//! │  │ MediaHandle  │   │   Runtime   │   │   Gesture    │    │
//! │  │   (trait)    │   │   (trait)   │   │   Surface    │    │
//! │  └──────────────┘   └─────────────┘   └──────────────┘    │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod media;
pub mod scripted;
pub mod sequencer;
pub mod session;
pub mod strategy;
pub mod types;

#[cfg(feature = "tokio")]
pub mod runtime;

pub use config::SequencerConfig;
pub use error::{Error, Result};
pub use intent::AutoplayIntent;
pub use media::{AutoplayProbe, GestureSurface, MediaHandle, ProbeAttempt, Runtime};
pub use sequencer::{AutoplaySequencer, EscalationOutcome, SequencerEvent};
pub use session::{PageEvent, PageSession, PageState};
pub use strategy::{StrategyKind, StrategyList};
pub use types::{SequencerState, SupportVerdict};

#[cfg(feature = "tokio")]
pub use runtime::TokioRuntime;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Kino Autoplay initialized");
}
