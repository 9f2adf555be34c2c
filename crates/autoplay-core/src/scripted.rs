//! Scripted media doubles for dry runs and tests
//!
//! `ScriptedMedia` answers `play()` from a queue of outcomes and records every
//! call it receives, so escalation order and side effects can be inspected.

use crate::{
    media::{AutoplayProbe, GestureSurface, MediaHandle, ProbeAttempt},
    Error, Result,
};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::str::FromStr;

/// Scripted result of a single play call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOutcome {
    Ok,
    Blocked,
    Failed,
}

impl PlayOutcome {
    fn into_result(self) -> Result<()> {
        match self {
            PlayOutcome::Ok => Ok(()),
            PlayOutcome::Blocked => Err(Error::blocked("NotAllowedError")),
            PlayOutcome::Failed => Err(Error::playback("NotSupportedError")),
        }
    }

    /// Parse a comma separated list such as `blocked,blocked,ok`
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for PlayOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ok" | "play" => Ok(PlayOutcome::Ok),
            "blocked" => Ok(PlayOutcome::Blocked),
            "failed" | "error" => Ok(PlayOutcome::Failed),
            other => Err(Error::InvalidConfig(format!("unknown play outcome '{}'", other))),
        }
    }
}

/// A call observed by [`ScriptedMedia`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum MediaCall {
    SetMuted { muted: bool },
    Play { muted: bool },
    MountPrompt,
}

/// Media handle answering from a script
pub struct ScriptedMedia {
    muted: Cell<bool>,
    outcomes: RefCell<VecDeque<PlayOutcome>>,
    calls: RefCell<Vec<MediaCall>>,
    prompts: RefCell<Vec<Rc<ScriptedPrompt>>>,
}

impl ScriptedMedia {
    /// Unscripted calls beyond the queue are blocked
    pub fn new(muted: bool, outcomes: impl IntoIterator<Item = PlayOutcome>) -> Self {
        Self {
            muted: Cell::new(muted),
            outcomes: RefCell::new(outcomes.into_iter().collect()),
            calls: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Queue outcomes for later calls, e.g. gesture-triggered ones
    pub fn push_outcomes(&self, outcomes: impl IntoIterator<Item = PlayOutcome>) {
        self.outcomes.borrow_mut().extend(outcomes);
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.borrow().clone()
    }

    pub fn play_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, MediaCall::Play { .. }))
            .count()
    }

    /// Prompts mounted so far, in order
    pub fn prompts(&self) -> Vec<Rc<ScriptedPrompt>> {
        self.prompts.borrow().clone()
    }

    pub fn mounted_prompts(&self) -> usize {
        self.prompts.borrow().iter().filter(|p| p.is_mounted()).count()
    }
}

#[async_trait(?Send)]
impl MediaHandle for ScriptedMedia {
    fn muted(&self) -> bool {
        self.muted.get()
    }

    fn set_muted(&self, muted: bool) {
        self.calls.borrow_mut().push(MediaCall::SetMuted { muted });
        self.muted.set(muted);
    }

    async fn play(&self) -> Result<()> {
        self.calls.borrow_mut().push(MediaCall::Play {
            muted: self.muted.get(),
        });

        let outcome = self
            .outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(PlayOutcome::Blocked);

        outcome.into_result()
    }

    fn mount_gesture_prompt(&self) -> Result<Rc<dyn GestureSurface>> {
        self.calls.borrow_mut().push(MediaCall::MountPrompt);

        let prompt = Rc::new(ScriptedPrompt::new());
        self.prompts.borrow_mut().push(prompt.clone());
        Ok(prompt)
    }
}

/// Play prompt driven by explicit `activate()` calls
pub struct ScriptedPrompt {
    tx: mpsc::UnboundedSender<()>,
    rx: RefCell<Option<mpsc::UnboundedReceiver<()>>>,
    dismissals: Cell<u32>,
}

impl ScriptedPrompt {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            tx,
            rx: RefCell::new(Some(rx)),
            dismissals: Cell::new(0),
        }
    }

    /// Simulate a click or tap. Returns false once the prompt is gone.
    pub fn activate(&self) -> bool {
        self.tx.unbounded_send(()).is_ok()
    }

    pub fn is_mounted(&self) -> bool {
        self.dismissals.get() == 0
    }

    pub fn dismissals(&self) -> u32 {
        self.dismissals.get()
    }
}

#[async_trait(?Send)]
impl GestureSurface for ScriptedPrompt {
    async fn next_activation(&self) -> Option<()> {
        let mut rx = self.rx.borrow_mut().take()?;
        let next = rx.next().await;
        *self.rx.borrow_mut() = Some(rx);
        next
    }

    fn dismiss(&self) {
        self.dismissals.set(self.dismissals.get() + 1);
        self.tx.close_channel();
    }
}

/// Scripted result of the support probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Resolved,
    NoPendingResult,
    Rejected,
}

impl FromStr for ProbeOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ok" | "resolved" => Ok(ProbeOutcome::Resolved),
            "none" | "sync" => Ok(ProbeOutcome::NoPendingResult),
            "blocked" | "rejected" => Ok(ProbeOutcome::Rejected),
            other => Err(Error::InvalidConfig(format!("unknown probe outcome '{}'", other))),
        }
    }
}

/// Probe that always answers the same way and counts its runs
pub struct ScriptedProbe {
    outcome: ProbeOutcome,
    runs: Cell<u32>,
}

impl ScriptedProbe {
    pub fn new(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            runs: Cell::new(0),
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs.get()
    }
}

#[async_trait(?Send)]
impl AutoplayProbe for ScriptedProbe {
    async fn attempt(&self) -> Result<ProbeAttempt> {
        self.runs.set(self.runs.get() + 1);

        match self.outcome {
            ProbeOutcome::Resolved => Ok(ProbeAttempt::Resolved),
            ProbeOutcome::NoPendingResult => Ok(ProbeAttempt::NoPendingResult),
            ProbeOutcome::Rejected => Err(Error::blocked("NotAllowedError")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome_list() {
        let list = PlayOutcome::parse_list("blocked, failed,ok").unwrap();
        assert_eq!(list, vec![PlayOutcome::Blocked, PlayOutcome::Failed, PlayOutcome::Ok]);
        assert!(PlayOutcome::parse_list("maybe").is_err());
        assert!(PlayOutcome::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_prompt_closes_on_dismiss() {
        let prompt = ScriptedPrompt::new();
        assert!(prompt.activate());
        prompt.dismiss();
        assert!(!prompt.activate());
        assert!(!prompt.is_mounted());
        assert_eq!(prompt.dismissals(), 1);
    }
}
