//! Autoplay Sequencer - escalating fallback for blocked autoplay
//!
//! Coordinates:
//! - One-time support probe (memoized, diagnostic only)
//! - Immediate, delayed and gesture-gated play attempts, strictly in order
//! - State machine transitions and observer notification

use crate::{
    config::SequencerConfig,
    intent::AutoplayIntent,
    media::{AutoplayProbe, GestureSurface, MediaHandle, ProbeAttempt, Runtime},
    strategy::{StrategyKind, StrategyList},
    types::{SequencerState, SupportVerdict},
    Error,
};
use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// Events delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequencerEvent {
    Transition {
        from: SequencerState,
        to: SequencerState,
    },
    VerdictCached {
        verdict: SupportVerdict,
    },
    AttemptFailed {
        strategy: StrategyKind,
        attempt: u32,
        code: &'static str,
        message: String,
    },
    PromptMounted,
    PromptDismissed,
}

type Observer = Box<dyn Fn(&SequencerEvent)>;

#[derive(Default)]
struct Observers(RefCell<Vec<Observer>>);

impl Observers {
    fn notify(&self, event: SequencerEvent) {
        for observer in self.0.borrow().iter() {
            observer(&event);
        }
    }
}

/// Result of one escalation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationOutcome {
    /// False when autoplay was not requested
    pub attempted: bool,
    /// Playback started without a user gesture
    pub started: bool,
    /// Strategy that started playback
    pub strategy: Option<StrategyKind>,
    /// Play calls made before the run settled
    pub attempts: u32,
    /// Cached probe verdict at the end of the run
    pub verdict: SupportVerdict,
    pub final_state: SequencerState,
    /// A play prompt is waiting for the user
    pub prompt_mounted: bool,
}

impl EscalationOutcome {
    fn not_attempted(verdict: SupportVerdict) -> Self {
        Self {
            attempted: false,
            started: false,
            strategy: None,
            attempts: 0,
            verdict,
            final_state: SequencerState::Idle,
            prompt_mounted: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

/// Per-run state machine
struct Escalation {
    state: Cell<SequencerState>,
    attempts: Cell<u32>,
    observers: Rc<Observers>,
}

impl Escalation {
    fn new(observers: Rc<Observers>) -> Self {
        Self {
            state: Cell::new(SequencerState::Idle),
            attempts: Cell::new(0),
            observers,
        }
    }

    fn state(&self) -> SequencerState {
        self.state.get()
    }

    fn advance(&self, next: SequencerState) {
        let current = self.state.get();

        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Rejected escalation transition");
            return;
        }

        self.state.set(next);
        debug!(from = %current, to = %next, "Escalation transition");
        self.observers.notify(SequencerEvent::Transition {
            from: current,
            to: next,
        });
    }

    fn next_attempt(&self) -> u32 {
        let n = self.attempts.get() + 1;
        self.attempts.set(n);
        n
    }
}

/// Autoplay fallback sequencer, one per page
pub struct AutoplaySequencer {
    config: SequencerConfig,
    strategies: StrategyList,
    runtime: Rc<dyn Runtime>,
    probe: Rc<dyn AutoplayProbe>,
    verdict: Rc<Cell<SupportVerdict>>,
    probe_task: RefCell<Option<Shared<LocalBoxFuture<'static, SupportVerdict>>>>,
    prompt: PromptSlot,
    observers: Rc<Observers>,
}

/// The play prompt currently mounted, if any
type PromptSlot = Rc<RefCell<Option<Rc<dyn GestureSurface>>>>;

fn same_surface(a: &Rc<dyn GestureSurface>, b: &Rc<dyn GestureSurface>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl AutoplaySequencer {
    /// Create a new sequencer
    pub fn new(
        config: SequencerConfig,
        runtime: Rc<dyn Runtime>,
        probe: Rc<dyn AutoplayProbe>,
    ) -> Self {
        Self {
            config,
            strategies: StrategyList::new(),
            runtime,
            probe,
            verdict: Rc::new(Cell::new(SupportVerdict::Unknown)),
            probe_task: RefCell::new(None),
            prompt: Rc::new(RefCell::new(None)),
            observers: Rc::new(Observers::default()),
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyList {
        &self.strategies
    }

    /// Cached verdict without probing
    pub fn verdict(&self) -> SupportVerdict {
        self.verdict.get()
    }

    /// Register an observer for sequencer events
    pub fn subscribe(&self, observer: impl Fn(&SequencerEvent) + 'static) {
        self.observers.0.borrow_mut().push(Box::new(observer));
    }

    /// Whether a play prompt from an earlier run is still waiting
    pub fn has_prompt(&self) -> bool {
        self.prompt.borrow().is_some()
    }

    /// Remove a play prompt left by an earlier run, e.g. when a new stream
    /// is loaded. No-op when none is mounted.
    pub fn dismiss_prompt(&self) -> bool {
        let Some(surface) = self.prompt.borrow_mut().take() else {
            return false;
        };

        surface.dismiss();
        debug!("Stale play prompt removed");
        true
    }

    /// Probe unattended playback once and cache the verdict
    pub async fn detect_support(&self) -> SupportVerdict {
        let cached = self.verdict.get();
        if cached.is_known() {
            return cached;
        }

        // Concurrent callers share the one in-flight probe
        let task = self
            .probe_task
            .borrow_mut()
            .get_or_insert_with(|| {
                let probe = self.probe.clone();
                let verdict = self.verdict.clone();
                let observers = self.observers.clone();

                async move {
                    let result = match probe.attempt().await {
                        Ok(ProbeAttempt::Resolved) => SupportVerdict::Supported,
                        Ok(ProbeAttempt::NoPendingResult) => {
                            debug!(code = Error::ProbeInconclusive.error_code(), "Probe had no pending result");
                            SupportVerdict::Unsupported
                        }
                        Err(e) => {
                            debug!(error = %e, code = e.error_code(), "Probe rejected");
                            SupportVerdict::Unsupported
                        }
                    };

                    verdict.set(result);
                    observers.notify(SequencerEvent::VerdictCached { verdict: result });
                    result
                }
                .boxed_local()
                .shared()
            })
            .clone();

        task.await
    }

    /// Try every strategy in order until playback starts or the prompt is up
    #[instrument(skip(self, media))]
    pub async fn run_escalation(
        &self,
        media: Rc<dyn MediaHandle>,
        intent: AutoplayIntent,
    ) -> EscalationOutcome {
        if !intent.autoplay {
            debug!("Autoplay not requested");
            return EscalationOutcome::not_attempted(self.verdict.get());
        }

        if let Some(muted) = intent.desired_muted() {
            media.set_muted(muted);
        }

        let run = Rc::new(Escalation::new(self.observers.clone()));

        run.advance(SequencerState::ProbingSupport);
        let verdict = self.detect_support().await;
        info!(verdict = %verdict, muted = media.muted(), "Starting autoplay escalation");

        let mut escalated = false;

        for strategy in self.strategies.iter() {
            if strategy == StrategyKind::Delayed && self.config.retry_delays_ms.is_empty() {
                continue;
            }

            if escalated {
                self.runtime.sleep(self.config.step_pause()).await;
            }
            escalated = true;

            let started = match strategy {
                StrategyKind::Immediate => {
                    run.advance(SequencerState::AttemptingImmediate);
                    self.attempt(&run, media.as_ref(), strategy).await
                }
                StrategyKind::Delayed => self.run_delayed(&run, media.as_ref()).await,
                StrategyKind::GesturePrompt => {
                    run.advance(SequencerState::AwaitingGesture);
                    let mounted = self.mount_prompt(&run, media.clone());
                    run.advance(SequencerState::Exhausted);

                    info!(prompt_mounted = mounted, attempts = run.attempts.get(), "Autoplay exhausted");
                    return EscalationOutcome {
                        attempted: true,
                        started: false,
                        strategy: None,
                        attempts: run.attempts.get(),
                        verdict,
                        final_state: run.state(),
                        prompt_mounted: mounted,
                    };
                }
            };

            if started {
                run.advance(SequencerState::Succeeded);
                info!(strategy = %strategy, attempts = run.attempts.get(), "Autoplay started");
                return EscalationOutcome {
                    attempted: true,
                    started: true,
                    strategy: Some(strategy),
                    attempts: run.attempts.get(),
                    verdict,
                    final_state: run.state(),
                    prompt_mounted: false,
                };
            }
        }

        // Unreachable with the fixed list; the prompt strategy always returns
        EscalationOutcome {
            attempted: true,
            started: false,
            strategy: None,
            attempts: run.attempts.get(),
            verdict,
            final_state: run.state(),
            prompt_mounted: false,
        }
    }

    /// Run the escalation after the configured ready delay
    pub async fn run_when_ready(
        &self,
        media: Rc<dyn MediaHandle>,
        intent: AutoplayIntent,
    ) -> EscalationOutcome {
        self.runtime.sleep(self.config.ready_delay()).await;
        self.run_escalation(media, intent).await
    }

    /// Schedule an escalation for media that just became ready
    pub fn on_ready(
        self: &Rc<Self>,
        media: Rc<dyn MediaHandle>,
        intent: AutoplayIntent,
    ) -> oneshot::Receiver<EscalationOutcome> {
        let (tx, rx) = oneshot::channel();
        let this = self.clone();

        self.runtime.spawn_local(
            async move {
                let outcome = this.run_when_ready(media, intent).await;
                let _ = tx.send(outcome);
            }
            .boxed_local(),
        );

        rx
    }

    async fn attempt(&self, run: &Escalation, media: &dyn MediaHandle, strategy: StrategyKind) -> bool {
        let attempt = run.next_attempt();

        match media.play().await {
            Ok(()) => true,
            Err(e) => {
                debug!(strategy = %strategy, attempt, error = %e, "Play attempt failed");
                run.observers.notify(SequencerEvent::AttemptFailed {
                    strategy,
                    attempt,
                    code: e.error_code(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    async fn run_delayed(&self, run: &Escalation, media: &dyn MediaHandle) -> bool {
        for (index, delay) in self.config.retry_delays().enumerate() {
            run.advance(SequencerState::AttemptingDelayed(index as u32 + 1));
            self.runtime.sleep(delay).await;

            if self.attempt(run, media, StrategyKind::Delayed).await {
                return true;
            }
        }
        false
    }

    fn mount_prompt(&self, run: &Rc<Escalation>, media: Rc<dyn MediaHandle>) -> bool {
        let surface = match media.mount_gesture_prompt() {
            Ok(surface) => surface,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Could not mount play prompt");
                return false;
            }
        };

        // One prompt per container at a time
        self.dismiss_prompt();
        *self.prompt.borrow_mut() = Some(surface.clone());

        self.observers.notify(SequencerEvent::PromptMounted);
        self.runtime.spawn_local(
            watch_gesture(run.clone(), media, surface, self.prompt.clone()).boxed_local(),
        );
        true
    }
}

/// Play on each user activation until one succeeds, then remove the prompt
async fn watch_gesture(
    run: Rc<Escalation>,
    media: Rc<dyn MediaHandle>,
    surface: Rc<dyn GestureSurface>,
    slot: PromptSlot,
) {
    while surface.next_activation().await.is_some() {
        let attempt = run.next_attempt();

        match media.play().await {
            Ok(()) => {
                let mut current = slot.borrow_mut();
                if current.as_ref().is_some_and(|c| same_surface(c, &surface)) {
                    current.take();
                }
                drop(current);

                surface.dismiss();
                run.observers.notify(SequencerEvent::PromptDismissed);
                run.advance(SequencerState::Succeeded);
                info!(attempt, "Playback started from play prompt");
                return;
            }
            Err(e) => {
                let err = Error::GestureAttemptFailed(e.to_string());
                warn!(error = %err, "Play prompt attempt failed");
                run.observers.notify(SequencerEvent::AttemptFailed {
                    strategy: StrategyKind::GesturePrompt,
                    attempt,
                    code: err.error_code(),
                    message: err.to_string(),
                });
            }
        }
    }

    debug!("Play prompt closed without playback");
}
