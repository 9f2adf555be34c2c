//! Integration tests for Kino Autoplay Core

use autoplay_core::scripted::{MediaCall, PlayOutcome, ProbeOutcome, ScriptedMedia, ScriptedProbe};
use autoplay_core::scripted::PlayOutcome::{Blocked, Ok as Play};
use async_trait::async_trait;
use autoplay_core::{
    AutoplayIntent, AutoplayProbe, AutoplaySequencer, MediaHandle, ProbeAttempt, Runtime,
    SequencerConfig, SequencerEvent, SequencerState, StrategyKind, SupportVerdict,
};
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// Harness
// =============================================================================

struct TestRuntime;

impl Runtime for TestRuntime {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

/// Probe whose play promise takes a while to settle
#[derive(Default)]
struct SlowProbe {
    runs: Cell<u32>,
}

#[async_trait(?Send)]
impl AutoplayProbe for SlowProbe {
    async fn attempt(&self) -> autoplay_core::Result<ProbeAttempt> {
        self.runs.set(self.runs.get() + 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(ProbeAttempt::Resolved)
    }
}

struct Fixture {
    sequencer: Rc<AutoplaySequencer>,
    probe: Rc<ScriptedProbe>,
    events: Rc<RefCell<Vec<SequencerEvent>>>,
}

impl Fixture {
    fn new(probe: ProbeOutcome) -> Self {
        Self::with_config(probe, SequencerConfig::default())
    }

    fn with_config(probe: ProbeOutcome, config: SequencerConfig) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let probe = Rc::new(ScriptedProbe::new(probe));
        let sequencer = Rc::new(AutoplaySequencer::new(
            config,
            Rc::new(TestRuntime),
            probe.clone(),
        ));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        sequencer.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        Self {
            sequencer,
            probe,
            events,
        }
    }

    fn transitions(&self) -> Vec<SequencerState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SequencerEvent::Transition { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn count(&self, event: &SequencerEvent) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }
}

async fn local<F: Future>(f: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(f).await
}

fn media(muted: bool, outcomes: &[PlayOutcome]) -> Rc<ScriptedMedia> {
    Rc::new(ScriptedMedia::new(muted, outcomes.iter().copied()))
}

fn as_handle(media: &Rc<ScriptedMedia>) -> Rc<dyn MediaHandle> {
    media.clone()
}

fn autoplay(unmute: Option<bool>) -> AutoplayIntent {
    AutoplayIntent::new(true, unmute)
}

// =============================================================================
// Preconditions
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_not_requested_is_a_no_op() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[Play]);
        let start = Instant::now();

        let intent = AutoplayIntent::from_query("?autoplay=yes&unmute=true");
        let outcome = fx.sequencer.run_escalation(as_handle(&media), intent).await;

        assert!(!outcome.attempted);
        assert!(!outcome.is_started());
        assert_eq!(outcome.final_state, SequencerState::Idle);
        assert!(media.calls().is_empty());
        assert!(media.muted());
        assert_eq!(fx.probe.runs(), 0);
        assert!(fx.events.borrow().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    })
    .await;
}

// =============================================================================
// Support probe
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_probe_is_memoized() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        assert_eq!(fx.sequencer.verdict(), SupportVerdict::Unknown);

        for _ in 0..5 {
            assert_eq!(fx.sequencer.detect_support().await, SupportVerdict::Supported);
        }

        assert_eq!(fx.probe.runs(), 1);
        assert_eq!(
            fx.count(&SequencerEvent::VerdictCached {
                verdict: SupportVerdict::Supported
            }),
            1
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_probe() {
    local(async {
        let probe = Rc::new(SlowProbe::default());
        let sequencer = AutoplaySequencer::new(
            SequencerConfig::default(),
            Rc::new(TestRuntime),
            probe.clone(),
        );
        let start = Instant::now();

        let verdicts = futures::join!(
            sequencer.detect_support(),
            sequencer.detect_support(),
            sequencer.detect_support(),
        );

        assert_eq!(
            verdicts,
            (SupportVerdict::Supported, SupportVerdict::Supported, SupportVerdict::Supported)
        );
        assert_eq!(probe.runs.get(), 1);
        assert_eq!(sequencer.verdict(), SupportVerdict::Supported);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(100), "{:?}", elapsed);

        assert_eq!(sequencer.detect_support().await, SupportVerdict::Supported);
        assert_eq!(probe.runs.get(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_probe_without_pending_result_is_unsupported() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::NoPendingResult);
        assert_eq!(fx.sequencer.detect_support().await, SupportVerdict::Unsupported);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_verdict_does_not_gate_escalation() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        assert_eq!(fx.sequencer.detect_support().await, SupportVerdict::Unsupported);

        let media = media(true, &[Play]);
        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert!(outcome.started);
        assert_eq!(outcome.strategy, Some(StrategyKind::Immediate));
        assert_eq!(outcome.verdict, SupportVerdict::Unsupported);
        assert_eq!(media.play_count(), 1);
        assert_eq!(fx.probe.runs(), 1);
    })
    .await;
}

// =============================================================================
// Escalation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_immediate_success_skips_later_strategies() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[Play]);
        let start = Instant::now();

        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert!(outcome.started);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.final_state, SequencerState::Succeeded);
        assert!(!media.calls().contains(&MediaCall::MountPrompt));
        assert!(media.prompts().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(
            fx.transitions(),
            vec![
                SequencerState::ProbingSupport,
                SequencerState::AttemptingImmediate,
                SequencerState::Succeeded,
            ]
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_all_strategies_fail_mounts_one_prompt() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        let media = media(true, &[]);

        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert!(outcome.attempted);
        assert!(!outcome.started);
        assert!(outcome.prompt_mounted);
        assert_eq!(outcome.final_state, SequencerState::Exhausted);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(media.play_count(), 4);
        assert_eq!(media.prompts().len(), 1);
        assert_eq!(media.mounted_prompts(), 1);
        assert_eq!(fx.count(&SequencerEvent::PromptMounted), 1);
        assert_eq!(
            fx.transitions(),
            vec![
                SequencerState::ProbingSupport,
                SequencerState::AttemptingImmediate,
                SequencerState::AttemptingDelayed(1),
                SequencerState::AttemptingDelayed(2),
                SequencerState::AttemptingDelayed(3),
                SequencerState::AwaitingGesture,
                SequencerState::Exhausted,
            ]
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_waits_follow_backoff_and_step_pauses() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[]);
        let start = Instant::now();

        fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        // 500 pause + 1000 + 2000 + 3000 + 500 pause
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(7000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(7100), "{:?}", elapsed);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_delayed_success_short_circuits_remaining_delays() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[Blocked, Blocked, Play]);
        let start = Instant::now();

        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert!(outcome.started);
        assert_eq!(outcome.strategy, Some(StrategyKind::Delayed));
        assert_eq!(media.play_count(), 3);
        assert!(media.prompts().is_empty());
        assert!(!fx.transitions().contains(&SequencerState::AttemptingDelayed(3)));

        // 500 pause + 1000 + 2000, no 3000 wait
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3500), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3600), "{:?}", elapsed);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_no_retry_delays_goes_straight_to_prompt() {
    local(async {
        let config = SequencerConfig {
            retry_delays_ms: vec![],
            ..Default::default()
        };
        let fx = Fixture::with_config(ProbeOutcome::Resolved, config);
        let media = media(true, &[]);

        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert_eq!(media.play_count(), 1);
        assert!(outcome.prompt_mounted);
        assert_eq!(
            fx.transitions(),
            vec![
                SequencerState::ProbingSupport,
                SequencerState::AttemptingImmediate,
                SequencerState::AwaitingGesture,
                SequencerState::Exhausted,
            ]
        );
    })
    .await;
}

// =============================================================================
// Mute intent
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unmute_applied_before_first_play() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[Play]);

        let intent = AutoplayIntent::from_query("autoplay=true&unmute=true");
        fx.sequencer.run_escalation(as_handle(&media), intent).await;

        assert_eq!(
            media.calls(),
            vec![
                MediaCall::SetMuted { muted: false },
                MediaCall::Play { muted: false },
            ]
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_mute_forced_before_first_play() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(false, &[Play]);

        let intent = AutoplayIntent::from_query("autoplay=true&unmute=false");
        fx.sequencer.run_escalation(as_handle(&media), intent).await;

        assert_eq!(
            media.calls(),
            vec![
                MediaCall::SetMuted { muted: true },
                MediaCall::Play { muted: true },
            ]
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_unspecified_mute_left_alone() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(false, &[Play]);

        fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        assert_eq!(media.calls(), vec![MediaCall::Play { muted: false }]);
    })
    .await;
}

// =============================================================================
// Play prompt
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_gesture_success_removes_prompt_once() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        let media = media(true, &[]);

        let outcome = fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;
        assert!(!outcome.started);

        let prompt = media.prompts().remove(0);
        assert!(prompt.is_mounted());

        media.push_outcomes([Play]);
        assert!(prompt.activate());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(prompt.dismissals(), 1);
        assert!(!prompt.is_mounted());
        assert!(!prompt.activate());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(prompt.dismissals(), 1);
        assert_eq!(media.play_count(), 5);
        assert_eq!(fx.count(&SequencerEvent::PromptDismissed), 1);
        assert_eq!(fx.transitions().last(), Some(&SequencerState::Succeeded));

        assert!(!fx.sequencer.has_prompt());
        assert!(!fx.sequencer.dismiss_prompt());
        assert_eq!(prompt.dismissals(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_prompt_removes_stale_prompt() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        let media = media(true, &[]);

        fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;
        let prompt = media.prompts().remove(0);
        assert!(fx.sequencer.has_prompt());

        assert!(fx.sequencer.dismiss_prompt());
        assert!(!prompt.is_mounted());
        assert_eq!(prompt.dismissals(), 1);
        assert!(!fx.sequencer.has_prompt());
        assert!(!fx.sequencer.dismiss_prompt());

        // A removed prompt no longer plays on activation
        assert!(!prompt.activate());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(media.play_count(), 4);
        assert_eq!(fx.count(&SequencerEvent::PromptDismissed), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_second_exhausted_run_replaces_prompt() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        let media = media(true, &[]);

        fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;
        fx.sequencer.run_escalation(as_handle(&media), autoplay(None)).await;

        let prompts = media.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].dismissals(), 1);
        assert!(prompts[1].is_mounted());
        assert_eq!(media.mounted_prompts(), 1);
        assert_eq!(fx.count(&SequencerEvent::PromptMounted), 2);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_gesture_keeps_prompt() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Rejected);
        let media = media(true, &[]);

        fx.sequencer.run_escalation(as_handle(&media), autoplay(Some(true))).await;
        let prompt = media.prompts().remove(0);

        media.push_outcomes([Blocked]);
        prompt.activate();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(prompt.is_mounted());
        assert_eq!(fx.transitions().last(), Some(&SequencerState::Exhausted));
        let gesture_failures = fx
            .events
            .borrow()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SequencerEvent::AttemptFailed {
                        strategy: StrategyKind::GesturePrompt,
                        code: "GESTURE_FAILED",
                        ..
                    }
                )
            })
            .count();
        assert_eq!(gesture_failures, 1);

        media.push_outcomes([Play]);
        prompt.activate();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!prompt.is_mounted());
        assert_eq!(prompt.dismissals(), 1);
        assert_eq!(media.mounted_prompts(), 0);
    })
    .await;
}

// =============================================================================
// Ready hook
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_on_ready_waits_before_first_attempt() {
    local(async {
        let fx = Fixture::new(ProbeOutcome::Resolved);
        let media = media(true, &[Play]);
        let start = Instant::now();

        let pending = fx.sequencer.on_ready(as_handle(&media), autoplay(None));
        assert_eq!(media.play_count(), 0);

        let outcome = pending.await.expect("escalation dropped");

        assert!(outcome.started);
        assert_eq!(media.play_count(), 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(200), "{:?}", elapsed);
    })
    .await;
}
