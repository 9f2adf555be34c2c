//! CLI command implementations

use crate::output::{to_json, to_json_line, OutputFormat};
use anyhow::Context;
use autoplay_core::scripted::{MediaCall, PlayOutcome, ProbeOutcome, ScriptedMedia, ScriptedProbe};
use autoplay_core::{
    AutoplayIntent, AutoplaySequencer, EscalationOutcome, MediaHandle, SequencerConfig,
    SequencerEvent, TokioRuntime,
};
use serde::Serialize;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use url::Url;

/// Inputs of a simulated escalation
pub struct SimulateArgs {
    pub probe: String,
    pub outcomes: String,
    pub gesture_outcomes: String,
    pub autoplay: String,
    pub unmute: Option<String>,
    pub muted: bool,
    pub config: Option<PathBuf>,
    pub preset: String,
    pub realtime: bool,
}

#[derive(Serialize)]
struct TraceEntry {
    at_ms: u128,
    #[serde(flatten)]
    event: SequencerEvent,
}

#[derive(Serialize)]
struct SimulationReport {
    intent: AutoplayIntent,
    config: SequencerConfig,
    outcome: EscalationOutcome,
    calls: Vec<MediaCall>,
    gestures: usize,
    prompt_removed: bool,
    elapsed_ms: u128,
    trace: Vec<TraceEntry>,
}

/// Run the sequencer against scripted media and print the trace
pub async fn simulate(args: SimulateArgs, format: &str) -> anyhow::Result<()> {
    let report = run_simulation(args).await?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

async fn run_simulation(args: SimulateArgs) -> anyhow::Result<SimulationReport> {
    if !args.realtime {
        tokio::time::pause();
    }

    let config = load_config(args.config.as_ref(), &args.preset)?;
    let probe: ProbeOutcome = args.probe.parse()?;
    let outcomes = PlayOutcome::parse_list(&args.outcomes)?;
    let gestures = PlayOutcome::parse_list(&args.gesture_outcomes)?;

    let mut query = format!("autoplay={}", args.autoplay);
    if let Some(unmute) = &args.unmute {
        query.push_str(&format!("&unmute={}", unmute));
    }
    let intent = AutoplayIntent::from_query(&query);

    let media = Rc::new(ScriptedMedia::new(args.muted, outcomes));
    let sequencer = AutoplaySequencer::new(
        config.clone(),
        Rc::new(TokioRuntime),
        Rc::new(ScriptedProbe::new(probe)),
    );

    let start = Instant::now();
    let trace = Rc::new(RefCell::new(Vec::new()));
    let sink = trace.clone();
    sequencer.subscribe(move |event| {
        sink.borrow_mut().push(TraceEntry {
            at_ms: start.elapsed().as_millis(),
            event: event.clone(),
        });
    });

    info!(?intent, "Simulating autoplay escalation");
    let handle: Rc<dyn MediaHandle> = media.clone();
    let outcome = sequencer.run_when_ready(handle, intent).await;

    let mut prompt_removed = false;
    if let Some(prompt) = media.prompts().first() {
        for gesture in &gestures {
            media.push_outcomes([*gesture]);
            if !prompt.activate() {
                break;
            }
            // Let the prompt watcher handle the activation
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        prompt_removed = !prompt.is_mounted();
    }

    Ok(SimulationReport {
        intent,
        config,
        outcome,
        calls: media.calls(),
        gestures: gestures.len(),
        prompt_removed,
        elapsed_ms: start.elapsed().as_millis(),
        trace: trace.take(),
    })
}

fn print_report(report: &SimulationReport) {
    println!("Autoplay simulation");
    println!("  Intent: autoplay={} unmute={:?}", report.intent.autoplay, report.intent.unmute);
    println!("  Retry delays: {:?} ms", report.config.retry_delays_ms);

    println!("\nTrace:");
    for entry in &report.trace {
        println!("  {:>6}ms  {}", entry.at_ms, to_json_line(&entry.event));
    }

    println!("\nMedia calls:");
    for (i, call) in report.calls.iter().enumerate() {
        println!("  {}. {:?}", i + 1, call);
    }

    let outcome = &report.outcome;
    println!("\nOutcome:");
    println!("  Attempted: {}", outcome.attempted);
    println!("  Started: {}", outcome.started);
    if let Some(strategy) = outcome.strategy {
        println!("  Strategy: {}", strategy);
    }
    println!("  Attempts: {}", outcome.attempts);
    println!("  Verdict: {}", outcome.verdict);
    println!("  Final state: {}", outcome.final_state);
    if outcome.prompt_mounted {
        println!("  Play prompt: mounted, removed after gestures: {}", report.prompt_removed);
    }
    println!("  Elapsed: {}ms", report.elapsed_ms);
}

/// Print the intent carried by a page URL
pub fn intent(url: &str, format: &str) -> anyhow::Result<()> {
    let url = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    let intent = AutoplayIntent::from_url(&url);

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&intent)),
        OutputFormat::Text => {
            println!("Intent for {}", url);
            println!("  Autoplay: {}", intent.autoplay);
            match intent.desired_muted() {
                Some(true) => println!("  Mute: forced muted"),
                Some(false) => println!("  Mute: unmuted before first attempt"),
                None => println!("  Mute: left as is"),
            }
        }
    }

    Ok(())
}

/// Print a config preset or a validated config file
pub fn config(preset: &str, file: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = load_config(file, preset)?;
    println!("{}", config.to_json());
    Ok(())
}

fn load_config(file: Option<&PathBuf>, preset: &str) -> anyhow::Result<SequencerConfig> {
    if let Some(path) = file {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(SequencerConfig::from_json(&json)?);
    }

    match preset {
        "default" => Ok(SequencerConfig::default()),
        "aggressive" => Ok(SequencerConfig::aggressive()),
        other => anyhow::bail!("unknown preset '{}' (default, aggressive)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(outcomes: &str, gestures: &str) -> SimulateArgs {
        SimulateArgs {
            probe: "blocked".into(),
            outcomes: outcomes.into(),
            gesture_outcomes: gestures.into(),
            autoplay: "true".into(),
            unmute: Some("false".into()),
            muted: false,
            config: None,
            preset: "default".into(),
            realtime: false,
        }
    }

    #[test]
    fn test_load_config_presets() {
        assert_eq!(load_config(None, "default").unwrap(), SequencerConfig::default());
        assert_eq!(load_config(None, "aggressive").unwrap(), SequencerConfig::aggressive());
        assert!(load_config(None, "turbo").is_err());
    }

    async fn run(args: SimulateArgs) -> anyhow::Result<SimulationReport> {
        tokio::task::LocalSet::new()
            .run_until(run_simulation(args))
            .await
    }

    #[tokio::test]
    async fn test_simulate_exhausts_then_plays_on_gesture() {
        let report = run(args("blocked", "blocked,ok")).await.unwrap();

        assert!(report.outcome.attempted);
        assert!(!report.outcome.started);
        assert!(report.outcome.prompt_mounted);
        assert_eq!(report.outcome.attempts, 4);
        assert!(report.prompt_removed);
        assert_eq!(report.gestures, 2);

        let plays = report
            .calls
            .iter()
            .filter(|c| matches!(c, MediaCall::Play { .. }))
            .count();
        assert_eq!(plays, 6);
        assert_eq!(report.calls[0], MediaCall::SetMuted { muted: true });
        assert_eq!(
            report.calls.iter().filter(|c| **c == MediaCall::MountPrompt).count(),
            1
        );

        let dismissed = report
            .trace
            .iter()
            .filter(|e| e.event == SequencerEvent::PromptDismissed)
            .count();
        assert_eq!(dismissed, 1);

        // 100 ready delay + 500 + 1000 + 2000 + 3000 + 500, then two gestures
        assert!(report.elapsed_ms >= 7100, "{}", report.elapsed_ms);
    }

    #[tokio::test]
    async fn test_simulate_without_gestures_leaves_prompt() {
        let report = run(args("blocked", "")).await.unwrap();

        assert!(report.outcome.prompt_mounted);
        assert!(!report.prompt_removed);
        assert_eq!(report.calls.iter().filter(|c| matches!(c, MediaCall::Play { .. })).count(), 4);
    }

    #[tokio::test]
    async fn test_simulate_prints_json_report() {
        tokio::task::LocalSet::new()
            .run_until(simulate(args("blocked,ok", ""), "json"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_simulate_rejects_unknown_outcome() {
        let result = tokio::task::LocalSet::new()
            .run_until(simulate(args("maybe", ""), "text"))
            .await;
        assert!(result.is_err());
    }
}
