#![forbid(unsafe_code)]

//! Host suspend/resume with a live mirror, driven through the public engine API.
//!
//! Set `E2E_JSONL=1` to emit one JSON line per step on stderr.

use std::thread;
use std::time::Duration;

use cuecard_core::{PacingConfig, Size};
use cuecard_runtime::{
    Authority, ChannelPlatform, Engine, EngineConfig, EngineEvent, LifecycleState, MirrorIntent,
};
use web_time::Instant;

fn jsonl_enabled() -> bool {
    std::env::var("E2E_JSONL").is_ok() || std::env::var("CI").is_ok()
}

fn log_jsonl(step: &str, fields: &[(&str, String)]) {
    if !jsonl_enabled() {
        return;
    }
    let mut parts = Vec::with_capacity(fields.len() + 1);
    parts.push(format!("\"step\":\"{step}\""));
    parts.extend(fields.iter().map(|(k, v)| format!("\"{k}\":\"{v}\"")));
    eprintln!("{{{}}}", parts.join(","));
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const NOTES: &str = "\
Welcome back.
[time 00:05]
Here is the plan for today and the two things we will ship.

[note slow down here]
Questions later.";

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    done()
}

#[test]
fn continuation_carries_playback_across_suspend() {
    init_tracing();
    let interval = Duration::from_secs(1) / 30;
    let config = EngineConfig::default().with_continuation_interval(interval);
    let (platform, endpoints) = ChannelPlatform::new(Size::new(1920, 1080), 2);
    let mut engine = Engine::new(config, platform);

    engine.configure(NOTES, PacingConfig::new(150), Some(120.0));
    engine.enter_mirror().unwrap();
    let endpoint = endpoints.try_recv().unwrap();
    engine.start_countdown_from(0).unwrap();
    engine.tick(0.5);
    let before = engine.playback().elapsed_seconds;
    log_jsonl("suspend", &[("elapsed", before.to_string())]);

    engine.host_suspended();
    assert_eq!(engine.authority(), Authority::Continuation);
    assert!(engine.continuation_running());

    let drainer = thread::spawn(move || {
        let mut frames = 0usize;
        let mut last = None;
        while let Ok(frame) = endpoint.frames.recv_timeout(Duration::from_millis(500)) {
            frames += 1;
            last = Some(frame);
            if !endpoint.is_open() {
                break;
            }
        }
        (frames, last)
    });

    assert!(
        wait_until(Duration::from_secs(10), || engine.playback().elapsed_seconds >= before + 0.3),
        "continuation clock did not advance playback"
    );
    assert_eq!(engine.tick(50.0), None, "suspended host tick must be ignored");

    engine.host_resumed();
    assert_eq!(engine.authority(), Authority::Primary);
    assert!(!engine.continuation_running());

    let resumed = engine.playback().elapsed_seconds;
    let ticks = (resumed - before) / interval.as_secs_f64();
    log_jsonl(
        "resume",
        &[("elapsed", resumed.to_string()), ("ticks", format!("{ticks:.6}"))],
    );
    assert!((ticks - ticks.round()).abs() < 1e-6, "continuation advanced by a partial tick");

    thread::sleep(Duration::from_millis(3 * interval.as_millis() as u64));
    assert_eq!(engine.playback().elapsed_seconds, resumed, "tick after resume returned");

    engine.tick(0.25);
    assert!((engine.playback().elapsed_seconds - (resumed + 0.25)).abs() < 1e-9);
    assert_eq!(engine.state(), LifecycleState::Playing);

    engine.cleanup();
    let (frames, last) = drainer.join().unwrap();
    log_jsonl("mirror", &[("frames", frames.to_string())]);
    assert!(frames > 0);
    assert!(last.is_some_and(|f| f.is_playing));
}

#[test]
fn reconfigure_leaves_one_surface_and_one_clock() {
    init_tracing();
    let (platform, endpoints) = ChannelPlatform::new(Size::new(1280, 720), 2);
    let live = platform.live_surfaces();
    let mut engine = Engine::new(EngineConfig::default(), platform);

    engine.configure(NOTES, PacingConfig::default(), None);
    engine.enter_mirror().unwrap();
    engine.start_countdown_from(0).unwrap();
    engine.host_suspended();
    assert!(engine.continuation_running());
    let first = endpoints.try_recv().unwrap();

    engine.configure("Second deck", PacingConfig::default(), None);
    assert!(!engine.continuation_running());
    assert!(!first.is_open());
    assert_eq!(live.get(), 0);

    engine.enter_mirror().unwrap();
    engine.host_suspended();
    let _second = endpoints.try_recv().unwrap();
    assert_eq!(live.get(), 1);
    assert!(!engine.continuation_running(), "idle session must not tick");
    engine.start_countdown_from(0).unwrap();
    assert!(engine.continuation_running());
    log_jsonl("reconfigure", &[("live", live.get().to_string())]);

    engine.cleanup();
    engine.cleanup();
    assert_eq!(live.get(), 0);
    assert!(!engine.continuation_running());
    assert_eq!(engine.state(), LifecycleState::Unconfigured);
}

#[test]
fn exiting_mirror_while_suspended_halts_ticks() {
    init_tracing();
    let (platform, _endpoints) = ChannelPlatform::new(Size::new(1280, 720), 2);
    let mut engine = Engine::new(EngineConfig::default(), platform);
    engine.configure(NOTES, PacingConfig::default(), None);
    engine.enter_mirror().unwrap();
    engine.start_countdown_from(0).unwrap();
    engine.host_suspended();

    assert!(engine.exit_mirror());
    let frozen = engine.playback().elapsed_seconds;
    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.playback().elapsed_seconds, frozen);
    assert_eq!(engine.authority(), Authority::Primary);
}

#[test]
fn mirror_controls_apply_while_host_is_suspended() {
    init_tracing();
    let interval = Duration::from_secs(1) / 30;
    let config = EngineConfig::default().with_continuation_interval(interval);
    let (platform, endpoints) = ChannelPlatform::new(Size::new(1280, 720), 16);
    let mut engine = Engine::new(config, platform);
    engine.configure(NOTES, PacingConfig::default(), None);
    engine.enter_mirror().unwrap();
    let endpoint = endpoints.try_recv().unwrap();
    engine.start_countdown_from(0).unwrap();
    engine.host_suspended();
    assert!(wait_until(Duration::from_secs(10), || {
        engine.playback().elapsed_seconds > 0.0
    }));

    // Pause from the mirror with nobody calling pump.
    endpoint.latest();
    assert!(endpoint.intents.send(MirrorIntent::Pause));
    assert!(
        wait_until(Duration::from_secs(10), || !engine.continuation_running()),
        "pause intent did not halt the continuation clock"
    );
    assert_eq!(engine.state(), LifecycleState::Paused);
    thread::sleep(Duration::from_millis(20));
    let paused_frame = endpoint.latest();
    assert!(paused_frame.is_some_and(|f| !f.is_playing));

    let at_pause = engine.playback().elapsed_seconds;
    thread::sleep(Duration::from_millis(300));
    let later = engine.playback().elapsed_seconds;
    log_jsonl(
        "paused",
        &[("at_pause", at_pause.to_string()), ("later", later.to_string())],
    );
    assert_eq!(later, at_pause);
    assert!(endpoint.latest().is_none(), "frames pushed while paused");

    assert!(endpoint.intents.send(MirrorIntent::Resume));
    assert!(wait_until(Duration::from_secs(10), || engine.continuation_running()));
    assert!(wait_until(Duration::from_secs(10), || {
        engine.playback().elapsed_seconds > at_pause
    }));

    assert!(endpoint.intents.send(MirrorIntent::Close));
    assert!(wait_until(Duration::from_secs(10), || !engine.is_mirror_active()));
    assert!(!engine.continuation_running());
    assert!(!endpoint.is_open());
    let closed_at = engine.playback().elapsed_seconds;
    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.playback().elapsed_seconds, closed_at);

    engine.host_resumed();
    assert_eq!(engine.authority(), Authority::Primary);
    assert_eq!(
        engine.pump(),
        vec![
            EngineEvent::IntentApplied(MirrorIntent::Pause),
            EngineEvent::IntentApplied(MirrorIntent::Resume),
            EngineEvent::MirrorClosed,
        ]
    );
    assert_eq!(engine.state(), LifecycleState::Playing);

    // Back on the host, intents flow through pump again.
    assert!(endpoint.intents.send(MirrorIntent::TogglePlayPause));
    assert_eq!(
        engine.pump(),
        vec![EngineEvent::IntentApplied(MirrorIntent::TogglePlayPause)]
    );
    assert_eq!(engine.state(), LifecycleState::Paused);
}

#[test]
fn expand_while_suspended_hands_back_to_host() {
    init_tracing();
    let (platform, endpoints) = ChannelPlatform::new(Size::new(1280, 720), 4);
    let live = platform.live_surfaces();
    let config = EngineConfig::default().with_countdown_seconds(30);
    let mut engine = Engine::new(config, platform);
    engine.configure(NOTES, PacingConfig::default(), None);
    engine.enter_mirror().unwrap();
    let endpoint = endpoints.try_recv().unwrap();
    engine.host_suspended();
    assert!(!engine.continuation_running());

    assert!(endpoint.intents.send(MirrorIntent::Restart));
    assert!(wait_until(Duration::from_secs(10), || engine.continuation_running()));
    assert!(endpoint.intents.send(MirrorIntent::ExpandToHost));
    assert!(wait_until(Duration::from_secs(10), || live.get() == 0));
    assert!(!engine.continuation_running());

    engine.host_resumed();
    assert_eq!(
        engine.pump(),
        vec![
            EngineEvent::IntentApplied(MirrorIntent::Restart),
            EngineEvent::ExpandToHost,
        ]
    );
    assert!(!engine.is_mirror_active());
    assert_eq!(engine.authority(), Authority::Primary);
}
