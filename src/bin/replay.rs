//! Deterministic timeline replay.
//!
//! Usage: replay <stories.json> [story-id]
//!
//! Steps a manual clock one frame interval at a time and prints every frame
//! as a JSON line. `REPLAY_TOGGLES=1200,2000` presses play/pause at those
//! virtual milliseconds.

use std::io::{self, Write};
use std::time::Duration;

use mediabias::config::Config;
use mediabias::data::parse_stories;
use mediabias::playback::{Clock, FrameQueue, ManualClock, Phase, PlaybackController, Snapshot};
use mediabias::render::RenderSink;
use mediabias::timeline::EventSequence;
use serde_json::json;

struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> RenderSink for JsonLines<W> {
    fn render(&mut self, s: &Snapshot<'_>) {
        let line = json!({
            "elapsed_ms": s.elapsed.as_millis() as u64,
            "progress": s.progress,
            "cursor": s.cursor.to_rfc3339(),
            "active": s.active.iter().map(|e| e.id).collect::<Vec<_>>(),
            "polarization": s.polarization,
            "trend_points": s.trend.len(),
            "density_points": s.distribution.as_ref().map(|d| d.len()),
        });
        let _ = writeln!(self.out, "{}", line);
    }

    fn clear(&mut self) {
        let _ = writeln!(self.out, "{}", json!({ "clear": true }));
    }
}

fn parse_toggles(raw: &str) -> Vec<Duration> {
    let mut out: Vec<Duration> = raw
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .collect();
    out.sort();
    out
}

fn main() {
    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(p) => p,
        None => {
            eprintln!("usage: replay <stories.json> [story-id]");
            std::process::exit(2);
        }
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("cannot read {}: {}", path, err);
            std::process::exit(1);
        }
    };
    let (stories, skipped) = match parse_stories(&text) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    if skipped > 0 {
        eprintln!("skipped {} malformed stories", skipped);
    }
    let wanted = args.next();
    let story = match &wanted {
        Some(id) => stories.iter().find(|s| &s.key() == id),
        None => stories.first(),
    };
    let story = match story {
        Some(s) => s,
        None => {
            eprintln!("no story to replay");
            std::process::exit(1);
        }
    };

    let cfg = Config::from_env();
    let mut toggles = parse_toggles(&std::env::var("REPLAY_TOGGLES").unwrap_or_default()).into_iter();
    let mut next_toggle = toggles.next();
    let clock = ManualClock::new();
    let step = cfg.frame_interval();
    let sink = JsonLines { out: io::stdout() };
    let mut timeline = PlaybackController::new(cfg.animation_duration(), cfg.kde(), FrameQueue::new(), sink);
    timeline.load(EventSequence::from_story(story));
    if !timeline.start(clock.now()) {
        eprintln!("story {} has no playable articles", story.key());
        return;
    }

    // Bounded so a paused playback with no further toggle cannot spin forever.
    let horizon = cfg.animation_duration() * 4 + step;
    while clock.now() <= horizon && timeline.phase() != Phase::Finished {
        let now = clock.advance(step);
        if let Some(at) = next_toggle {
            if now >= at {
                timeline.toggle(now);
                next_toggle = toggles.next();
                continue;
            }
        }
        if timeline.phase() == Phase::Paused && next_toggle.is_none() {
            break;
        }
        timeline.tick(now);
    }
    eprintln!(
        "story={} phase={} frames={}",
        story.key(),
        timeline.phase().as_str(),
        timeline.frames_emitted()
    );
}
