use anyhow::Result;
use mediabias::app::AppContext;
use mediabias::config::Config;
use mediabias::data::HttpFetcher;
use mediabias::logging::{info, obj, v_str, Domain};
use mediabias::playback::{Clock, Phase, SystemClock};
use mediabias::render::TerminalSink;
use mediabias::timeline::EventSequence;
use serde_json::json;
use std::io;

/// Usage: mediabias [story-id]
///
/// Prints the story list (filtered by DEFAULT_OUTLET when set), the outlet
/// distribution, then replays one story's timeline on the terminal. Without
/// an id the first story of the unfiltered list is played.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let fetcher = HttpFetcher::new(std::time::Duration::from_secs(cfg.http_timeout_secs))?;
    info(
        Domain::System,
        "startup",
        obj(&[
            ("stories", v_str(&cfg.stories_url)),
            ("outlets", v_str(&cfg.sources_url)),
            ("animation_ms", json!(cfg.animation_ms)),
        ]),
    );

    let mut app = AppContext::new(cfg, fetcher, TerminalSink::new(io::stdout()));
    app.load_datasets().await;

    match app.selection().outlet.as_deref() {
        Some(outlet) => println!("== Stories covered by {} ==", outlet),
        None => println!("== Stories =="),
    }
    if app.selection().is_empty() {
        println!("(no stories)");
    }
    for card in &app.selection().cards {
        println!("{}\n", card.to_text());
    }
    if let Some(dist) = app.distribution() {
        println!("{}\n", dist.to_text());
    }

    let story_id = std::env::args()
        .nth(1)
        .or_else(|| app.stories().first().map(|s| s.key()));
    let story_id = match story_id {
        Some(id) => id,
        None => {
            info(Domain::System, "shutdown", obj(&[("msg", v_str("no story to play"))]));
            return Ok(());
        }
    };

    let clock = SystemClock::new();
    let total_events = app
        .stories()
        .iter()
        .find(|s| s.key() == story_id)
        .map(|s| EventSequence::from_story(s).len())
        .unwrap_or(0);
    app.timeline_mut().sink_mut().set_total_events(total_events);
    if !app.open_story(&story_id, clock.now()) {
        info(Domain::System, "shutdown", obj(&[("story_id", v_str(&story_id)), ("msg", v_str("unknown story"))]));
        return Ok(());
    }
    if app.timeline().phase() == Phase::Idle {
        app.toggle_playback(clock.now());
    }
    app.run_playback(&clock).await;
    app.close_story();
    info(Domain::System, "shutdown", obj(&[("story_id", v_str(&story_id))]));
    Ok(())
}
