//! Time-driven playback of an event sequence.
//!
//! The controller owns a virtual clock measured against wall-clock `now`
//! values supplied by the caller. Each frame it maps elapsed time onto the
//! sequence's time domain, takes the active prefix, optionally estimates the
//! bias density, and hands a [`Snapshot`] to the render sink.
//!
//! Every transition that stops or restarts playback cancels the pending frame
//! first, and frames whose id is not the pending one are dropped, so a stale
//! callback can never drive a second loop against the same sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::density::{self, DensitySample, KdeConfig};
use crate::logging::log_transition;
use crate::render::RenderSink;
use crate::timeline::{Event, EventSequence, TimeDomain};

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{FrameId, FrameQueue, FrameScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Playing,
    Paused,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Finished => "finished",
        }
    }
}

/// Per-frame view of the playback; never stored by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<'a> {
    pub cursor: DateTime<Utc>,
    pub progress: f64,
    pub elapsed: Duration,
    pub active: &'a [Event],
    pub distribution: Option<Vec<DensitySample>>,
    pub polarization: Option<f64>,
    /// Step-after polarization line up to the last active event.
    pub trend: Vec<(DateTime<Utc>, f64)>,
}

/// Pure function of the sequence and the virtual time.
pub fn compose_snapshot<'a>(
    sequence: &'a EventSequence,
    domain: TimeDomain,
    elapsed: Duration,
    total: Duration,
    kde: Option<&KdeConfig>,
) -> Snapshot<'a> {
    let elapsed = elapsed.min(total);
    let progress = if domain.is_instant() || total.is_zero() {
        1.0
    } else {
        elapsed.as_secs_f64() / total.as_secs_f64()
    };
    let cursor = domain.lerp(progress);
    let active = sequence.active_prefix(cursor);
    let distribution = match kde {
        Some(cfg) if active.len() >= 2 => {
            let values: Vec<f64> = active.iter().map(|e| e.bias).collect();
            Some(density::estimate(&values, cfg))
        }
        _ => None,
    };
    Snapshot {
        cursor,
        progress,
        elapsed,
        active,
        distribution,
        polarization: sequence.polarization_at(active.len()),
        trend: sequence.polarization_trend(active.len()),
    }
}

pub struct PlaybackController<S, R> {
    sequence: EventSequence,
    domain: Option<TimeDomain>,
    phase: Phase,
    total: Duration,
    /// Virtual time frozen at the last pause (or zero).
    elapsed: Duration,
    /// Wall-clock instant playback (re)started; elapsed = frozen + (now - this).
    resumed_at: Option<Duration>,
    pending: Option<FrameId>,
    kde: Option<KdeConfig>,
    active_len: usize,
    cursor: Option<DateTime<Utc>>,
    frames: u64,
    scheduler: S,
    sink: R,
}

impl<S: FrameScheduler, R: RenderSink> PlaybackController<S, R> {
    pub fn new(total: Duration, kde: Option<KdeConfig>, scheduler: S, sink: R) -> Self {
        Self {
            sequence: EventSequence::default(),
            domain: None,
            phase: Phase::Idle,
            total: total.max(Duration::from_millis(1)),
            elapsed: Duration::ZERO,
            resumed_at: None,
            pending: None,
            kde,
            active_len: 0,
            cursor: None,
            frames: 0,
            scheduler,
            sink,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn sequence(&self) -> &EventSequence {
        &self.sequence
    }

    pub fn time_domain(&self) -> Option<TimeDomain> {
        self.domain
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending
    }

    /// Events shown by the last emitted frame.
    pub fn active(&self) -> &[Event] {
        &self.sequence.events()[..self.active_len]
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Frames emitted since construction.
    pub fn frames_emitted(&self) -> u64 {
        self.frames
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    /// Virtual time at wall-clock `now`, clamped to [0, total].
    pub fn elapsed_at(&self, now: Duration) -> Duration {
        let running = match (self.phase, self.resumed_at) {
            (Phase::Playing, Some(at)) => now.saturating_sub(at),
            _ => Duration::ZERO,
        };
        (self.elapsed + running).min(self.total)
    }

    /// Replaces the sequence. Any running playback is torn down first.
    pub fn load(&mut self, sequence: EventSequence) {
        self.reset();
        self.domain = sequence.time_domain();
        self.sequence = sequence;
    }

    /// Starts or resumes playback and emits the first frame immediately.
    /// Returns false (and emits nothing) when there is nothing to play or
    /// playback is already running.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.domain.is_none() || self.phase == Phase::Playing {
            return false;
        }
        if self.phase == Phase::Finished {
            self.elapsed = Duration::ZERO;
        }
        self.resumed_at = Some(now);
        self.transition(Phase::Playing);
        self.emit_frame(now);
        true
    }

    /// Freezes virtual time. No-op unless playing.
    pub fn pause(&mut self, now: Duration) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        self.cancel_pending();
        self.elapsed = self.elapsed_at(now);
        self.resumed_at = None;
        self.transition(Phase::Paused);
        true
    }

    /// Play/pause button. A finished playback starts over.
    pub fn toggle(&mut self, now: Duration) -> Phase {
        match self.phase {
            Phase::Playing => {
                self.pause(now);
            }
            Phase::Idle | Phase::Paused | Phase::Finished => {
                self.start(now);
            }
        }
        self.phase
    }

    /// Back to Idle with nothing shown. The sequence stays loaded.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.elapsed = Duration::ZERO;
        self.resumed_at = None;
        self.active_len = 0;
        self.cursor = None;
        self.sink.clear();
        self.transition(Phase::Idle);
    }

    /// Scheduled frame callback. Frames that are not the pending one are
    /// stale and ignored. Returns whether a snapshot was emitted.
    pub fn on_frame(&mut self, id: FrameId, now: Duration) -> bool {
        if self.pending != Some(id) || self.phase != Phase::Playing {
            return false;
        }
        self.pending = None;
        self.emit_frame(now);
        true
    }

    /// Delivers the pending frame, if any.
    pub fn tick(&mut self, now: Duration) -> bool {
        match self.pending {
            Some(id) => self.on_frame(id, now),
            None => false,
        }
    }

    fn emit_frame(&mut self, now: Duration) {
        let domain = match self.domain {
            Some(d) => d,
            None => return,
        };
        let elapsed = if domain.is_instant() {
            // Nothing to animate across: jump straight to the end.
            self.total
        } else {
            self.elapsed_at(now)
        };
        let snapshot = compose_snapshot(&self.sequence, domain, elapsed, self.total, self.kde.as_ref());
        self.active_len = snapshot.active.len();
        self.cursor = Some(snapshot.cursor);
        self.sink.render(&snapshot);
        self.frames += 1;

        if elapsed >= self.total {
            self.elapsed = self.total;
            self.resumed_at = None;
            self.transition(Phase::Finished);
        } else {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    fn transition(&mut self, to: Phase) {
        if self.phase != to {
            log_transition(self.phase.as_str(), to.as_str(), self.elapsed.as_millis() as u64);
            self.phase = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSink;
    use chrono::TimeZone;

    fn ev(id: usize, day: u32) -> Event {
        Event {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            bias: (id as f64) - 1.0,
            source_bias: 0,
            label: format!("outlet-{}", id),
            title: String::new(),
            source_url: String::new(),
            image_url: None,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn controller(days: &[u32]) -> PlaybackController<FrameQueue, RecordingSink> {
        let events = days.iter().enumerate().map(|(i, d)| ev(i, *d)).collect();
        let mut c = PlaybackController::new(ms(5000), Some(KdeConfig::default()), FrameQueue::new(), RecordingSink::default());
        c.load(EventSequence::new(events));
        c
    }

    #[test]
    fn midpoint_example() {
        let mut c = controller(&[1, 5, 10]);
        assert!(c.start(ms(0)));
        assert!(c.tick(ms(2500)));
        let last = c.sink().frames.last().unwrap();
        assert_eq!(last.progress, 0.5);
        assert_eq!(last.cursor, Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
        assert_eq!(last.active_ids, vec![0, 1]);
        assert!(last.has_distribution);
    }

    #[test]
    fn start_emits_first_frame_and_schedules_next() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(100));
        assert_eq!(c.phase(), Phase::Playing);
        assert_eq!(c.sink().frames.len(), 1);
        assert_eq!(c.active().len(), 1);
        assert!(c.pending_frame().is_some());
    }

    #[test]
    fn finishes_at_total_and_pins_cursor_to_end() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        c.tick(ms(7000));
        assert_eq!(c.phase(), Phase::Finished);
        assert!(c.pending_frame().is_none());
        assert_eq!(c.cursor(), Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()));
        assert_eq!(c.active().len(), 3);
        assert!(!c.tick(ms(8000)));
    }

    #[test]
    fn empty_sequence_never_starts() {
        let mut c = controller(&[]);
        assert!(!c.start(ms(0)));
        assert_eq!(c.toggle(ms(0)), Phase::Idle);
        assert!(c.sink().frames.is_empty());
        assert_eq!(c.scheduler().requested, 0);
    }

    #[test]
    fn single_event_jumps_to_end() {
        let mut c = controller(&[3]);
        c.start(ms(0));
        let f = c.sink().frames.last().unwrap();
        assert_eq!(f.active_ids.len(), 1);
        assert_eq!(f.progress, 1.0);
        assert!(!f.has_distribution);
        assert_eq!(c.phase(), Phase::Finished);
    }

    #[test]
    fn pause_cancels_and_freezes() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        c.tick(ms(1000));
        let pending = c.pending_frame().unwrap();
        assert_eq!(c.toggle(ms(1500)), Phase::Paused);
        assert!(c.scheduler().cancelled.contains(&pending));
        assert_eq!(c.elapsed_at(ms(9000)), ms(1500));
        assert!(!c.on_frame(pending, ms(1600)));
    }

    #[test]
    fn resume_continues_rather_than_restarts() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        c.pause(ms(2000));
        c.toggle(ms(10_000));
        assert_eq!(c.elapsed_at(ms(10_500)), ms(2500));
        c.tick(ms(10_500));
        assert_eq!(c.sink().frames.last().unwrap().progress, 0.5);
    }

    #[test]
    fn finished_toggle_replays_from_zero() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        c.tick(ms(5000));
        assert_eq!(c.phase(), Phase::Finished);
        c.toggle(ms(6000));
        assert_eq!(c.phase(), Phase::Playing);
        assert_eq!(c.sink().frames.last().unwrap().progress, 0.0);
    }

    #[test]
    fn reset_returns_to_idle_and_silences_loop() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        let stale = c.pending_frame().unwrap();
        let clears = c.sink().clears;
        c.reset();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.active().is_empty());
        assert!(c.pending_frame().is_none());
        assert!(c.scheduler().cancelled.contains(&stale));
        assert_eq!(c.sink().clears, clears + 1);
        let before = c.sink().frames.len();
        assert!(!c.on_frame(stale, ms(100)));
        assert!(!c.tick(ms(200)));
        assert_eq!(c.sink().frames.len(), before);
    }

    #[test]
    fn loading_while_playing_cancels_previous_frame() {
        let mut c = controller(&[1, 5, 10]);
        c.start(ms(0));
        let stale = c.pending_frame().unwrap();
        c.load(EventSequence::new(vec![ev(0, 2), ev(1, 3)]));
        assert!(c.scheduler().cancelled.contains(&stale));
        c.start(ms(50));
        assert!(!c.on_frame(stale, ms(60)));
        assert_eq!(c.scheduler().pending(), c.pending_frame());
    }

    #[test]
    fn polarization_indicator_is_reported() {
        let events = vec![ev(0, 1), ev(1, 5), ev(2, 10)];
        let seq = EventSequence::new(events).with_polarization(vec![0.2, 0.5, 0.9]);
        let mut c = PlaybackController::new(ms(1000), None, FrameQueue::new(), RecordingSink::default());
        c.load(seq);
        c.start(ms(0));
        assert_eq!(c.sink().frames[0].polarization, Some(0.2));
        assert_eq!(c.sink().frames[0].trend_points, 1);
        c.tick(ms(1000));
        assert_eq!(c.sink().frames.last().unwrap().trend_points, 3);
        assert!(!c.sink().frames[0].has_distribution);
    }
}
