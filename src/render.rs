//! Render sinks: consumers of playback snapshots.
//!
//! [`Scene`] keeps the marks currently on screen keyed by event id and applies
//! each snapshot as an idempotent diff. [`TerminalSink`] draws the scene as one
//! text line per frame. [`RecordingSink`] keeps a compact log of frames.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::bias;
use crate::density::DensitySample;
use crate::logging::{debug, obj, Domain};
use crate::playback::Snapshot;

pub trait RenderSink {
    fn render(&mut self, snapshot: &Snapshot<'_>);
    /// Removes every mark; called when playback is reset.
    fn clear(&mut self);
}

impl<T: RenderSink + ?Sized> RenderSink for Box<T> {
    fn render(&mut self, snapshot: &Snapshot<'_>) {
        (**self).render(snapshot)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointMark {
    pub at: DateTime<Utc>,
    pub bias: f64,
    pub color: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneDiff {
    pub entered: Vec<usize>,
    pub exited: Vec<usize>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Scene {
    pub points: BTreeMap<usize, PointMark>,
    pub cursor: Option<DateTime<Utc>>,
    pub progress: f64,
    pub density: Vec<DensitySample>,
    pub trend_indicator: Option<(DateTime<Utc>, f64)>,
    pub trend: Vec<(DateTime<Utc>, f64)>,
}

impl Scene {
    /// Brings the scene in line with the snapshot. Applying the same snapshot
    /// twice yields an empty diff the second time.
    pub fn apply(&mut self, snapshot: &Snapshot<'_>) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let keep: BTreeMap<usize, &crate::timeline::Event> =
            snapshot.active.iter().map(|e| (e.id, e)).collect();

        let stale: Vec<usize> = self
            .points
            .keys()
            .filter(|id| !keep.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            self.points.remove(&id);
            diff.exited.push(id);
        }
        for (id, e) in keep {
            if self.points.contains_key(&id) {
                continue;
            }
            self.points.insert(
                id,
                PointMark {
                    at: e.timestamp,
                    bias: e.bias,
                    color: bias::rating_color(e.source_bias),
                    label: e.label.clone(),
                },
            );
            diff.entered.push(id);
        }

        self.cursor = Some(snapshot.cursor);
        self.progress = snapshot.progress;
        self.density = snapshot.distribution.clone().unwrap_or_default();
        self.trend_indicator = snapshot.polarization.map(|v| (snapshot.cursor, v));
        self.trend = snapshot.trend.clone();
        diff
    }

    pub fn clear(&mut self) {
        *self = Scene::default();
    }
}

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Downsamples a density curve to `width` glyphs scaled to its own peak.
pub fn sparkline(curve: &[DensitySample], width: usize) -> String {
    if curve.is_empty() || width == 0 {
        return String::new();
    }
    let peak = curve.iter().map(|s| s.density).fold(0.0_f64, f64::max);
    (0..width)
        .map(|i| {
            let idx = i * curve.len() / width;
            let v = curve[idx.min(curve.len() - 1)].density;
            if peak <= 0.0 {
                SPARK[0]
            } else {
                let level = ((v / peak) * (SPARK.len() - 1) as f64).round() as usize;
                SPARK[level.min(SPARK.len() - 1)]
            }
        })
        .collect()
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0)) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled.min(width)))
}

/// Writes one status line per frame.
pub struct TerminalSink<W: Write> {
    out: W,
    scene: Scene,
    total_events: usize,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scene: Scene::default(),
            total_events: 0,
        }
    }

    /// Total shown as the denominator of the article counter.
    pub fn set_total_events(&mut self, n: usize) {
        self.total_events = n;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn render(&mut self, snapshot: &Snapshot<'_>) {
        let diff = self.scene.apply(snapshot);
        let mut line = format!(
            "{} {}  articles {}/{}  +{} -{}",
            progress_bar(snapshot.progress, 20),
            snapshot.cursor.format("%Y-%m-%d %H:%M"),
            snapshot.active.len(),
            self.total_events.max(snapshot.active.len()),
            diff.entered.len(),
            diff.exited.len(),
        );
        if let Some(p) = snapshot.polarization {
            line.push_str(&format!("  polarization {:.2}", p));
        }
        if !self.scene.density.is_empty() {
            line.push_str("  ");
            line.push_str(&sparkline(&self.scene.density, 16));
        }
        for id in &diff.entered {
            if let Some(mark) = self.scene.points.get(id) {
                line.push_str(&format!("\n    + {} ({})", mark.label, bias::to_display_label(mark.bias)));
            }
        }
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
        if !diff.is_empty() {
            debug(
                Domain::Render,
                "scene_diff",
                obj(&[
                    ("entered", serde_json::json!(diff.entered)),
                    ("exited", serde_json::json!(diff.exited)),
                ]),
            );
        }
    }

    fn clear(&mut self) {
        self.scene.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedFrame {
    pub cursor: DateTime<Utc>,
    pub progress: f64,
    pub active_ids: Vec<usize>,
    pub has_distribution: bool,
    pub polarization: Option<f64>,
    pub trend_points: usize,
}

/// Keeps every frame it is given; used by replays and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub frames: Vec<RecordedFrame>,
    pub clears: usize,
}

impl RenderSink for RecordingSink {
    fn render(&mut self, snapshot: &Snapshot<'_>) {
        self.frames.push(RecordedFrame {
            cursor: snapshot.cursor,
            progress: snapshot.progress,
            active_ids: snapshot.active.iter().map(|e| e.id).collect(),
            has_distribution: snapshot.distribution.is_some(),
            polarization: snapshot.polarization,
            trend_points: snapshot.trend.len(),
        });
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Event;
    use chrono::TimeZone;
    use std::time::Duration;

    fn ev(id: usize, day: u32) -> Event {
        Event {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap(),
            bias: 0.0,
            source_bias: -1,
            label: format!("o{}", id),
            title: String::new(),
            source_url: String::new(),
            image_url: None,
        }
    }

    fn snap<'a>(active: &'a [Event]) -> Snapshot<'a> {
        Snapshot {
            cursor: Utc.with_ymd_and_hms(2024, 2, 9, 0, 0, 0).unwrap(),
            progress: 0.5,
            elapsed: Duration::from_millis(10),
            active,
            distribution: None,
            polarization: Some(0.3),
            trend: vec![(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), 0.3)],
        }
    }

    #[test]
    fn scene_diff_is_idempotent() {
        let events = vec![ev(0, 1), ev(1, 2)];
        let mut scene = Scene::default();
        let d1 = scene.apply(&snap(&events));
        assert_eq!(d1.entered, vec![0, 1]);
        let d2 = scene.apply(&snap(&events));
        assert!(d2.is_empty());
        let d3 = scene.apply(&snap(&events[..1]));
        assert_eq!(d3.exited, vec![1]);
        assert_eq!(scene.points.len(), 1);
        assert_eq!(scene.points[&0].color, "#92C5DE");
        assert_eq!(scene.trend.len(), 1);
    }

    #[test]
    fn terminal_sink_writes_a_line_per_frame() {
        let events = vec![ev(0, 1)];
        let mut sink = TerminalSink::new(Vec::new());
        sink.set_total_events(3);
        sink.render(&snap(&events));
        sink.clear();
        assert!(sink.scene().points.is_empty());
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("articles 1/3"));
        assert!(text.contains("polarization 0.30"));
        assert!(text.contains("+ o0 (Center)"));
    }

    #[test]
    fn sparkline_scales_to_peak() {
        let curve: Vec<DensitySample> = (0..8)
            .map(|i| DensitySample { x: i as f64, density: i as f64 })
            .collect();
        let s = sparkline(&curve, 8);
        assert_eq!(s.chars().count(), 8);
        assert_eq!(s.chars().last(), Some('█'));
        assert_eq!(s.chars().next(), Some('▁'));
        assert!(sparkline(&[], 8).is_empty());
    }

    #[test]
    fn progress_bar_bounds() {
        assert_eq!(progress_bar(0.0, 4), "[....]");
        assert_eq!(progress_bar(1.0, 4), "[####]");
        assert_eq!(progress_bar(7.0, 4), "[####]");
    }
}
