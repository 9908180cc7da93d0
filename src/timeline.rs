//! Dated event sequences built from a story's articles.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::bias;
use crate::data::Story;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Position of the article in the story as published.
    pub id: usize,
    pub timestamp: DateTime<Utc>,
    /// Article bias on [-2, 2].
    pub bias: f64,
    /// Outlet rating on the seven-point legend scale.
    pub source_bias: i8,
    pub label: String,
    pub title: String,
    pub source_url: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeDomain {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeDomain {
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    /// Linear interpolation; `progress` is clamped to [0, 1].
    pub fn lerp(&self, progress: f64) -> DateTime<Utc> {
        let p = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 1.0 };
        if p >= 1.0 {
            return self.end;
        }
        let span_ms = (self.end - self.start).num_milliseconds() as f64;
        self.start + ChronoDuration::milliseconds((span_ms * p).round() as i64)
    }
}

/// Events sorted ascending by timestamp; ties keep their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventSequence {
    events: Vec<Event>,
    polarization: Option<Vec<f64>>,
    skipped: usize,
}

impl EventSequence {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self {
            events,
            polarization: None,
            skipped: 0,
        }
    }

    /// Articles with a non-numeric bias or an unreadable date are dropped.
    pub fn from_story(story: &Story) -> Self {
        let mut skipped = 0usize;
        let events: Vec<Event> = story
            .articles
            .iter()
            .enumerate()
            .filter_map(|(i, a)| {
                let event = bias::article_bias(&a.bias).zip(parse_date(&a.date)).map(|(b, ts)| Event {
                    id: i,
                    timestamp: ts,
                    bias: b,
                    source_bias: bias::outlet_rating(&a.source_bias),
                    label: a.source_name.clone(),
                    title: a.title.clone(),
                    source_url: a.url.clone(),
                    image_url: a.article_image_url.clone().filter(|s| !s.is_empty()),
                });
                if event.is_none() {
                    skipped += 1;
                }
                event
            })
            .collect();
        let mut seq = Self::new(events);
        // Gaps are kept as NaN so indices stay aligned with the events.
        seq.polarization = story
            .polarization
            .as_ref()
            .map(|series| series.iter().map(|v| v.unwrap_or(f64::NAN)).collect());
        seq.skipped = skipped;
        seq
    }

    pub fn with_polarization(mut self, series: Vec<f64>) -> Self {
        self.polarization = Some(series);
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Raw series; gaps are NaN.
    pub fn polarization(&self) -> Option<&[f64]> {
        self.polarization.as_deref()
    }

    /// None for an empty sequence.
    pub fn time_domain(&self) -> Option<TimeDomain> {
        Some(TimeDomain {
            start: self.events.first()?.timestamp,
            end: self.events.last()?.timestamp,
        })
    }

    /// Longest prefix with `timestamp <= cursor`.
    pub fn active_prefix(&self, cursor: DateTime<Utc>) -> &[Event] {
        let n = self.events.partition_point(|e| e.timestamp <= cursor);
        &self.events[..n]
    }

    /// Polarization value paired with the last active event. Needs a series
    /// of at least two points, otherwise there is no trend to draw.
    pub fn polarization_at(&self, active_len: usize) -> Option<f64> {
        let series = self.polarization.as_deref()?;
        if series.len() < 2 || active_len == 0 {
            return None;
        }
        series.get(active_len - 1).copied().filter(|v| v.is_finite())
    }

    /// Step-after trend points for the first `active_len` events, each
    /// polarization value paired with the timestamp of the event at the same
    /// index. Gaps in the series are left out.
    pub fn polarization_trend(&self, active_len: usize) -> Vec<(DateTime<Utc>, f64)> {
        match self.polarization.as_deref() {
            Some(series) if series.len() >= 2 => self
                .events
                .iter()
                .take(active_len)
                .zip(series)
                .filter(|(_, v)| v.is_finite())
                .map(|(e, v)| (e.timestamp, *v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Article;
    use chrono::TimeZone;
    use serde_json::json;

    fn article(name: &str, bias: serde_json::Value, date: &str) -> Article {
        Article {
            source_name: name.to_string(),
            source_bias: "center".to_string(),
            bias,
            title: format!("{} title", name),
            url: format!("https://{}.example", name),
            date: date.to_string(),
            article_image_url: None,
        }
    }

    fn story(articles: Vec<Article>) -> Story {
        Story {
            id: json!(1),
            title: "s".to_string(),
            description: String::new(),
            surprise_index: 0.0,
            first_to_threshold: None,
            articles,
            polarization: None,
        }
    }

    #[test]
    fn sorts_by_date_and_keeps_ties_stable() {
        let s = story(vec![
            article("c", json!(2), "2024-01-10"),
            article("a", json!(2), "2024-01-01"),
            article("b1", json!(2), "2024-01-05"),
            article("b2", json!(2), "2024-01-05"),
        ]);
        let seq = EventSequence::from_story(&s);
        let labels: Vec<&str> = seq.events().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b1", "b2", "c"]);
        assert_eq!(seq.events()[0].id, 1);
    }

    #[test]
    fn drops_non_numeric_bias_and_bad_dates() {
        let s = story(vec![
            article("ok", json!("3"), "2024-01-01T10:00:00Z"),
            article("nan", json!("n/a"), "2024-01-02"),
            article("nodate", json!(1), "yesterday"),
        ]);
        let seq = EventSequence::from_story(&s);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.skipped(), 2);
        assert_eq!(seq.events()[0].bias, 1.0);
    }

    #[test]
    fn empty_sequence_has_no_domain() {
        assert!(EventSequence::default().time_domain().is_none());
    }

    #[test]
    fn lerp_hits_midpoint() {
        let d = TimeDomain {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
        };
        assert_eq!(d.lerp(0.5), Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
        assert_eq!(d.lerp(-1.0), d.start);
        assert_eq!(d.lerp(2.0), d.end);
    }

    #[test]
    fn prefix_includes_equal_timestamps() {
        let s = story(vec![
            article("a", json!(2), "2024-01-01"),
            article("b", json!(2), "2024-01-05"),
            article("c", json!(2), "2024-01-10"),
        ]);
        let seq = EventSequence::from_story(&s);
        let cursor = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(seq.active_prefix(cursor).len(), 2);
    }

    #[test]
    fn polarization_indicator_follows_active_count() {
        let s = story(vec![
            article("a", json!(2), "2024-01-01"),
            article("b", json!(2), "2024-01-05"),
        ]);
        let seq = EventSequence::from_story(&s).with_polarization(vec![0.1, 0.4]);
        assert_eq!(seq.polarization_at(0), None);
        assert_eq!(seq.polarization_at(2), Some(0.4));
        assert_eq!(seq.polarization_trend(2).len(), 2);
        assert_eq!(seq.polarization_trend(1), vec![(seq.events()[0].timestamp, 0.1)]);

        let short = EventSequence::from_story(&s).with_polarization(vec![0.3]);
        assert_eq!(short.polarization_at(1), None);
        assert!(short.polarization_trend(1).is_empty());
    }

    #[test]
    fn null_polarization_entries_have_no_indicator() {
        let mut s = story(vec![
            article("a", json!(2), "2024-01-01"),
            article("b", json!(2), "2024-01-05"),
            article("c", json!(2), "2024-01-10"),
        ]);
        s.polarization = Some(vec![Some(0.1), None, Some(0.3)]);
        let seq = EventSequence::from_story(&s);
        assert_eq!(seq.polarization_at(1), Some(0.1));
        assert_eq!(seq.polarization_at(2), None);
        assert_eq!(seq.polarization_at(3), Some(0.3));
        let trend: Vec<f64> = seq.polarization_trend(3).iter().map(|p| p.1).collect();
        assert_eq!(trend, vec![0.1, 0.3]);
    }

    #[test]
    fn parses_common_date_shapes() {
        assert!(parse_date("2024-03-01T12:30:00+02:00").is_some());
        assert!(parse_date("2024-03-01 12:30:00").is_some());
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("").is_none());
    }
}
