use std::time::Duration;

use crate::density::KdeConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub stories_url: String,
    pub sources_url: String,
    pub animation_ms: u64,
    pub frame_ms: u64,
    pub kde_enabled: bool,
    pub kde_bandwidth: f64,
    pub kde_min: f64,
    pub kde_max: f64,
    pub kde_samples: usize,
    pub story_limit: usize,
    pub default_outlet: String,
    pub scatter_min_topic_stories: f64,
    pub owner_min_total: f64,
    pub owner_top_n: usize,
    pub autoplay: bool,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stories_url: "dist/israeli-palestinian-conflict.json".to_string(),
            sources_url: "dist/source_bias.csv".to_string(),
            animation_ms: 5000,
            frame_ms: 16,
            kde_enabled: true,
            kde_bandwidth: 0.5,
            kde_min: -2.0,
            kde_max: 2.0,
            kde_samples: 64,
            story_limit: 9,
            default_outlet: "abc News".to_string(),
            scatter_min_topic_stories: 100.0,
            owner_min_total: 10_000.0,
            owner_top_n: 20,
            autoplay: true,
            http_timeout_secs: 30,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            stories_url: std::env::var("STORIES_URL").unwrap_or(d.stories_url),
            sources_url: std::env::var("SOURCES_URL").unwrap_or(d.sources_url),
            animation_ms: env_or("ANIMATION_MS", d.animation_ms),
            frame_ms: env_or("FRAME_MS", d.frame_ms),
            kde_enabled: env_flag("KDE_ENABLED", d.kde_enabled),
            kde_bandwidth: env_or("KDE_BANDWIDTH", d.kde_bandwidth),
            kde_min: env_or("KDE_MIN", d.kde_min),
            kde_max: env_or("KDE_MAX", d.kde_max),
            kde_samples: env_or("KDE_SAMPLES", d.kde_samples),
            story_limit: env_or("STORY_LIMIT", d.story_limit),
            default_outlet: std::env::var("DEFAULT_OUTLET").unwrap_or(d.default_outlet),
            scatter_min_topic_stories: env_or("SCATTER_MIN_TOPIC_STORIES", d.scatter_min_topic_stories),
            owner_min_total: env_or("OWNER_MIN_TOTAL", d.owner_min_total),
            owner_top_n: env_or("OWNER_TOP_N", d.owner_top_n),
            autoplay: env_flag("AUTOPLAY", d.autoplay),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", d.http_timeout_secs),
        }
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    /// None when density shading is switched off.
    pub fn kde(&self) -> Option<KdeConfig> {
        if !self.kde_enabled {
            return None;
        }
        Some(KdeConfig {
            bandwidth: self.kde_bandwidth,
            extent: (self.kde_min, self.kde_max),
            samples: self.kde_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_views() {
        let cfg = Config::default();
        assert_eq!(cfg.animation_duration(), Duration::from_millis(5000));
        assert_eq!(cfg.story_limit, 9);
        assert_eq!(cfg.default_outlet, "abc News");
        let kde = cfg.kde().unwrap();
        assert_eq!(kde.extent, (-2.0, 2.0));
    }

    #[test]
    fn kde_can_be_disabled() {
        let cfg = Config {
            kde_enabled: false,
            ..Default::default()
        };
        assert!(cfg.kde().is_none());
    }

    #[test]
    fn zero_durations_are_floored() {
        let cfg = Config {
            animation_ms: 0,
            frame_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.animation_duration(), Duration::from_millis(1));
        assert_eq!(cfg.frame_interval(), Duration::from_millis(1));
    }
}
