//! Application context: one explicit object owning configuration, datasets,
//! selection state and the story timeline. Components receive what they need
//! from it instead of reaching for shared globals.

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::data::{self, Fetch, Location, OutletRow, Story};
use crate::logging::{info, log_load_failure, obj, v_str, Domain};
use crate::playback::{Clock, FrameQueue, Phase, PlaybackController};
use crate::render::RenderSink;
use crate::selection::SelectionState;
use crate::timeline::EventSequence;
use crate::views::{self, ColoringMode, DistributionView, OwnerGroup, ScatterPoint};

pub type Timeline<R> = PlaybackController<FrameQueue, R>;

pub struct AppContext<F, R> {
    pub config: Config,
    fetcher: F,
    stories: Vec<Story>,
    outlets: Vec<OutletRow>,
    selection: SelectionState,
    featured: Option<DistributionView>,
    coloring: ColoringMode,
    open_story: Option<String>,
    timeline: Timeline<R>,
}

impl<F: Fetch + Sync, R: RenderSink> AppContext<F, R> {
    pub fn new(config: Config, fetcher: F, sink: R) -> Self {
        let timeline = PlaybackController::new(
            config.animation_duration(),
            config.kde(),
            FrameQueue::new(),
            sink,
        );
        Self {
            config,
            fetcher,
            stories: Vec::new(),
            outlets: Vec::new(),
            selection: SelectionState::default(),
            featured: None,
            coloring: ColoringMode::SourceBias,
            open_story: None,
            timeline,
        }
    }

    /// Loads both datasets. A failure empties only the view that depends on
    /// the failed dataset; the other keeps working.
    pub async fn load_datasets(&mut self) {
        let stories_src = self.config.stories_url.clone();
        let outlets_src = self.config.sources_url.clone();
        self.stories = match self.fetch_stories(&stories_src).await {
            Ok(v) => v,
            Err(err) => {
                log_load_failure(&stories_src, "stories", &err);
                Vec::new()
            }
        };
        self.outlets = match self.fetch_outlets(&outlets_src).await {
            Ok(v) => v,
            Err(err) => {
                log_load_failure(&outlets_src, "outlets", &err);
                Vec::new()
            }
        };

        self.selection = SelectionState::unfiltered(&self.stories, self.config.story_limit);
        if !self.outlets.is_empty() {
            let featured = views::featured_outlet(&self.outlets, &self.config.default_outlet);
            self.featured = Some(DistributionView::for_outlet(&featured));
        }
        let default_outlet = self.config.default_outlet.clone();
        if !default_outlet.is_empty() {
            self.select_outlet(&default_outlet);
        }
    }

    async fn fetch_stories(&self, raw: &str) -> Result<Vec<Story>> {
        let location = Location::parse(raw)?;
        Ok(data::load_stories(&self.fetcher, &location).await?.records)
    }

    async fn fetch_outlets(&self, raw: &str) -> Result<Vec<OutletRow>> {
        let location = Location::parse(raw)?;
        Ok(data::load_outlets(&self.fetcher, &location).await?.records)
    }

    pub fn set_datasets(&mut self, stories: Vec<Story>, outlets: Vec<OutletRow>) {
        self.stories = stories;
        self.outlets = outlets;
        self.selection = SelectionState::unfiltered(&self.stories, self.config.story_limit);
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn outlets(&self) -> &[OutletRow] {
        &self.outlets
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Distribution shown before anything is clicked, or after the selected
    /// outlet turns out to have no CSV row.
    pub fn distribution(&self) -> Option<&DistributionView> {
        self.selection.distribution.as_ref().or(self.featured.as_ref())
    }

    pub fn select_outlet(&mut self, outlet: &str) {
        self.selection
            .select_outlet(&self.stories, &self.outlets, outlet, self.config.story_limit);
    }

    pub fn clear_outlet(&mut self) {
        self.selection.clear_outlet(&self.stories, self.config.story_limit);
    }

    pub fn scatter(&self) -> Vec<ScatterPoint> {
        views::scatter_points(&self.outlets, self.config.scatter_min_topic_stories)
    }

    pub fn ownership(&self) -> Vec<OwnerGroup> {
        views::ownership_groups(
            &self.outlets,
            self.config.owner_min_total,
            self.config.owner_top_n,
            self.coloring,
        )
    }

    pub fn coloring(&self) -> ColoringMode {
        self.coloring
    }

    pub fn set_coloring(&mut self, mode: ColoringMode) {
        self.coloring = mode;
    }

    /// Treemap color toggle; returns the new mode.
    pub fn toggle_coloring(&mut self) -> ColoringMode {
        self.coloring = self.coloring.toggled();
        self.coloring
    }

    /// Opens a story in the timeline, tearing down whatever was playing.
    /// Returns false when no story has that id.
    pub fn open_story(&mut self, key: &str, now: Duration) -> bool {
        let story = match self.stories.iter().find(|s| s.key() == key) {
            Some(s) => s,
            None => return false,
        };
        let sequence = EventSequence::from_story(story);
        info(
            Domain::Playback,
            "story_opened",
            obj(&[
                ("story_id", v_str(key)),
                ("events", serde_json::json!(sequence.len())),
                ("skipped", serde_json::json!(sequence.skipped())),
            ]),
        );
        self.timeline.load(sequence);
        self.open_story = Some(key.to_string());
        if self.config.autoplay {
            self.timeline.start(now);
        }
        true
    }

    /// Tears the timeline down. The story's sequence is dropped so a later
    /// play press has nothing to replay.
    pub fn close_story(&mut self) {
        self.timeline.load(EventSequence::default());
        self.open_story = None;
    }

    pub fn open_story_id(&self) -> Option<&str> {
        self.open_story.as_deref()
    }

    pub fn toggle_playback(&mut self, now: Duration) -> Phase {
        self.timeline.toggle(now)
    }

    pub fn timeline(&self) -> &Timeline<R> {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline<R> {
        &mut self.timeline
    }

    /// Drives the timeline in real time until nothing is scheduled (the
    /// playback finished, was paused, or was reset).
    pub async fn run_playback<C: Clock>(&mut self, clock: &C) {
        let interval = self.config.frame_interval();
        while let Some(id) = self.timeline.scheduler_mut().take_due() {
            sleep(interval).await;
            self.timeline.on_frame(id, clock.now());
        }
        info(
            Domain::Playback,
            "playback_idle",
            obj(&[
                ("phase", v_str(self.timeline.phase().as_str())),
                ("frames", serde_json::json!(self.timeline.frames_emitted())),
            ]),
        );
    }
}
