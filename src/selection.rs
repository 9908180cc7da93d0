//! Propagates a selected outlet to the sibling views.
//!
//! Outlet name is the join key between the outlet CSV and the story JSON.
//! A selection that matches nothing produces an empty view, never an error.

use serde::Serialize;

use crate::bias;
use crate::data::{OutletRow, Story};
use crate::logging::log_selection;
use crate::views::cards::StoryCard;
use crate::views::outlets::DistributionView;

/// Story list as shown with no outlet selected.
pub fn all_story_cards(stories: &[Story], limit: usize) -> Vec<StoryCard> {
    stories.iter().take(limit).map(StoryCard::from_story).collect()
}

/// Stories covered by `outlet`, each represented by that outlet's article.
/// Only the outlet's first article in a story is considered, and stories
/// where that article's bias matches the outlet's own rating are left out:
/// the list shows coverage that deviates from the outlet's usual lean. An
/// unrecognized outlet tag has no rating and never counts as aligned.
pub fn story_cards_for_outlet(stories: &[Story], outlet: &str, limit: usize) -> Vec<StoryCard> {
    stories
        .iter()
        .filter_map(|story| {
            let article = story.articles.iter().find(|a| a.source_name == outlet)?;
            let aligned = match (
                bias::article_bias(&article.bias),
                bias::known_numeric(&article.source_bias),
            ) {
                (Some(b), Some(rating)) => b == rating as f64,
                _ => false,
            };
            if aligned {
                return None;
            }
            Some(StoryCard::featuring(story, article))
        })
        .take(limit)
        .collect()
}

pub fn find_outlet<'a>(rows: &'a [OutletRow], name: &str) -> Option<&'a OutletRow> {
    rows.iter().find(|r| r.source_name == name)
}

/// Everything that depends on the current outlet selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionState {
    pub outlet: Option<String>,
    pub cards: Vec<StoryCard>,
    pub distribution: Option<DistributionView>,
}

impl SelectionState {
    pub fn unfiltered(stories: &[Story], limit: usize) -> Self {
        Self {
            outlet: None,
            cards: all_story_cards(stories, limit),
            distribution: None,
        }
    }

    /// Recomputes the filtered story list and the distribution view. The
    /// distribution keeps its previous value when the outlet has no CSV row.
    pub fn select_outlet(&mut self, stories: &[Story], rows: &[OutletRow], outlet: &str, limit: usize) {
        self.cards = story_cards_for_outlet(stories, outlet, limit);
        if let Some(row) = find_outlet(rows, outlet) {
            self.distribution = Some(DistributionView::for_outlet(row));
        }
        self.outlet = Some(outlet.to_string());
        log_selection("outlet", outlet, self.cards.len());
    }

    pub fn clear_outlet(&mut self, stories: &[Story], limit: usize) {
        self.outlet = None;
        self.cards = all_story_cards(stories, limit);
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Article;
    use serde_json::json;

    fn art(outlet: &str, tag: &str, bias: i64) -> Article {
        Article {
            source_name: outlet.to_string(),
            source_bias: tag.to_string(),
            bias: json!(bias),
            title: format!("{} on it", outlet),
            url: format!("https://{}.example", outlet.replace(' ', "")),
            date: "2024-01-01".to_string(),
            article_image_url: None,
        }
    }

    fn story(id: i64, articles: Vec<Article>) -> Story {
        Story {
            id: json!(id),
            title: format!("story {}", id),
            description: String::new(),
            surprise_index: 0.1,
            first_to_threshold: None,
            articles,
            polarization: None,
        }
    }

    fn stories() -> Vec<Story> {
        vec![
            // center outlet writing a right-leaning article: deviant, kept
            story(1, vec![art("abc News", "center", 4), art("Other", "left", 0)]),
            // center outlet, center article: aligned, dropped
            story(2, vec![art("abc News", "center", 2)]),
            // outlet absent
            story(3, vec![art("Other", "left", 0)]),
        ]
    }

    #[test]
    fn outlet_filter_keeps_only_deviant_coverage() {
        let cards = story_cards_for_outlet(&stories(), "abc News", 9);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "1");
        assert_eq!(cards[0].title, "abc News on it");
        assert_eq!(cards[0].bias_label, Some("Right"));
    }

    #[test]
    fn unrecognized_outlet_tag_is_never_aligned() {
        let stories = vec![story(4, vec![art("Mystery", "mixed", 2)])];
        let cards = story_cards_for_outlet(&stories, "Mystery", 9);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].bias_label, Some("Center"));
    }

    #[test]
    fn unknown_outlet_yields_empty_state() {
        let mut state = SelectionState::unfiltered(&stories(), 9);
        assert_eq!(state.cards.len(), 3);
        state.select_outlet(&stories(), &[], "Nobody", 9);
        assert!(state.is_empty());
        assert!(state.distribution.is_none());
        assert_eq!(state.outlet.as_deref(), Some("Nobody"));
    }

    #[test]
    fn selection_updates_distribution_from_csv_row() {
        let rows = vec![OutletRow {
            source_name: "abc News".to_string(),
            surprising_dist: vec![1.0; 5],
            unsurprising_dist: vec![1.0; 5],
            ..Default::default()
        }];
        let mut state = SelectionState::default();
        state.select_outlet(&stories(), &rows, "abc News", 9);
        let dist = state.distribution.as_ref().unwrap();
        assert_eq!(dist.title, "Bias Distribution: abc News");
        state.clear_outlet(&stories(), 2);
        assert_eq!(state.cards.len(), 2);
        assert!(state.outlet.is_none());
    }

    #[test]
    fn limit_applies_after_filtering() {
        let many: Vec<Story> = (0..20)
            .map(|i| story(i, vec![art("abc News", "left", 4)]))
            .collect();
        assert_eq!(story_cards_for_outlet(&many, "abc News", 9).len(), 9);
    }
}
