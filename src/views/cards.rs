use serde::Serialize;

use crate::bias;
use crate::data::{Article, Story};

/// Display model for one entry of the story list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    /// Bias bucket of the featured article, when the card stands for one.
    pub bias_label: Option<&'static str>,
    pub controversy: String,
    pub sources: usize,
    pub threshold_note: Option<String>,
}

/// 1st, 2nd, 3rd, then "th" for everything else.
pub fn numbered(n: u32) -> String {
    match n {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        _ => format!("{}th", n),
    }
}

impl StoryCard {
    pub fn from_story(story: &Story) -> Self {
        Self {
            id: story.key(),
            title: story.title.clone(),
            description: story.description.clone(),
            url: None,
            bias_label: None,
            controversy: format!("{:.2}", story.surprise_index),
            sources: story.articles.len(),
            threshold_note: story
                .first_to_threshold
                .filter(|n| *n > 0)
                .map(|n| format!("Polarized from the {} post", numbered(n))),
        }
    }

    /// Card that stands for one outlet's article within the story.
    pub fn featuring(story: &Story, article: &Article) -> Self {
        let mut card = Self::from_story(story);
        card.title = article.title.clone();
        card.url = Some(article.url.clone()).filter(|u| !u.is_empty());
        card.bias_label = bias::article_bias(&article.bias).map(bias::to_display_label);
        card
    }

    /// Plain-text rendering used by the CLI.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", self.title);
        if !self.description.is_empty() && self.url.is_none() {
            out.push_str(&format!("  {}\n", self.description));
        }
        match self.bias_label {
            Some(label) => out.push_str(&format!("  Bias: {}", label)),
            None => out.push_str(&format!("  Sources: {}", self.sources)),
        }
        out.push_str(&format!("  Controversy: {}", self.controversy));
        if let Some(note) = &self.threshold_note {
            out.push_str(&format!("\n  {}", note));
        }
        if let Some(url) = &self.url {
            out.push_str(&format!("\n  {}", url));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story() -> Story {
        Story {
            id: json!("s-1"),
            title: "Ceasefire talks".to_string(),
            description: "desc".to_string(),
            surprise_index: 0.4567,
            first_to_threshold: Some(2),
            articles: vec![Article {
                source_name: "abc News".to_string(),
                source_bias: "leanLeft".to_string(),
                bias: json!(4),
                title: "Article title".to_string(),
                url: "https://abc.example/a".to_string(),
                date: "2024-01-01".to_string(),
                article_image_url: None,
            }],
            polarization: None,
        }
    }

    #[test]
    fn ordinals_follow_simple_rule() {
        assert_eq!(numbered(1), "1st");
        assert_eq!(numbered(2), "2nd");
        assert_eq!(numbered(3), "3rd");
        assert_eq!(numbered(4), "4th");
        assert_eq!(numbered(11), "11th");
    }

    #[test]
    fn story_card_formats_metrics() {
        let card = StoryCard::from_story(&story());
        assert_eq!(card.controversy, "0.46");
        assert_eq!(card.sources, 1);
        assert_eq!(card.threshold_note.as_deref(), Some("Polarized from the 2nd post"));
        assert!(card.to_text().contains("Sources: 1"));
    }

    #[test]
    fn featured_card_takes_article_fields() {
        let s = story();
        let card = StoryCard::featuring(&s, &s.articles[0]);
        assert_eq!(card.title, "Article title");
        assert_eq!(card.bias_label, Some("Right"));
        assert_eq!(card.url.as_deref(), Some("https://abc.example/a"));
        assert!(card.to_text().contains("Bias: Right"));
    }

    #[test]
    fn zero_threshold_has_no_note() {
        let mut s = story();
        s.first_to_threshold = Some(0);
        assert!(StoryCard::from_story(&s).threshold_note.is_none());
    }
}
