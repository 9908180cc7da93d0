//! Outlet-level views built from the source-bias CSV.

use serde::Serialize;
use std::collections::HashMap;

use crate::bias::{self, CATEGORIES};
use crate::data::OutletRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBar {
    pub category: &'static str,
    pub surprising: f64,
    pub unsurprising: f64,
}

impl DistributionBar {
    pub fn total(&self) -> f64 {
        self.surprising + self.unsurprising
    }
}

/// Controversial share among articles that agree with the outlet's rating
/// versus those that deviate from it, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contrast {
    pub aligned_pct: f64,
    pub deviant_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionView {
    pub title: String,
    pub bars: Vec<DistributionBar>,
    pub y_max: f64,
    pub contrast: Contrast,
}

impl DistributionView {
    pub fn for_outlet(row: &OutletRow) -> Self {
        let at = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);
        let bars: Vec<DistributionBar> = CATEGORIES
            .iter()
            .enumerate()
            .map(|(i, category)| DistributionBar {
                category: *category,
                surprising: at(&row.surprising_dist, i),
                unsurprising: at(&row.unsurprising_dist, i),
            })
            .collect();
        let y_max = bars.iter().map(DistributionBar::total).fold(0.0, f64::max);
        Self {
            title: format!("Bias Distribution: {}", row.source_name),
            contrast: contrast(&bars, row.source_bias),
            bars,
            y_max,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", self.title);
        for bar in &self.bars {
            out.push_str(&format!(
                "  {:<13} controversial {:>6}  other {:>6}\n",
                bar.category, bar.surprising, bar.unsurprising
            ));
        }
        out.push_str(&format!(
            "  aligned articles controversial: {:.1}%  deviant: {:.1}%",
            self.contrast.aligned_pct, self.contrast.deviant_pct
        ));
        out
    }
}

fn contrast(bars: &[DistributionBar], source_bias: i8) -> Contrast {
    let (mut aligned_s, mut aligned_u, mut deviant_s, mut deviant_u) = (0.0, 0.0, 0.0, 0.0);
    for (i, bar) in bars.iter().enumerate() {
        if i as i8 + bias::MIN_BIAS == source_bias {
            aligned_s += bar.surprising;
            aligned_u += bar.unsurprising;
        } else {
            deviant_s += bar.surprising;
            deviant_u += bar.unsurprising;
        }
    }
    let pct = |s: f64, u: f64| if s + u > 0.0 { s / (s + u) * 100.0 } else { 0.0 };
    Contrast {
        aligned_pct: pct(aligned_s, aligned_u),
        deviant_pct: pct(deviant_s, deviant_u),
    }
}

/// First outlet whose name contains `needle`, or a flat placeholder profile.
pub fn featured_outlet(rows: &[OutletRow], needle: &str) -> OutletRow {
    rows.iter()
        .find(|r| r.source_name.contains(needle))
        .cloned()
        .unwrap_or_else(|| OutletRow {
            source_name: needle.to_string(),
            bias_dist: vec![5.0, 15.0, 20.0, 20.0, 20.0, 15.0, 5.0],
            ..Default::default()
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub source_name: String,
    pub source_bias: i8,
    pub mean_bias: f64,
    pub total_story_count: f64,
    pub color: &'static str,
}

/// Outlets with enough coverage of the topic to place on the scatter plot.
/// Rows without a mean bias cannot be placed and are left out.
pub fn scatter_points(rows: &[OutletRow], min_topic_stories: f64) -> Vec<ScatterPoint> {
    rows.iter()
        .filter(|r| r.topic_story_count > min_topic_stories)
        .filter_map(|r| {
            Some(ScatterPoint {
                source_name: r.source_name.clone(),
                source_bias: r.source_bias,
                mean_bias: r.mean_bias?,
                total_story_count: r.total_story_count,
                color: bias::bias_color(r.source_bias),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColoringMode {
    SourceBias,
    MeanBias,
}

impl ColoringMode {
    pub fn toggled(self) -> Self {
        match self {
            ColoringMode::SourceBias => ColoringMode::MeanBias,
            ColoringMode::MeanBias => ColoringMode::SourceBias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedOutlet {
    pub name: String,
    pub value: f64,
    pub topic_story_count: f64,
    pub source_bias: i8,
    pub mean_bias: Option<f64>,
    /// Leaf value under the coloring mode the groups were built with.
    pub shade: f64,
    pub color: &'static str,
}

impl OwnedOutlet {
    /// Value the treemap leaf is colored by; missing values read as center.
    pub fn color_value(&self, mode: ColoringMode) -> f64 {
        match mode {
            ColoringMode::SourceBias => self.source_bias as f64,
            ColoringMode::MeanBias => self.mean_bias.unwrap_or(0.0),
        }
    }

    fn colored(mut self, mode: ColoringMode) -> Self {
        self.shade = self.color_value(mode);
        let bucket = self.shade.round().clamp(bias::MIN_BIAS as f64, bias::MAX_BIAS as f64) as i8;
        self.color = bias::bias_color(bucket);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerGroup {
    pub name: String,
    pub outlets: Vec<OwnedOutlet>,
    pub total_count: f64,
}

/// Groups outlets by owner. An outlet with several owners appears under each.
/// Groups survive if they own more than one outlet or exceed `min_total`
/// stories; the largest `top_n` are returned, largest first. Leaves are
/// shaded by `mode`.
pub fn ownership_groups(
    rows: &[OutletRow],
    min_total: f64,
    top_n: usize,
    mode: ColoringMode,
) -> Vec<OwnerGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, OwnerGroup> = HashMap::new();
    for row in rows {
        let owners = match row.source_owners.as_deref() {
            Some(o) if !o.trim().is_empty() => o,
            _ => continue,
        };
        for owner in owners.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let group = groups.entry(owner.to_string()).or_insert_with(|| {
                order.push(owner.to_string());
                OwnerGroup {
                    name: owner.to_string(),
                    outlets: Vec::new(),
                    total_count: 0.0,
                }
            });
            group.outlets.push(OwnedOutlet {
                name: row.source_name.clone(),
                value: row.total_story_count,
                topic_story_count: row.topic_story_count,
                source_bias: row.source_bias,
                mean_bias: row.mean_bias,
                shade: 0.0,
                color: bias::bias_color(bias::CENTER),
            }
            .colored(mode));
            group.total_count += row.total_story_count;
        }
    }
    let mut kept: Vec<OwnerGroup> = order
        .into_iter()
        .filter_map(|name| groups.remove(&name))
        .filter(|g| g.outlets.len() > 1 || g.total_count > min_total)
        .collect();
    kept.sort_by(|a, b| b.total_count.total_cmp(&a.total_count));
    kept.truncate(top_n);
    kept
}
