use serde::{Deserialize, Serialize};

use crate::bias;

pub const EXPECTED_COLUMNS: [&str; 9] = [
    "source_name",
    "source_bias",
    "bias_dist",
    "surprising_dist",
    "unsurprising_dist",
    "total_story_count",
    "topic_story_count",
    "mean_bias",
    "source_owners",
];

/// One outlet row of the source-bias CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutletRow {
    pub source_name: String,
    /// Outlet rating on [-2, 2].
    pub source_bias: i8,
    pub bias_dist: Vec<f64>,
    pub surprising_dist: Vec<f64>,
    pub unsurprising_dist: Vec<f64>,
    pub total_story_count: f64,
    pub topic_story_count: f64,
    pub mean_bias: Option<f64>,
    pub source_owners: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
}

/// Splits one CSV record, honoring double quotes and `""` escapes.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}

/// Splits text into records, keeping newlines that sit inside quotes.
fn records(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                cur.push(c);
            }
            '\n' if !in_quotes => out.push(std::mem::take(&mut cur)),
            '\r' if !in_quotes => {}
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub fn validate_header(header: &[String]) -> SchemaReport {
    let missing: Vec<String> = EXPECTED_COLUMNS
        .iter()
        .filter(|c| !header.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    SchemaReport {
        columns: header.to_vec(),
        ok: missing.is_empty(),
        missing,
    }
}

/// Parses the outlet CSV. Only `source_name` is required in the header;
/// other columns fall back to empty values. Rows with an empty name or a
/// column count that does not match the header are skipped and counted.
pub fn parse_outlets(text: &str) -> Result<(Vec<OutletRow>, usize), String> {
    let mut lines = records(text)
        .into_iter()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    let header: Vec<String> = match lines.next() {
        Some(h) => split_record(&h).into_iter().map(|s| s.trim().to_string()).collect(),
        None => return Err("empty csv".to_string()),
    };
    let col = |name: &str| header.iter().position(|h| h == name);
    let name_idx = col("source_name").ok_or_else(|| "missing source_name column".to_string())?;
    let idx = ColumnIndex {
        source_bias: col("source_bias"),
        bias_dist: col("bias_dist"),
        surprising_dist: col("surprising_dist"),
        unsurprising_dist: col("unsurprising_dist"),
        total_story_count: col("total_story_count"),
        topic_story_count: col("topic_story_count"),
        mean_bias: col("mean_bias"),
        source_owners: col("source_owners"),
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let fields = split_record(&line);
        if fields.len() != header.len() {
            skipped += 1;
            continue;
        }
        let name = fields[name_idx].trim();
        if name.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(idx.row(name, &fields));
    }
    Ok((rows, skipped))
}

struct ColumnIndex {
    source_bias: Option<usize>,
    bias_dist: Option<usize>,
    surprising_dist: Option<usize>,
    unsurprising_dist: Option<usize>,
    total_story_count: Option<usize>,
    topic_story_count: Option<usize>,
    mean_bias: Option<usize>,
    source_owners: Option<usize>,
}

impl ColumnIndex {
    fn row(&self, name: &str, fields: &[String]) -> OutletRow {
        let get = |i: Option<usize>| i.map(|i| fields[i].trim()).unwrap_or("");
        OutletRow {
            source_name: name.to_string(),
            source_bias: parse_rating(get(self.source_bias)),
            bias_dist: parse_dist(get(self.bias_dist)),
            surprising_dist: parse_dist(get(self.surprising_dist)),
            unsurprising_dist: parse_dist(get(self.unsurprising_dist)),
            total_story_count: parse_num(get(self.total_story_count)).unwrap_or(0.0),
            topic_story_count: parse_num(get(self.topic_story_count)).unwrap_or(0.0),
            mean_bias: parse_num(get(self.mean_bias)),
            source_owners: Some(get(self.source_owners))
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

fn parse_num(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ratings are usually numeric; categorical tags are accepted too.
fn parse_rating(s: &str) -> i8 {
    match parse_num(s) {
        Some(v) => v.round().clamp(bias::MIN_BIAS as f64, bias::MAX_BIAS as f64) as i8,
        None => bias::to_numeric(s),
    }
}

/// Embedded distributions look like "[5,10,15,20,25]". Unreadable -> empty.
pub fn parse_dist(s: &str) -> Vec<f64> {
    serde_json::from_str::<Vec<Option<f64>>>(s)
        .map(|v| v.into_iter().map(|x| x.unwrap_or(0.0)).collect())
        .unwrap_or_default()
}
