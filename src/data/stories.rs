use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One article inside a story cluster, as published in the story JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_bias: String,
    /// 0..4 rating, number or numeric string; validated when the timeline is built.
    #[serde(default)]
    pub bias: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default)]
    pub article_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub surprise_index: f64,
    /// Whole post count; float and string renderings are accepted.
    #[serde(default, deserialize_with = "lenient_count")]
    pub first_to_threshold: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub articles: Vec<Article>,
    /// Index-aligned with the date-sorted articles; null entries have no value.
    #[serde(default)]
    pub polarization: Option<Vec<Option<f64>>>,
}

impl Story {
    /// Stable string key for the story id, whether it was a number or a string.
    pub fn key(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Explicit nulls read the same as a missing key.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn lenient_count<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(d)?;
    let v = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(v.filter(|v| v.is_finite() && *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32))
}

/// Parses a story array. Entries that do not match the story shape are
/// skipped and counted instead of failing the whole document.
pub fn parse_stories(text: &str) -> Result<(Vec<Story>, usize), String> {
    let doc: Value = serde_json::from_str(text).map_err(|e| format!("bad story json: {}", e))?;
    let items = match doc {
        Value::Array(items) => items,
        other => {
            return Err(format!(
                "expected a json array of stories, got {}",
                json_kind(&other)
            ))
        }
    };
    let mut stories = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match serde_json::from_value::<Story>(item) {
            Ok(story) => stories.push(story),
            Err(_) => skipped += 1,
        }
    }
    Ok((stories, skipped))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
