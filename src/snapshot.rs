//! The JSON document the session host pipes in on every status-line tick.
//!
//! Every field is optional. A field with an unexpected JSON type decodes as
//! absent instead of failing the whole document, so only text that is not JSON
//! at all is a parse error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::agent::SubAgent;

/// Context window assumed when the host omits `context_window_size`.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "lenient")]
    pub model: Option<ModelInfo>,
    #[serde(deserialize_with = "lenient")]
    pub context_window: Option<ContextWindow>,
    #[serde(deserialize_with = "lenient")]
    pub cost: Option<CostInfo>,
    #[serde(deserialize_with = "lenient")]
    pub workspace: Option<Workspace>,
    /// Pre-resolved agent list. When non-empty it replaces transcript detection.
    #[serde(deserialize_with = "lenient_vec")]
    pub sub_agents: Option<Vec<SubAgent>>,
    #[serde(deserialize_with = "lenient")]
    pub transcript_path: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextWindow {
    #[serde(deserialize_with = "lenient")]
    pub used_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub context_window_size: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub current_usage: Option<CurrentUsage>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_input_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_output_tokens: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurrentUsage {
    #[serde(deserialize_with = "lenient_count")]
    pub input_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub cache_creation_input_tokens: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CostInfo {
    #[serde(deserialize_with = "lenient")]
    pub total_cost_usd: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_duration_ms: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_lines_added: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_lines_removed: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Workspace {
    #[serde(deserialize_with = "lenient")]
    pub current_dir: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub project_dir: Option<String>,
}

impl Snapshot {
    /// Parse raw stdin text. Fails only when the text is not a JSON value.
    pub fn parse(input: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Ok(Self::from_value(value))
    }

    /// Decode an already-parsed document; anything but an object yields defaults.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Decode `T`, or `None` when the value is null or has the wrong shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] but substitutes `T::default()` for a missing or mistyped value.
pub(crate) fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(deserializer).map(Option::unwrap_or_default)
}

/// Decode a non-negative count. JSON numbers carry no integer type, so an
/// integral float like `150000.0` is accepted and any fraction is floored.
/// Negative, non-finite or non-numeric values decode as `None`.
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let count = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.floor() as u64)
        }),
        _ => None,
    };
    Ok(count)
}

/// [`lenient_count`] with zero for a missing or unusable value.
pub(crate) fn lenient_count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_count(deserializer).map(|count| count.unwrap_or(0))
}

/// Decode an array element by element, dropping entries that don't decode.
/// A non-array value decodes as `None`.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}
