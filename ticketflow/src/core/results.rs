//! Locally retained stage results.

use super::ticket::{ResponseTemplate, Ticket};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a retained stage's output lands in [`AnalysisResults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSlot {
    /// Response templates (JSON array).
    Templates,
    /// Executive summary (JSON object).
    Summary,
    /// Fused ticket rows (JSON array).
    Tickets,
}

impl ResultSlot {
    /// The value used when the service returns no `text_value`.
    #[must_use]
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Summary => Value::Object(Map::new()),
            Self::Templates | Self::Tickets => Value::Array(Vec::new()),
        }
    }

    /// Converts raw JSON into the typed fragment for this slot.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the JSON has the wrong shape.
    pub fn fragment_from_value(&self, value: Value) -> Result<ResultFragment, String> {
        match self {
            Self::Summary => match value {
                Value::Object(map) => Ok(ResultFragment::Summary(map)),
                other => Err(format!("expected a JSON object, got {}", kind_of(&other))),
            },
            Self::Templates => serde_json::from_value::<Vec<ResponseTemplate>>(array_or_err(value)?)
                .map(ResultFragment::Templates)
                .map_err(|e| e.to_string()),
            Self::Tickets => serde_json::from_value::<Vec<Ticket>>(array_or_err(value)?)
                .map(ResultFragment::Tickets)
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for ResultSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Templates => write!(f, "templates"),
            Self::Summary => write!(f, "summary"),
            Self::Tickets => write!(f, "tickets"),
        }
    }
}

fn array_or_err(value: Value) -> Result<Value, String> {
    match value {
        Value::Array(_) => Ok(value),
        other => Err(format!("expected a JSON array, got {}", kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A retained stage output, ready to merge into [`AnalysisResults`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", content = "value", rename_all = "snake_case")]
pub enum ResultFragment {
    /// Response templates.
    Templates(Vec<ResponseTemplate>),
    /// Executive summary object.
    Summary(Map<String, Value>),
    /// Fused ticket rows.
    Tickets(Vec<Ticket>),
}

impl ResultFragment {
    /// The slot this fragment fills.
    #[must_use]
    pub fn slot(&self) -> ResultSlot {
        match self {
            Self::Templates(_) => ResultSlot::Templates,
            Self::Summary(_) => ResultSlot::Summary,
            Self::Tickets(_) => ResultSlot::Tickets,
        }
    }
}

/// The accumulated report data of one run.
///
/// Slots only ever go from unset to set within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Executive summary, once the summary stage is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Map<String, Value>>,
    /// Ticket rows, once the aggregation stage is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets: Option<Vec<Ticket>>,
    /// Response templates, once the templates stage is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<ResponseTemplate>>,
}

impl AnalysisResults {
    /// Merges a fragment into its slot.
    ///
    /// Returns false and leaves the results untouched if the slot is
    /// already populated.
    pub fn merge(&mut self, fragment: ResultFragment) -> bool {
        match fragment {
            ResultFragment::Summary(map) if self.summary.is_none() => self.summary = Some(map),
            ResultFragment::Tickets(rows) if self.tickets.is_none() => self.tickets = Some(rows),
            ResultFragment::Templates(rows) if self.templates.is_none() => {
                self.templates = Some(rows);
            }
            _ => return false,
        }
        true
    }

    /// Whether the given slot has been populated.
    #[must_use]
    pub fn has(&self, slot: ResultSlot) -> bool {
        match slot {
            ResultSlot::Summary => self.summary.is_some(),
            ResultSlot::Tickets => self.tickets.is_some(),
            ResultSlot::Templates => self.templates.is_some(),
        }
    }

    /// Ticket rows, empty until aggregation completes.
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        self.tickets.as_deref().unwrap_or_default()
    }

    /// Templates, empty until the templates stage completes.
    #[must_use]
    pub fn templates(&self) -> &[ResponseTemplate] {
        self.templates.as_deref().unwrap_or_default()
    }

    /// A summary field, if the summary is present and has it.
    #[must_use]
    pub fn summary_field(&self, key: &str) -> Option<&Value> {
        self.summary.as_ref().and_then(|map| map.get(key))
    }

    /// The raw `{summary, tickets, templates}` document.
    #[must_use]
    pub fn raw(&self) -> Value {
        serde_json::json!({
            "summary": self.summary.clone().unwrap_or_default(),
            "tickets": self.tickets(),
            "templates": self.templates(),
        })
    }
}
