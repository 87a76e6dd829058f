//! Ticket and template rows produced by the retained stages.

use super::lenient::{opt_number, opt_string, string_list};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the fused per-ticket view.
///
/// Fields from the uploaded CSV are merged with sentiment, risk and category
/// outputs by the aggregation stage. Anything the service adds beyond the
/// known columns is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier; numeric ids are read as text.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    /// Customer display name.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Customer contact address.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Ticket subject line.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Free-text body of the ticket.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority from the export, e.g. `High`.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Category after the categorization stage.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Workflow status, e.g. `Open`.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation date as exported.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    /// Agent handling the ticket.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    /// Support tier of the customer.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub customer_tier: Option<String>,
    /// Hours to resolution, if resolved.
    #[serde(default, deserialize_with = "opt_number", skip_serializing_if = "Option::is_none")]
    pub resolution_time_hours: Option<f64>,
    /// Customer satisfaction rating.
    #[serde(default, deserialize_with = "opt_number", skip_serializing_if = "Option::is_none")]
    pub satisfaction_score: Option<f64>,
    /// Sentiment label, e.g. `Very Negative`.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Dominant emotion found in the text.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Escalation risk as reported; see [`Ticket::risk`].
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    /// Reasons behind the risk level.
    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<String>,
    /// Suggested next steps, most important first.
    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub recommended_actions: Vec<String>,
    /// Numeric score combining priority and risk.
    #[serde(default, deserialize_with = "opt_number", skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Ticket {
    /// Parsed risk level, if present and recognised.
    #[must_use]
    pub fn risk(&self) -> Option<RiskLevel> {
        self.risk_level.as_deref().and_then(|s| s.parse().ok())
    }

    /// Whether the ticket belongs in the critical alerts list.
    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        matches!(self.risk(), Some(RiskLevel::High | RiskLevel::Critical))
    }

    /// Display severity derived from risk level first, then priority.
    #[must_use]
    pub fn severity(&self) -> Severity {
        let risk = self.risk();
        let priority = self.priority.as_deref().map(str::trim);
        if risk == Some(RiskLevel::Critical) || priority == Some("Critical") {
            Severity::Critical
        } else if risk == Some(RiskLevel::High) || priority == Some("High") {
            Severity::High
        } else if risk == Some(RiskLevel::Medium) || priority == Some("Medium") {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A generated reply template for a category / sentiment / tier combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    /// Ticket category the template answers.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sentiment the tone is tuned for.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Customer tier the template targets.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// The reply text.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub template_text: Option<String>,
    /// Guidance on how to adapt the tone.
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub tone_notes: Option<String>,
    /// Fields not covered above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Escalation risk as reported by the risk stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// No sign of escalation.
    Low,
    /// Worth watching.
    Medium,
    /// Likely to escalate.
    High,
    /// Needs action now.
    Critical,
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Color-coding bucket for a ticket row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine.
    Low,
    /// Elevated.
    Medium,
    /// High priority or risk.
    High,
    /// Critical priority or risk.
    Critical,
}

impl Severity {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_from_model_output() {
        let ticket: Ticket = serde_json::from_value(json!({
            "ticket_id": 1001,
            "customer_name": "Ada",
            "priority": "High",
            "risk_level": "critical",
            "recommended_actions": "Call the customer",
            "resolution_time_hours": "52",
            "color": "red"
        }))
        .unwrap();

        assert_eq!(ticket.ticket_id.as_deref(), Some("1001"));
        assert_eq!(ticket.risk(), Some(RiskLevel::Critical));
        assert!(ticket.is_high_risk());
        assert_eq!(ticket.recommended_actions, vec!["Call the customer".to_string()]);
        assert_eq!(ticket.resolution_time_hours, Some(52.0));
        assert_eq!(ticket.extra.get("color"), Some(&json!("red")));
    }

    #[test]
    fn test_severity_prefers_risk_then_priority() {
        let mut ticket = Ticket {
            priority: Some("Low".into()),
            risk_level: Some("HIGH".into()),
            ..Ticket::default()
        };
        assert_eq!(ticket.severity(), Severity::High);

        ticket.risk_level = Some("LOW".into());
        ticket.priority = Some("Critical".into());
        assert_eq!(ticket.severity(), Severity::Critical);

        ticket.priority = Some("Low".into());
        assert_eq!(ticket.severity(), Severity::Low);
    }

    #[test]
    fn test_unknown_risk_is_not_high() {
        let ticket = Ticket {
            risk_level: Some("severe-ish".into()),
            ..Ticket::default()
        };
        assert_eq!(ticket.risk(), None);
        assert!(!ticket.is_high_risk());
    }

    #[test]
    fn test_template_roundtrip_keeps_extra() {
        let template: ResponseTemplate = serde_json::from_value(json!({
            "category": "Billing",
            "tier": "VIP",
            "template_text": "Hi [CUSTOMER_NAME]",
            "language": "en"
        }))
        .unwrap();
        let back = serde_json::to_value(&template).unwrap();
        assert_eq!(back["language"], json!("en"));
        assert_eq!(back["tier"], json!("VIP"));
        assert!(back.get("sentiment").is_none());
    }
}
