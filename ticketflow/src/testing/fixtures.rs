//! Sample uploads and canned stage outputs.

use super::ScriptedPromptService;
use crate::ingest::{Upload, CSV_MIME};

/// Header of the support ticket export.
pub const CSV_HEADER: &str = "ticket_id,customer_name,customer_email,subject,description,priority,category,status,created_date,assigned_agent,customer_tier,resolution_time_hours,satisfaction_score";

/// Three tickets of mixed priority.
pub const SAMPLE_CSV: &str = "\
ticket_id,customer_name,customer_email,subject,description,priority,category,status,created_date,assigned_agent,customer_tier,resolution_time_hours,satisfaction_score
T-1001,Ada Park,ada@example.com,Refund not received,\"I want a refund now, or I cancel\",High,Billing,Open,2024-03-01,Sam,VIP,52,1
T-1002,Ben Ruiz,ben@example.com,Password reset,Reset link works fine,Low,Technical,Closed,2024-03-02,Kim,Standard,2,5
T-1003,Cy Moss,cy@example.com,Outage,\"Service down, need a manager\",Critical,Technical,Open,2024-03-02,Sam,Premium,70,1
";

/// Fused ticket view for [`SAMPLE_CSV`].
pub const SAMPLE_TICKETS_JSON: &str = r#"[
  {"ticket_id": "T-1001", "customer_name": "Ada Park", "subject": "Refund not received",
   "priority": "High", "category": "Billing", "status": "Open", "sentiment": "Very Negative",
   "emotion": "angry", "risk_level": "HIGH", "risk_factors": ["VIP customer", "refund"],
   "recommended_actions": ["Call customer", "Issue refund", "Notify billing lead"],
   "priority_score": 9},
  {"ticket_id": "T-1002", "customer_name": "Ben Ruiz", "subject": "Password reset",
   "priority": "Low", "category": "Technical", "status": "Closed", "sentiment": "Positive",
   "risk_level": "LOW", "priority_score": 2},
  {"ticket_id": "T-1003", "customer_name": "Cy Moss", "subject": "Outage, full stop",
   "priority": "Critical", "category": "Technical", "status": "Open", "sentiment": "Negative",
   "risk_level": "CRITICAL", "priority_score": 10}
]"#;

/// Executive summary for [`SAMPLE_CSV`].
pub const SAMPLE_SUMMARY_JSON: &str = r#"{
  "total_tickets": 3,
  "avg_resolution_time": 41.3,
  "avg_satisfaction": 2.3,
  "high_risk_count": 2,
  "daily_trends": ["Two critical issues opened on 2024-03-02"],
  "category_trends": ["Technical tickets dominate"],
  "emerging_issues": ["Refund delays"]
}"#;

/// Response templates for [`SAMPLE_CSV`].
pub const SAMPLE_TEMPLATES_JSON: &str = r#"[
  {"category": "Billing", "sentiment": "Very Negative", "tier": "VIP",
   "template_text": "Dear [CUSTOMER_NAME], we are sorry about [SPECIFIC_ISSUE].",
   "tone_notes": "Apologetic"}
]"#;

/// Three low-priority tickets without negative sentiment.
pub const LOW_PRIORITY_CSV: &str = "\
ticket_id,customer_name,customer_email,subject,description,priority,category,status,created_date,assigned_agent,customer_tier,resolution_time_hours,satisfaction_score
L-1,Dee,dee@example.com,Question,How do I export?,Low,Product,Closed,2024-04-01,Kim,Standard,1,5
L-2,Eli,eli@example.com,Thanks,Great support,Low,Product,Closed,2024-04-01,Kim,Standard,1,5
L-3,Fay,fay@example.com,Docs,Where are the docs?,Low,Product,Open,2024-04-02,Sam,Premium,3,4
";

/// Fused ticket view for [`LOW_PRIORITY_CSV`].
pub const LOW_PRIORITY_TICKETS_JSON: &str = r#"[
  {"ticket_id": "L-1", "priority": "Low", "sentiment": "Neutral", "risk_level": "LOW"},
  {"ticket_id": "L-2", "priority": "Low", "sentiment": "Positive", "risk_level": "LOW"},
  {"ticket_id": "L-3", "priority": "Low", "sentiment": "Neutral", "risk_level": "LOW"}
]"#;

/// Executive summary for [`LOW_PRIORITY_CSV`].
pub const LOW_PRIORITY_SUMMARY_JSON: &str = r#"{"total_tickets": 3, "high_risk_count": 0}"#;

/// A CSV upload of `content` named `tickets.csv`.
#[must_use]
pub fn csv_upload(content: &str) -> Upload {
    Upload::new("tickets.csv", content).with_mime_type(CSV_MIME)
}

/// A service answering the retained stages with the given texts.
#[must_use]
pub fn scripted_service(tickets: &str, summary: &str, templates: &str) -> ScriptedPromptService {
    ScriptedPromptService::new()
        .with_output("ticket_analysis", tickets)
        .with_output("executive_summary", summary)
        .with_output("response_templates", templates)
}

/// A service answering with the [`SAMPLE_CSV`] outputs.
#[must_use]
pub fn sample_service() -> ScriptedPromptService {
    scripted_service(SAMPLE_TICKETS_JSON, SAMPLE_SUMMARY_JSON, SAMPLE_TEMPLATES_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_csvs_share_header() {
        for csv in [SAMPLE_CSV, LOW_PRIORITY_CSV] {
            assert_eq!(csv.lines().next(), Some(CSV_HEADER));
            assert!(csv_upload(csv).validate().is_ok());
        }
    }

    #[test]
    fn test_fixture_json_parses() {
        for text in [
            SAMPLE_TICKETS_JSON,
            SAMPLE_SUMMARY_JSON,
            SAMPLE_TEMPLATES_JSON,
            LOW_PRIORITY_TICKETS_JSON,
            LOW_PRIORITY_SUMMARY_JSON,
        ] {
            assert!(serde_json::from_str::<serde_json::Value>(text).is_ok());
        }
    }
}
