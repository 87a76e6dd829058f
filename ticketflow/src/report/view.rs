//! Report view-model derived from a state snapshot.
//!
//! Every section is gated on the stage that feeds it. A section whose stage
//! is not done yet is `None`, which a renderer shows as a placeholder.

use crate::core::{AnalysisResults, ResponseTemplate, Severity, StageId, Ticket};
use crate::pipeline::PipelineState;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Shown for an alert whose ticket carries no recommended action.
pub const DEFAULT_ALERT_ACTION: &str = "Escalate immediately";

const SENTIMENT_LABELS: [&str; 4] = ["Positive", "Neutral", "Negative", "Very Negative"];
const PRIORITY_LABELS: [&str; 4] = ["Critical", "High", "Medium", "Low"];

/// Headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// Total tickets, once the summary is done.
    pub total_tickets: Option<String>,
    /// Average resolution time in hours, once the summary is done.
    pub avg_resolution_time: Option<String>,
    /// Average satisfaction out of 5, once the summary is done.
    pub avg_satisfaction: Option<String>,
    /// Escalation-risk tickets, once escalation is done.
    pub high_risk_count: Option<String>,
}

/// One bar of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Category label.
    pub label: &'static str,
    /// Tickets in the category.
    pub count: usize,
}

/// A ticket needing immediate attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalAlert {
    /// Ticket identifier.
    pub ticket_id: String,
    /// Customer display name.
    pub customer_name: String,
    /// Support tier of the customer.
    pub customer_tier: String,
    /// Ticket subject line.
    pub subject: String,
    /// Sentiment label.
    pub sentiment: String,
    /// Risk level as reported.
    pub risk_level: String,
    /// Up to two recommended actions, comma separated.
    pub actions: String,
}

/// One row of the ticket table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRow {
    /// Ticket identifier.
    pub ticket_id: String,
    /// Customer display name.
    pub customer_name: String,
    /// Ticket subject line.
    pub subject: String,
    /// Priority from the export.
    pub priority: String,
    /// Sentiment label.
    pub sentiment: String,
    /// Risk level as reported.
    pub risk_level: String,
    /// Ticket category.
    pub category: String,
    /// Workflow status.
    pub status: String,
    /// Color-coding bucket.
    pub severity: Severity,
}

/// Trend lists from the executive summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Insights {
    /// Day-over-day observations.
    pub daily_trends: Vec<String>,
    /// Shifts between categories.
    pub category_trends: Vec<String>,
    /// New problems worth tracking.
    pub emerging_issues: Vec<String>,
}

/// Everything a renderer needs to draw the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportView {
    /// Stages done out of the total.
    pub progress: (usize, usize),
    /// Headline numbers.
    pub metrics: Metrics,
    /// Sentiment counts, once sentiment is done.
    pub sentiment_distribution: Option<Vec<Bucket>>,
    /// Priority counts, once the ticket view is done.
    pub priority_distribution: Option<Vec<Bucket>>,
    /// Present only when escalation is done and at least one ticket is high risk.
    pub critical_alerts: Option<Vec<CriticalAlert>>,
    /// Ticket table, once the ticket view is done.
    pub tickets: Option<Vec<TicketRow>>,
    /// Trend lists, once the summary is done.
    pub insights: Option<Insights>,
    /// Response templates, once the templates stage is done.
    pub templates: Option<Vec<ResponseTemplate>>,
    /// User-visible error of a failed run.
    pub error: Option<String>,
}

impl ReportView {
    /// Builds the view for the given state.
    #[must_use]
    pub fn from_state(state: &PipelineState) -> Self {
        let results = state.results();
        let tickets = results.tickets();
        let done = |stage| state.is_completed(stage);

        let summary_done = done(StageId::Summary);
        let escalation_done = done(StageId::Escalation);
        let tickets_done = done(StageId::TicketAnalysis);

        let metrics = Metrics {
            total_tickets: summary_done.then(|| {
                summary_text(results, "total_tickets")
                    .or_else(|| (!tickets.is_empty()).then(|| tickets.len().to_string()))
                    .unwrap_or_else(|| "0".to_string())
            }),
            avg_resolution_time: summary_done.then(|| {
                format!("{}h", summary_text(results, "avg_resolution_time").unwrap_or_else(|| "...".into()))
            }),
            avg_satisfaction: summary_done.then(|| {
                format!("{}/5", summary_text(results, "avg_satisfaction").unwrap_or_else(|| "...".into()))
            }),
            high_risk_count: escalation_done.then(|| {
                summary_text(results, "high_risk_count")
                    .unwrap_or_else(|| high_risk_count(tickets).to_string())
            }),
        };

        let alerts: Vec<CriticalAlert> = tickets
            .iter()
            .filter(|t| t.is_high_risk())
            .map(CriticalAlert::from_ticket)
            .collect();

        Self {
            progress: (state.completed_count(), state.stages.len()),
            metrics,
            sentiment_distribution: done(StageId::Sentiment)
                .then(|| distribution(tickets, &SENTIMENT_LABELS, |t| t.sentiment.as_deref())),
            priority_distribution: tickets_done
                .then(|| distribution(tickets, &PRIORITY_LABELS, |t| t.priority.as_deref())),
            critical_alerts: (escalation_done && !alerts.is_empty()).then_some(alerts),
            tickets: tickets_done.then(|| tickets.iter().map(TicketRow::from_ticket).collect()),
            insights: summary_done.then(|| Insights {
                daily_trends: summary_list(results, "daily_trends"),
                category_trends: summary_list(results, "category_trends"),
                emerging_issues: summary_list(results, "emerging_issues"),
            }),
            templates: done(StageId::Templates).then(|| results.templates().to_vec()),
            error: state.error.clone(),
        }
    }
}

impl CriticalAlert {
    fn from_ticket(ticket: &Ticket) -> Self {
        let actions = ticket
            .recommended_actions
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            ticket_id: field(ticket.ticket_id.as_deref()),
            customer_name: field(ticket.customer_name.as_deref()),
            customer_tier: field(ticket.customer_tier.as_deref()),
            subject: field(ticket.subject.as_deref()),
            sentiment: field(ticket.sentiment.as_deref()),
            risk_level: field(ticket.risk_level.as_deref()),
            actions: if actions.is_empty() {
                DEFAULT_ALERT_ACTION.to_string()
            } else {
                actions
            },
        }
    }
}

impl TicketRow {
    fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: field(ticket.ticket_id.as_deref()),
            customer_name: field(ticket.customer_name.as_deref()),
            subject: field(ticket.subject.as_deref()),
            priority: field(ticket.priority.as_deref()),
            sentiment: field(ticket.sentiment.as_deref()),
            risk_level: field(ticket.risk_level.as_deref()),
            category: field(ticket.category.as_deref()),
            status: field(ticket.status.as_deref()),
            severity: ticket.severity(),
        }
    }
}

/// Tickets whose risk level is HIGH or CRITICAL.
#[must_use]
pub fn high_risk_count(tickets: &[Ticket]) -> usize {
    tickets.iter().filter(|t| t.is_high_risk()).count()
}

/// The retained `{summary, tickets, templates}` document as pretty JSON.
#[must_use]
pub fn raw_json(results: &AnalysisResults) -> String {
    let raw = results.raw();
    serde_json::to_string_pretty(&raw).unwrap_or_else(|_| raw.to_string())
}

fn field(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn distribution<'a>(
    tickets: &'a [Ticket],
    labels: &[&'static str],
    key: impl Fn(&'a Ticket) -> Option<&'a str>,
) -> Vec<Bucket> {
    labels
        .iter()
        .map(|&label| Bucket {
            label,
            count: tickets.iter().filter(|&t| key(t) == Some(label)).count(),
        })
        .collect()
}

/// A summary field rendered for display, skipping empty and zero values.
fn summary_text(results: &AnalysisResults, key: &str) -> Option<String> {
    match results.summary_field(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64().is_some_and(|v| v.abs() < f64::EPSILON) => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn summary_list(results: &AnalysisResults, key: &str) -> Vec<String> {
    match results.summary_field(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PENDING: &str = "...";
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| PENDING.to_string());

        writeln!(f, "Progress: {}/{} stages", self.progress.0, self.progress.1)?;
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }

        writeln!(f, "\n== Metrics ==")?;
        writeln!(f, "Total tickets:    {}", show(&self.metrics.total_tickets))?;
        writeln!(f, "Avg resolution:   {}", show(&self.metrics.avg_resolution_time))?;
        writeln!(f, "Avg satisfaction: {}", show(&self.metrics.avg_satisfaction))?;
        writeln!(f, "High risk:        {}", show(&self.metrics.high_risk_count))?;

        for (title, buckets) in [
            ("Sentiment", &self.sentiment_distribution),
            ("Priority", &self.priority_distribution),
        ] {
            writeln!(f, "\n== {title} ==")?;
            match buckets {
                Some(buckets) => {
                    for b in buckets {
                        writeln!(f, "{:<14} {}", b.label, b.count)?;
                    }
                }
                None => writeln!(f, "{PENDING}")?,
            }
        }

        if let Some(alerts) = &self.critical_alerts {
            writeln!(f, "\n== Critical Alerts ==")?;
            for a in alerts {
                writeln!(
                    f,
                    "[{}] {} ({}, {}) {}: {} / {} -> {}",
                    a.risk_level,
                    a.ticket_id,
                    a.customer_name,
                    a.customer_tier,
                    a.subject,
                    a.sentiment,
                    a.risk_level,
                    a.actions
                )?;
            }
        }

        writeln!(f, "\n== Tickets ==")?;
        match &self.tickets {
            Some(rows) if rows.is_empty() => writeln!(f, "(none)")?,
            Some(rows) => {
                for r in rows {
                    writeln!(
                        f,
                        "{:<8} {:<10} {:<24} {:<9} {:<14} {:<9} {}",
                        r.severity, r.ticket_id, r.subject, r.priority, r.sentiment, r.risk_level, r.status
                    )?;
                }
            }
            None => writeln!(f, "{PENDING}")?,
        }

        writeln!(f, "\n== Insights ==")?;
        match &self.insights {
            Some(insights) => {
                for (title, items) in [
                    ("Daily trends", &insights.daily_trends),
                    ("Category trends", &insights.category_trends),
                    ("Emerging issues", &insights.emerging_issues),
                ] {
                    writeln!(f, "{title}:")?;
                    for item in items {
                        writeln!(f, "  - {item}")?;
                    }
                }
            }
            None => writeln!(f, "{PENDING}")?,
        }

        writeln!(f, "\n== Response Templates ==")?;
        match &self.templates {
            Some(templates) if templates.is_empty() => writeln!(f, "(none)"),
            Some(templates) => {
                for t in templates {
                    writeln!(
                        f,
                        "{} / {} / {}: {}",
                        t.category.as_deref().unwrap_or("-"),
                        t.sentiment.as_deref().unwrap_or("-"),
                        t.tier.as_deref().unwrap_or("-"),
                        t.template_text.as_deref().unwrap_or_default()
                    )?;
                }
                Ok(())
            }
            None => writeln!(f, "{PENDING}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResultFragment, ResultSlot};
    use crate::pipeline::support_analysis_pipeline;
    use crate::testing::{SAMPLE_SUMMARY_JSON, SAMPLE_TEMPLATES_JSON, SAMPLE_TICKETS_JSON};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn fragment(json: &str, slot: ResultSlot) -> ResultFragment {
        slot.fragment_from_value(serde_json::from_str(json).unwrap()).unwrap()
    }

    fn finished_state() -> PipelineState {
        let graph = support_analysis_pipeline().unwrap();
        let mut state = PipelineState::new(&graph);
        state.start_run(Uuid::new_v4());
        for stage in StageId::ALL {
            state.begin(stage).unwrap();
            let frag = match stage {
                StageId::Templates => Some(fragment(SAMPLE_TEMPLATES_JSON, ResultSlot::Templates)),
                StageId::Summary => Some(fragment(SAMPLE_SUMMARY_JSON, ResultSlot::Summary)),
                StageId::TicketAnalysis => Some(fragment(SAMPLE_TICKETS_JSON, ResultSlot::Tickets)),
                _ => None,
            };
            state.complete(stage, frag).unwrap();
        }
        state
    }

    #[test]
    fn test_pending_state_has_only_placeholders() {
        let graph = support_analysis_pipeline().unwrap();
        let view = ReportView::from_state(&PipelineState::new(&graph));

        assert_eq!(view.progress, (0, 7));
        assert_eq!(view.metrics, Metrics::default());
        assert!(view.sentiment_distribution.is_none());
        assert!(view.critical_alerts.is_none());
        assert!(view.tickets.is_none());
        assert!(view.insights.is_none());
        assert!(view.templates.is_none());
    }

    #[test]
    fn test_finished_report() {
        let view = ReportView::from_state(&finished_state());

        assert_eq!(view.progress, (7, 7));
        assert_eq!(view.metrics.total_tickets.as_deref(), Some("3"));
        assert_eq!(view.metrics.avg_resolution_time.as_deref(), Some("41.3h"));
        assert_eq!(view.metrics.avg_satisfaction.as_deref(), Some("2.3/5"));
        assert_eq!(view.metrics.high_risk_count.as_deref(), Some("2"));

        let sentiment: Vec<usize> = view
            .sentiment_distribution
            .unwrap()
            .iter()
            .map(|b| b.count)
            .collect();
        assert_eq!(sentiment, vec![1, 0, 1, 1]);
        let priority: Vec<usize> = view
            .priority_distribution
            .unwrap()
            .iter()
            .map(|b| b.count)
            .collect();
        assert_eq!(priority, vec![1, 1, 0, 1]);

        let alerts = view.critical_alerts.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].ticket_id, "T-1001");
        assert_eq!(alerts[0].actions, "Call customer, Issue refund");
        assert_eq!(alerts[1].actions, DEFAULT_ALERT_ACTION);

        let rows = view.tickets.unwrap();
        assert_eq!(rows[2].severity, Severity::Critical);
        assert_eq!(view.insights.unwrap().emerging_issues, vec!["Refund delays".to_string()]);
        assert_eq!(view.templates.unwrap().len(), 1);
    }

    #[test]
    fn test_metric_fallbacks() {
        let mut state = finished_state();
        state.results.summary = Some(serde_json::Map::new());
        let view = ReportView::from_state(&state);

        assert_eq!(view.metrics.total_tickets.as_deref(), Some("3"));
        assert_eq!(view.metrics.avg_resolution_time.as_deref(), Some("...h"));
        assert_eq!(view.metrics.high_risk_count.as_deref(), Some("2"));
        assert_eq!(view.insights.unwrap(), Insights::default());
    }

    #[test]
    fn test_alerts_hidden_without_high_risk() {
        let mut state = finished_state();
        if let Some(tickets) = state.results.tickets.as_mut() {
            for t in tickets.iter_mut() {
                t.risk_level = Some("LOW".into());
            }
        }
        let view = ReportView::from_state(&state);
        assert!(view.critical_alerts.is_none());
    }

    #[test]
    fn test_raw_json_is_pretty() {
        let state = finished_state();
        let raw = raw_json(state.results());
        assert!(raw.contains("\n  \"summary\""));
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["tickets"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_display_lists_sections() {
        let text = ReportView::from_state(&finished_state()).to_string();
        assert!(text.contains("Progress: 7/7 stages"));
        assert!(text.contains("== Critical Alerts =="));
        assert!(text.contains("Refund delays"));
    }
}
