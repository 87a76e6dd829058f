//! CSV export of the fused ticket view.

use crate::core::Ticket;
use crate::errors::TicketflowError;
use serde::{Deserialize, Serialize};

/// File name offered for the export.
pub const DEFAULT_EXPORT_FILE: &str = "support_analysis_results.csv";

/// Export column titles, in order.
pub const EXPORT_HEADER: [&str; 8] = [
    "Ticket ID",
    "Customer",
    "Subject",
    "Priority",
    "Sentiment",
    "Risk Level",
    "Category",
    "Status",
];

/// One exported ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// `Ticket ID` column.
    pub ticket_id: String,
    /// `Customer` column.
    pub customer_name: String,
    /// `Subject` column.
    pub subject: String,
    /// `Priority` column.
    pub priority: String,
    /// `Sentiment` column.
    pub sentiment: String,
    /// `Risk Level` column.
    pub risk_level: String,
    /// `Category` column.
    pub category: String,
    /// `Status` column.
    pub status: String,
}

impl ExportRow {
    fn from_ticket(ticket: &Ticket) -> Self {
        let get = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            ticket_id: get(&ticket.ticket_id),
            customer_name: get(&ticket.customer_name),
            subject: get(&ticket.subject),
            priority: get(&ticket.priority),
            sentiment: get(&ticket.sentiment),
            risk_level: get(&ticket.risk_level),
            category: get(&ticket.category),
            status: get(&ticket.status),
        }
    }

    fn fields(&self) -> [&str; 8] {
        [
            self.ticket_id.as_str(),
            self.customer_name.as_str(),
            self.subject.as_str(),
            self.priority.as_str(),
            self.sentiment.as_str(),
            self.risk_level.as_str(),
            self.category.as_str(),
            self.status.as_str(),
        ]
    }
}

/// Renders tickets as CSV, one line per ticket after the header.
///
/// Returns `None` for an empty list since there is nothing to download.
/// The subject is always quoted; other fields only when they contain a
/// comma, quote or line break.
#[must_use]
pub fn export_tickets_csv(tickets: &[Ticket]) -> Option<String> {
    if tickets.is_empty() {
        return None;
    }

    let mut out = EXPORT_HEADER.join(",");
    for ticket in tickets {
        let row = ExportRow::from_ticket(ticket);
        out.push('\n');
        for (i, value) in row.fields().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_field(&mut out, value, i == 2);
        }
    }
    Some(out)
}

fn push_field(out: &mut String, value: &str, always_quote: bool) {
    if always_quote || value.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&value.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(value);
    }
}

/// Reads an export back into rows.
///
/// # Errors
///
/// Returns [`TicketflowError::InvalidInput`] when the header does not match,
/// a quoted field is not terminated, or a row has the wrong number of fields.
pub fn parse_exported_csv(content: &str) -> Result<Vec<ExportRow>, TicketflowError> {
    let mut records = parse_records(content)?.into_iter();

    let header = records
        .next()
        .ok_or_else(|| TicketflowError::InvalidInput("export is empty".into()))?;
    if header != EXPORT_HEADER {
        return Err(TicketflowError::InvalidInput(format!(
            "unexpected export header: {}",
            header.join(",")
        )));
    }

    records
        .enumerate()
        .filter(|(_, record)| !(record.len() == 1 && record[0].is_empty()))
        .map(|(line, record)| {
            let Ok([ticket_id, customer_name, subject, priority, sentiment, risk_level, category, status]) =
                <[String; 8]>::try_from(record)
            else {
                return Err(TicketflowError::InvalidInput(format!(
                    "record {} does not have {} fields",
                    line + 1,
                    EXPORT_HEADER.len()
                )));
            };
            Ok(ExportRow {
                ticket_id,
                customer_name,
                subject,
                priority,
                sentiment,
                risk_level,
                category,
                status,
            })
        })
        .collect()
}

/// Splits RFC 4180 text into records of unquoted fields.
fn parse_records(content: &str) -> Result<Vec<Vec<String>>, TicketflowError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(TicketflowError::InvalidInput(
            "unterminated quoted field".into(),
        ));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
