//! Benchmarks for the report export path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ticketflow::core::Ticket;
use ticketflow::report::{export_tickets_csv, parse_exported_csv};

fn tickets(n: usize) -> Vec<Ticket> {
    (0..n)
        .map(|i| Ticket {
            ticket_id: Some(format!("T-{i}")),
            customer_name: Some(format!("Customer {i}")),
            subject: Some(format!("Issue {i}, \"urgent\"")),
            priority: Some(["Low", "Medium", "High", "Critical"][i % 4].to_string()),
            sentiment: Some("Negative".to_string()),
            risk_level: Some("HIGH".to_string()),
            category: Some("Billing".to_string()),
            status: Some("Open".to_string()),
            ..Ticket::default()
        })
        .collect()
}

fn export_benchmark(c: &mut Criterion) {
    let rows = tickets(1_000);
    c.bench_function("export_1000_tickets", |b| {
        b.iter(|| black_box(export_tickets_csv(black_box(&rows))));
    });

    let csv = export_tickets_csv(&rows).unwrap_or_default();
    c.bench_function("parse_1000_tickets", |b| {
        b.iter(|| black_box(parse_exported_csv(black_box(&csv))));
    });
}

criterion_group!(benches, export_benchmark);
criterion_main!(benches);
