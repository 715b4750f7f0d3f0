//! Throughput of the cell interpreter (C6) over a typed, multi-column row.
//!
//! Grounded on the teacher's `benches/index_vs_sort.rs` harness shape
//! (synthesize fixture data, benchmark_group, `iter_batched`), retargeted
//! from CLI `process::execute` calls to direct `cell::interpret_row` calls.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use csvw::cell;
use csvw::context::Context;
use csvw::error::Diagnostics;
use csvw::metadata::parse::{Metadata, ParseOptions};
use csvw::metadata::{NodeId, NodeKind};

fn orders_schema() -> Metadata {
    let document = serde_json::json!({
        "tables": [{
            "url": "orders.csv",
            "tableSchema": {
                "columns": [
                    {"name": "id", "datatype": "integer"},
                    {"name": "ordered_at", "datatype": "date"},
                    {"name": "ship_time", "datatype": "time"},
                    {"name": "status", "datatype": "string"},
                    {"name": "total", "datatype": {"base": "decimal", "minimum": "0"}}
                ]
            }
        }]
    });
    let mut diagnostics = Diagnostics::new();
    Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).expect("parse orders schema")
}

fn schema_id(metadata: &Metadata) -> NodeId {
    let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else { unreachable!() };
    let NodeKind::Table(table) = &metadata.arena.node(group.tables[0]).kind else { unreachable!() };
    table.schema.expect("orders table has a schema")
}

fn bench_interpret_row(c: &mut Criterion) {
    let metadata = orders_schema();
    let schema = schema_id(&metadata);
    let base = Context::with_base(url::Url::parse("http://example.org/orders.csv").unwrap());
    let row: Vec<String> = vec![
        "10427".to_string(),
        "2024-01-17".to_string(),
        "13:45:00".to_string(),
        "shipped".to_string(),
        "129.99".to_string(),
    ];

    let mut group = c.benchmark_group("cell_interpret_row");
    group.bench_function("typed_five_column_row", |b| {
        b.iter_batched(
            || row.clone(),
            |raw| {
                let cells = cell::interpret_row(&metadata, schema, &raw, 1, 1, &base);
                criterion::black_box(cells);
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_interpret_row);
criterion_main!(benches);
