//! Full-pass expansion benchmark over a synthetic catalog.

use criterion::{criterion_group, criterion_main, Criterion};
use event_engine::{expand_all, EventDefinition, ExpansionOptions, MemoryCatalog, MemoryTaxonomy, Record};
use std::hint::black_box;

fn synthetic_catalog(size: usize) -> Vec<Record> {
    let freqs = ["daily", "weekly", "monthly", "yearly"];
    (0..size)
        .map(|i| {
            let day = i % 28 + 1;
            let mut event = EventDefinition::new(
                format!("01/{day:02}/2024 9:00am"),
                format!("01/{day:02}/2024 10:30am"),
            )
            .with_freq(freqs[i % freqs.len()])
            .with_category(format!("cat-{}", i % 7));
            if i % 3 == 0 {
                event = event.with_repeat("MWF");
            }
            Record::new(format!("events/{i}"), format!("/events/{i}")).with_event(event)
        })
        .collect()
}

fn bench_expand_all(c: &mut Criterion) {
    let records = synthetic_catalog(200);
    let options = ExpansionOptions::default();

    c.bench_function("expand_all_200_records", |b| {
        b.iter(|| {
            let mut catalog = MemoryCatalog::from_records(records.clone()).unwrap();
            let mut taxonomy = MemoryTaxonomy::new();
            let expansion = expand_all(&mut catalog, &mut taxonomy, &options).unwrap();
            black_box(expansion.instances_added())
        })
    });
}

criterion_group!(benches, bench_expand_all);
criterion_main!(benches);
