//! Criterion benchmarks for checkpoint dispatch.
//!
//! Measures how long a checkpoint takes when a batch of insertions is routed
//! through one or several watches on the same document.

#![allow(clippy::expect_used)]

use anyhow::Error;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dom::{Document, DocumentConfig, NodeKey};
use perpetual::{Watch as _, text_of};
use std::hint::black_box;

/// Build `count` detached divs, every other one an `.item`, each with one text child.
fn build_items(doc: &mut Document, count: usize) -> Result<Vec<NodeKey>, Error> {
    (0..count)
        .map(|index| {
            let element = doc.create_element("div");
            doc.set_attribute(element, "class", if index % 2 == 0 { "item" } else { "other" })?;
            let text = doc.create_text(&format!("item {index}"));
            doc.append_child(element, text)?;
            Ok(element)
        })
        .collect()
}

/// One round: register `watches` watches, insert `count` divs, run one checkpoint.
fn dispatch_round(count: usize, watches: usize) -> Result<usize, Error> {
    let mut doc = Document::with_config(&DocumentConfig::default());
    let body = doc.body().unwrap_or_else(|| doc.document_node());
    let handles = (0..watches)
        .map(|_| Ok(doc.watch(".item")?.map(text_of)))
        .collect::<Result<Vec<_>, Error>>()?;
    let items = build_items(&mut doc, count)?;
    doc.append_children(body, &items)?;
    doc.checkpoint()?;
    Ok(handles.iter().map(|handle| handle.dispatched()).sum())
}

fn bench_dispatch(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("checkpoint_dispatch");
    for &count in &[100_usize, 1_000_usize] {
        for &watches in &[1_usize, 8_usize] {
            group.bench_with_input(
                BenchmarkId::new(format!("{watches}_watches"), count),
                &count,
                |bencher, &count| {
                    bencher.iter(|| {
                        let dispatched =
                            dispatch_round(count, watches).expect("dispatch round failed");
                        black_box(dispatched);
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
