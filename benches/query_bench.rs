use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tempfile::TempDir;

use folio::config::IndexSettings;
use folio::engine::QueryEngine;
use folio::index::IndexStore;
use folio::models::{Caller, QueryRequest, SortOrder, VisibilityMode};
use folio::source::MemoryDocumentSource;

const WORDS: &[&str] = &[
    "pneumothorax", "effusion", "fracture", "hemangioma", "infarct", "embolism",
    "consolidation", "nodule", "stenosis", "aneurysm",
];
const MODALITIES: &[&str] = &["CT", "MR", "CR", "US"];

struct BenchEnv {
    _tmp: TempDir,
    engine: QueryEngine,
}

fn build_env(doc_count: usize) -> BenchEnv {
    let tmp = TempDir::new().unwrap();
    let source = Arc::new(MemoryDocumentSource::new());
    for i in 0..doc_count {
        source.insert_json(
            format!("docs/{:06}.json", i),
            &json!({
                "title": format!("{} case {}", WORDS[i % WORDS.len()], i),
                "modality": MODALITIES[i % MODALITIES.len()],
                "findings": format!("{} and {}", WORDS[(i * 7) % WORDS.len()], WORDS[(i * 3) % WORDS.len()]),
                "authorization": { "read": if i % 3 == 0 { "staff" } else { "*" } },
                "patient": { "pt-age": { "years": i % 90 } },
            }),
        );
    }

    let settings = IndexSettings::new(tmp.path().join("index")).with_commit_interval(500);
    let store = IndexStore::open(settings, source).unwrap();
    store.rebuild_index().unwrap();
    BenchEnv {
        _tmp: tmp,
        engine: QueryEngine::new(Arc::new(store)),
    }
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let caller = Caller::user("bench").with_roles(["staff"]);

    for &count in &[1_000usize, 10_000] {
        let env = build_env(count);

        let blank = QueryRequest::new().order_by(SortOrder::Title);
        group.bench_with_input(BenchmarkId::new("blank", count), &blank, |b, request| {
            b.iter(|| {
                black_box(
                    env.engine
                        .query(request, VisibilityMode::Restricted, &caller)
                        .unwrap(),
                )
            })
        });

        let fields = QueryRequest::new()
            .freetext("effusion")
            .field("modality", "ct | mr")
            .field("title", "thorax");
        group.bench_with_input(BenchmarkId::new("fields", count), &fields, |b, request| {
            b.iter(|| {
                black_box(
                    env.engine
                        .query(request, VisibilityMode::Restricted, &caller)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
