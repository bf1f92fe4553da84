//! Integration tests for query execution
//!
//! Documents are written as JSON files and indexed through the filesystem
//! source, then queried end to end.

use std::path::Path;
use std::sync::Arc;

use folio::config::IndexSettings;
use folio::engine::QueryEngine;
use folio::index::IndexStore;
use folio::models::{AgeQuery, Caller, QueryRequest, SortOrder, VisibilityMode};
use folio::source::FsDocumentSource;
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_doc(root: &Path, path: &str, doc: Value) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

fn setup_test_index() -> (TempDir, QueryEngine) {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("documents");

    write_doc(
        &docs,
        "chest/xray.json",
        json!({
            "title": "Chest X-ray",
            "modality": "CR",
            "publication-date": "2020-01-15",
            "findings": "Right upper lobe opacity",
            "patient": { "sex": "male", "pt-age": { "years": 45 } }
        }),
    );
    write_doc(
        &docs,
        "neuro/brain.json",
        json!({
            "title": "Brain MR",
            "modality": "MR",
            "publication-date": "2019-07-01",
            "findings": "Small infarct",
            "patient": { "sex": "female", "pt-age": { "years": 5 } },
            "authorization": { "owner": "alice", "read": "neuroradiologist [bob]" }
        }),
    );
    write_doc(
        &docs,
        "chest/ct.json",
        json!({
            "title": "Chest CT",
            "modality": "CT",
            "publication-date": "2021-11-30",
            "findings": "Pulmonary embolism",
            "patient": { "sex": "female", "pt-age": { "months": 18 } },
            "authorization": { "read": "" }
        }),
    );

    let settings = IndexSettings::new(tmp.path().join("index"));
    let store = IndexStore::open(settings, Arc::new(FsDocumentSource::new(&docs))).unwrap();
    let report = store.rebuild_index().unwrap();
    assert_eq!(report.indexed, 3);

    (tmp, QueryEngine::new(Arc::new(store)))
}

fn open_titles(engine: &QueryEngine, request: QueryRequest) -> Vec<String> {
    engine
        .query(&request, VisibilityMode::Open, &Caller::anonymous())
        .unwrap()
        .titles()
}

#[test]
fn test_title_scenario() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new()
        .field("title", "chest")
        .order_by(SortOrder::Title);
    assert_eq!(open_titles(&engine, request), vec!["Chest CT", "Chest X-ray"]);
}

#[test]
fn test_freetext_matches_any_text() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new().freetext("infarct");
    assert_eq!(open_titles(&engine, request), vec!["Brain MR"]);

    // suffix fragment of "embolism"
    let request = QueryRequest::new().freetext("bolism");
    assert_eq!(open_titles(&engine, request), vec!["Chest CT"]);
}

#[test]
fn test_field_queries_intersect() {
    let (_tmp, engine) = setup_test_index();

    let request = QueryRequest::new().freetext("chest").field("modality", "ct");
    assert_eq!(open_titles(&engine, request), vec!["Chest CT"]);

    // a field with no matches empties the whole result
    let request = QueryRequest::new().freetext("chest").field("modality", "us");
    assert!(open_titles(&engine, request).is_empty());

    let request = QueryRequest::new()
        .field("modality", "ct | mr")
        .order_by(SortOrder::Title);
    assert_eq!(open_titles(&engine, request), vec!["Brain MR", "Chest CT"]);
}

#[test]
fn test_whole_word_patient_field() {
    let (_tmp, engine) = setup_test_index();

    let request = QueryRequest::new().field("patient", "male");
    assert_eq!(open_titles(&engine, request), vec!["Chest X-ray"]);

    let request = QueryRequest::new()
        .field("patient", "female")
        .order_by(SortOrder::Title);
    assert_eq!(open_titles(&engine, request), vec!["Brain MR", "Chest CT"]);
}

#[test]
fn test_phrase_requires_all_words() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new().field("findings", "\"upper lobe\"");
    assert_eq!(open_titles(&engine, request), vec!["Chest X-ray"]);

    let request = QueryRequest::new().field("findings", "\"upper infarct\"");
    assert!(open_titles(&engine, request).is_empty());
}

#[test]
fn test_age_filter() {
    let (_tmp, engine) = setup_test_index();

    let request = QueryRequest::new().age(AgeQuery::years("5"));
    assert_eq!(open_titles(&engine, request), vec!["Brain MR"]);

    let request = QueryRequest::new()
        .age(AgeQuery::years("1-2"))
        .order_by(SortOrder::Title);
    assert_eq!(open_titles(&engine, request), vec!["Chest CT"]);

    let request = QueryRequest::new().freetext("chest").age(AgeQuery::years("40-50"));
    assert_eq!(open_titles(&engine, request), vec!["Chest X-ray"]);
}

#[test]
fn test_access_filtering() {
    let (_tmp, engine) = setup_test_index();
    let all = QueryRequest::new().order_by(SortOrder::Title);
    let titles = |caller: Caller| {
        engine
            .query(&all, VisibilityMode::Restricted, &caller)
            .unwrap()
            .titles()
    };

    assert_eq!(titles(Caller::anonymous()), vec!["Chest X-ray"]);
    assert_eq!(titles(Caller::user("carol")), vec!["Chest X-ray"]);
    assert_eq!(titles(Caller::user("alice")), vec!["Brain MR", "Chest X-ray"]);
    assert_eq!(titles(Caller::user("bob")), vec!["Brain MR", "Chest X-ray"]);
    assert_eq!(
        titles(Caller::user("dave").with_roles(["neuroradiologist"])),
        vec!["Brain MR", "Chest X-ray"]
    );

    // the empty read list hides the document even from admins on the
    // blank-query path
    assert_eq!(titles(Caller::admin("root")), vec!["Brain MR", "Chest X-ray"]);

    // open mode sees everything
    assert_eq!(
        engine
            .query(&all, VisibilityMode::Open, &Caller::anonymous())
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn test_admin_bypasses_filter_on_general_path() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new()
        .freetext("chest")
        .order_by(SortOrder::Title);

    let admin = engine
        .query(&request, VisibilityMode::Restricted, &Caller::admin("root"))
        .unwrap();
    assert_eq!(admin.titles(), vec!["Chest CT", "Chest X-ray"]);

    let anonymous = engine
        .query(&request, VisibilityMode::Restricted, &Caller::anonymous())
        .unwrap();
    assert_eq!(anonymous.titles(), vec!["Chest X-ray"]);
}

#[test]
fn test_sort_orders() {
    let (_tmp, engine) = setup_test_index();

    let by_pubdate = QueryRequest::new().order_by(SortOrder::PublicationDate);
    assert_eq!(
        open_titles(&engine, by_pubdate),
        vec!["Brain MR", "Chest X-ray", "Chest CT"]
    );
}

#[test]
fn test_unknown_mode_hides_titles() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new().field("title", "brain").unknown(true);
    assert_eq!(open_titles(&engine, request), vec!["Unknown"]);
}

#[test]
fn test_malformed_queries_degrade() {
    let (_tmp, engine) = setup_test_index();

    let request = QueryRequest::new().field("title", "(chest | brain");
    assert_eq!(open_titles(&engine, request).len(), 3);

    let request = QueryRequest::new().field("title", ") chest ct");
    assert_eq!(open_titles(&engine, request), vec!["Chest CT"]);

    // nothing searchable left: behaves like a blank query
    let request = QueryRequest::new().field("title", "( 2021 )");
    assert_eq!(open_titles(&engine, request).len(), 3);
}

#[test]
fn test_paging() {
    let (_tmp, engine) = setup_test_index();
    let request = QueryRequest::new()
        .order_by(SortOrder::Title)
        .page(2, 1);
    let results = engine
        .query(&request, VisibilityMode::Open, &Caller::anonymous())
        .unwrap();
    let page = results.page(request.first_result, request.max_results);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].title, "Chest CT");
}
