use std::sync::Arc;
use std::time::Duration;

use linkdigest_core::ai::{ProviderKind, Summarizer};
use linkdigest_core::config::{ExtractorConfig, ProviderConfig, QueueConfig};
use linkdigest_core::extract::{ContentExtractor, ExtractionMethod};
use linkdigest_core::queue::{Bookmark, BookmarkStatus, BookmarkStore, JobStatus, Orchestrator};
use linkdigest_core::storage::MemoryStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAMPING_SUMMARY: &str = r#"{"short_summary": "A guide to camping through the winter.", "long_summary": "Covers choosing a four-season tent, layering clothes against the cold and keeping water from freezing overnight.", "tags": ["camping", "winter"], "category": "Lifestyle", "confidence": 0.6}"#;

#[tokio::test]
async fn test_page_that_never_answers_is_summarized_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><title>Late</title></html>", "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": CAMPING_SUMMARY }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&ExtractorConfig {
        reader_timeout_secs: 1,
        disk_timeout_secs: 1,
        spool_dir: Some(spool.path().to_path_buf()),
        ..ExtractorConfig::default()
    })
    .unwrap();

    let claude = ProviderKind::Claude
        .build(
            &ProviderConfig::new("claude", "claude-test")
                .with_api_key("test-key")
                .with_base_url(server.uri()),
            8000,
        )
        .unwrap();
    let summarizer = Summarizer::empty().with_provider(claude);

    let store = Arc::new(MemoryStore::new());
    let bookmark_id = store.insert_bookmark(Bookmark::new(
        &format!("{}/guides/winter-camping", server.uri()),
        None,
        None,
    ));
    let orchestrator = Orchestrator::new(
        Arc::new(summarizer),
        Arc::new(extractor),
        store.clone(),
        store.clone(),
        QueueConfig {
            request_delay_ms: 0,
            ..QueueConfig::default()
        },
    );

    let job_id = orchestrator.submit(bookmark_id, None).await.unwrap();
    orchestrator.wait_for_idle().await;

    let job = orchestrator.job_status(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);

    let bookmark = BookmarkStore::get(&*store, bookmark_id).await.unwrap().unwrap();
    assert_eq!(bookmark.status, BookmarkStatus::Analyzed);
    assert_eq!(bookmark.extraction_method, Some(ExtractionMethod::UrlOnly));
    assert_eq!(
        bookmark.short_summary.as_deref(),
        Some("A guide to camping through the winter.")
    );
}
