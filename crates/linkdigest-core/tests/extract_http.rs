use std::sync::Arc;
use std::time::Duration;

use linkdigest_core::config::ExtractorConfig;
use linkdigest_core::extract::{
    ContentExtractor, DiskStreamedTier, ExtractionMethod, ExtractionTier, PageFetcher,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article_page(title: &str) -> String {
    let paragraph = "Sourdough starters need regular feeding with equal weights of flour and water. \
        A healthy starter doubles within six hours at room temperature. ";
    format!(
        r#"<html>
<head>
  <title>{}</title>
  <meta name="description" content="A practical guide to keeping a starter alive">
</head>
<body>
  <nav>Home | Recipes | About</nav>
  <article><p>{}</p></article>
  <footer>Copyright</footer>
</body>
</html>"#,
        title,
        paragraph.repeat(6)
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// GET /starter without any reader-mode query
fn plain_request() -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/starter"))
        .and(query_param_is_missing("amp"))
        .and(query_param_is_missing("print"))
        .and(query_param_is_missing("output"))
        .and(query_param_is_missing("view"))
}

fn config(spool: &tempfile::TempDir) -> ExtractorConfig {
    ExtractorConfig {
        reader_timeout_secs: 5,
        disk_timeout_secs: 5,
        spool_dir: Some(spool.path().to_path_buf()),
        ..ExtractorConfig::default()
    }
}

#[tokio::test]
async fn test_reader_mode_variant_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/starter"))
        .and(query_param("amp", "1"))
        .respond_with(html(article_page("Keeping a Starter")))
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&config(&spool)).unwrap();
    let result = extractor.extract(&format!("{}/starter", server.uri())).await;

    assert_eq!(result.method, ExtractionMethod::ReaderMode);
    assert_eq!(result.title, "Keeping a Starter");
    assert!(result.text_content.contains("Sourdough starters"));
    assert!(!result.text_content.contains("Copyright"));
    assert_eq!(
        result.description.as_deref(),
        Some("A practical guide to keeping a starter alive")
    );
    assert!(result.error.is_none());
    assert_eq!(result.diagnostics.attempts, 1);
    assert!(!result.diagnostics.truncated);
}

#[tokio::test]
async fn test_oversized_page_is_cut_at_byte_budget() {
    let server = MockServer::start().await;
    let padded = format!("{}<!-- {} -->", article_page("Long Starter"), "x".repeat(80_000));
    Mock::given(method("GET"))
        .and(path("/starter"))
        .and(query_param("amp", "1"))
        .respond_with(html(padded))
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&config(&spool)).unwrap();
    let result = extractor.extract(&format!("{}/starter", server.uri())).await;

    assert_eq!(result.method, ExtractionMethod::ReaderMode);
    assert_eq!(result.title, "Long Starter");
    assert!(result.diagnostics.truncated);
    assert_eq!(
        result.diagnostics.source_bytes,
        ExtractorConfig::default().reader_max_bytes
    );
}

#[tokio::test]
async fn test_falls_through_to_disk_tier_and_cleans_spool() {
    let server = MockServer::start().await;

    // The first plain request is the mobile-agent tier
    plain_request()
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    plain_request()
        .respond_with(html(article_page("Spooled Starter")))
        .with_priority(2)
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&config(&spool)).unwrap();
    let result = extractor.extract(&format!("{}/starter", server.uri())).await;

    assert_eq!(result.method, ExtractionMethod::DiskStreamed);
    assert_eq!(result.title, "Spooled Starter");
    assert!(result.text_content.contains("doubles within six hours"));
    assert_eq!(
        result.diagnostics.failed_methods,
        vec![ExtractionMethod::ReaderMode, ExtractionMethod::MobileAgent]
    );
    assert!(result.diagnostics.source_bytes > 0);

    let leftovers = std::fs::read_dir(spool.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_unreachable_page_degrades_to_url_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&config(&spool)).unwrap();
    let result = extractor
        .extract(&format!("{}/guides/bread-baking-basics", server.uri()))
        .await;

    assert_eq!(result.method, ExtractionMethod::UrlOnly);
    assert!(result.is_degraded());
    assert!(result.error.is_none());
    assert!(!result.text_content.is_empty());
    assert_eq!(result.diagnostics.failed_methods.len(), 3);
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_challenge_page_is_not_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("server", "cloudflare")
                .set_body_raw("<html><title>Just a moment...</title></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let extractor = ContentExtractor::new(&config(&spool)).unwrap();
    let result = extractor.extract(&format!("{}/protected", server.uri())).await;

    assert_eq!(result.method, ExtractionMethod::UrlOnly);
}

#[tokio::test]
async fn test_slow_server_times_out_to_url_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(article_page("Too Slow")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let spool = tempfile::tempdir().unwrap();
    let config = ExtractorConfig {
        reader_timeout_secs: 1,
        disk_timeout_secs: 1,
        spool_dir: Some(spool.path().to_path_buf()),
        ..ExtractorConfig::default()
    };
    let extractor = ContentExtractor::new(&config).unwrap();
    let result = extractor
        .extract(&format!("{}/guides/winter-camping", server.uri()))
        .await;

    assert_eq!(result.method, ExtractionMethod::UrlOnly);
    assert!(result.error.is_none());
    assert!(!result.title.is_empty());
    assert!(result.text_content.to_lowercase().contains("winter camping"));
    assert_eq!(
        result.diagnostics.failed_methods,
        vec![
            ExtractionMethod::ReaderMode,
            ExtractionMethod::MobileAgent,
            ExtractionMethod::DiskStreamed
        ]
    );
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
}

/// Serve one response that promises more body than it sends, then hang up
async fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 100000\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket
            .write_all(b"<html><head><title>Cut short</title></head><body><article><p>Partial")
            .await
            .unwrap();
        socket.flush().await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{}/partial", addr)
}

#[tokio::test]
async fn test_disk_tier_removes_spool_when_body_fails() {
    let url = truncated_body_server().await;
    let spool = tempfile::tempdir().unwrap();
    let config = ExtractorConfig {
        disk_timeout_secs: 5,
        spool_dir: Some(spool.path().to_path_buf()),
        ..ExtractorConfig::default()
    };
    let tier = DiskStreamedTier::new(Arc::new(PageFetcher::new(&config).unwrap()), &config);

    let report = tier.attempt(&Url::parse(&url).unwrap()).await;

    assert!(report.content.is_none());
    assert!(report.error.is_some());
    assert_eq!(report.attempts, 1);
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
}
