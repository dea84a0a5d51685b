mod common;

use common::{EchoClient, FakeScraper, Page};
use harvest_common::{HarvestError, ScrapeTarget};
use harvest_llm::extractor::ExtractionOrchestrator;
use harvest_web::{Pipeline, PipelineSettings};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const THREE_LINES: &str = "<html><body><script>track()</script>\
    <p>MATCH-one!</p><p>FAIL-two!!</p><p>MATCH-3!!!</p></body></html>";

fn pipeline(scraper: Arc<FakeScraper>, client: Arc<EchoClient>, chunk_size: usize) -> Pipeline {
    Pipeline::new(
        scraper,
        ExtractionOrchestrator::new(client),
        PipelineSettings {
            chunk_size,
            ..PipelineSettings::default()
        },
    )
    .unwrap()
}

fn target() -> ScrapeTarget {
    ScrapeTarget::parse("https://example.com/contact").unwrap()
}

#[tokio::test]
async fn full_run_skips_failed_chunk_and_keeps_order() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Markup(THREE_LINES)));
    let client = Arc::new(EchoClient::new("MATCH", "alice@example.com"));
    let pipeline = pipeline(scraper.clone(), client.clone(), 11);

    let report = pipeline
        .run(&target(), "extract emails", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(scraper.opened(), 1);
    assert_eq!(report.text_chars, "MATCH-one!\nFAIL-two!!\nMATCH-3!!!".len());
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.chunk_size, 11);
    assert_eq!(report.extraction.stats.attempted, 3);
    assert_eq!(report.extraction.stats.failed, 1);
    assert_eq!(report.extraction.stats.succeeded, 2);
    assert_eq!(report.text(), "alice@example.com\n\nalice@example.com");
    assert!(report.ready);

    let prompts = client.prompts();
    assert!(prompts[0].contains("MATCH-one!"));
    assert!(prompts.iter().all(|p| !p.contains("track()")));
}

#[tokio::test]
async fn scrape_text_returns_normalized_page() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Markup(
        "<body><script>x</script><p>Hello</p><p>World</p></body>",
    )));
    let client = Arc::new(EchoClient::new("MATCH", "unused"));
    let pipeline = pipeline(scraper, client.clone(), 6000);

    let page = pipeline
        .scrape_text(&target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.text, "Hello\nWorld");
    assert_eq!(page.checksum.len(), 64);
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn low_confidence_markup_still_runs() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Challenged(
        "<body><p>MATCH partial page</p></body>",
    )));
    let client = Arc::new(EchoClient::new("MATCH", "found"));
    let pipeline = pipeline(scraper, client, 6000);

    let report = pipeline
        .run(&target(), "anything", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.ready);
    assert!(report.challenge.is_unresolved());
    assert_eq!(report.text(), "found");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["challenge"]["state"], "unresolved");
    assert_eq!(json["target"], "https://example.com/contact");
}

#[tokio::test]
async fn page_without_body_yields_empty_aggregate() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Markup("<html><head></head></html>")));
    let client = Arc::new(EchoClient::new("MATCH", "never"));
    let pipeline = pipeline(scraper, client.clone(), 6000);

    let report = pipeline
        .run(&target(), "extract emails", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.chunk_count, 0);
    assert_eq!(report.extraction.stats.attempted, 0);
    assert!(report.text().is_empty());
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn connection_refusal_fails_the_run() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Refused));
    let client = Arc::new(EchoClient::new("MATCH", "never"));
    let pipeline = pipeline(scraper, client.clone(), 6000);

    let err = pipeline
        .run(&target(), "extract emails", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Connection(_)));
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn cancelled_token_stops_before_scraping() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Markup(THREE_LINES)));
    let client = Arc::new(EchoClient::new("MATCH", "never"));
    let pipeline = pipeline(scraper.clone(), client, 6000);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline.run(&target(), "extract emails", &cancel).await.unwrap_err();

    assert!(matches!(err, HarvestError::Cancelled));
    assert_eq!(scraper.opened(), 0);
}

#[test]
fn zero_chunk_size_is_rejected_up_front() {
    let scraper = Arc::new(FakeScraper::new(Page::Markup(THREE_LINES)));
    let client = Arc::new(EchoClient::new("MATCH", "never"));

    let result = Pipeline::new(
        scraper.clone(),
        ExtractionOrchestrator::new(client),
        PipelineSettings {
            chunk_size: 0,
            ..PipelineSettings::default()
        },
    );

    assert!(matches!(result, Err(HarvestError::InvalidConfig(_))));
    assert_eq!(scraper.opened(), 0);
}

#[tokio::test]
async fn scrape_only_pipeline_refuses_to_extract() {
    common::init_test_tracing();
    let scraper = Arc::new(FakeScraper::new(Page::Markup(THREE_LINES)));
    let pipeline = Pipeline::scrape_only(scraper.clone(), PipelineSettings::default()).unwrap();
    let cancel = CancellationToken::new();

    let page = pipeline.scrape_text(&target(), &cancel).await.unwrap();
    assert_eq!(page.text, "MATCH-one!\nFAIL-two!!\nMATCH-3!!!");

    let err = pipeline.run(&target(), "extract emails", &cancel).await.unwrap_err();
    assert!(matches!(err, HarvestError::InvalidConfig(_)));
    assert_eq!(scraper.opened(), 1);
}
