#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end runs against a stub media host, a copy-through video engine and
//! a recording sink.

use std::{
    io::Cursor,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage},
    rstest::rstest,
    webp2u_config::MediaConfig,
    webp2u_media::{
        ByteStore, MediaKind, MediaSink, Outcome, Pipeline, ReplyTarget, Result, VideoEngine,
        extract_urls, profile::VideoParams,
    },
    wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{any, method, path},
    },
};

struct CopyEngine;

#[async_trait]
impl VideoEngine for CopyEngine {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn transcode(&self, input: &Path, output: &Path, _: &VideoParams) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Copies like [`CopyEngine`] but holds each call open for a while and
/// remembers how many calls overlapped.
#[derive(Default)]
struct SlowEngine {
    running: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl VideoEngine for SlowEngine {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn transcode(&self, input: &Path, output: &Path, _: &VideoParams) -> Result<()> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let copied = tokio::fs::copy(input, output).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        copied?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Sent {
    kind: MediaKind,
    target: ReplyTarget,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    reject: bool,
}

impl RecordingSink {
    fn rejecting() -> Self {
        Self {
            sent: Mutex::default(),
            reject: true,
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, kind: MediaKind, target: &ReplyTarget, store: ByteStore) -> anyhow::Result<()> {
        if self.reject {
            anyhow::bail!("chat rejected the upload");
        }
        self.sent.lock().unwrap().push(Sent {
            kind,
            target: target.clone(),
            bytes: store.into_bytes()?,
        });
        Ok(())
    }
}

#[async_trait]
impl MediaSink for RecordingSink {
    async fn send_photo(&self, target: &ReplyTarget, photo: ByteStore) -> anyhow::Result<()> {
        self.record(MediaKind::Image, target, photo)
    }

    async fn send_video(&self, target: &ReplyTarget, video: ByteStore) -> anyhow::Result<()> {
        self.record(MediaKind::Video, target, video)
    }
}

fn webp_fixture() -> Vec<u8> {
    let img = RgbaImage::from_fn(10, 7, |x, y| Rgba([x as u8 * 20, y as u8 * 30, 90, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::WebP)
        .unwrap();
    buf.into_inner()
}

fn pipeline(config: MediaConfig) -> Arc<Pipeline> {
    Arc::new(Pipeline::with_engine(&config, Arc::new(CopyEngine)).unwrap())
}

fn fast_config() -> MediaConfig {
    MediaConfig {
        request_timeout_secs: 1,
        ..MediaConfig::default()
    }
}

fn target() -> ReplyTarget {
    ReplyTarget::new("42").replying_to("7")
}

fn urls_in(text: &str) -> Vec<String> {
    extract_urls(std::iter::empty::<&str>(), text)
}

async fn serve(server: &MockServer, at: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn webp_link_in_text_is_sent_as_one_rgb_jpeg_photo() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    serve(&server, "/cat.webp", webp_fixture()).await;

    let text = format!("check this out {}/cat.webp nice", server.uri());
    let urls = urls_in(&text);
    assert_eq!(urls, [format!("{}/cat.webp", server.uri())]);

    let sink = RecordingSink::default();
    let reports = pipeline(fast_config()).run(urls, &sink, &target()).await;

    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].outcome, Outcome::Delivered(MediaKind::Image)));

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, MediaKind::Image);
    assert_eq!(sent[0].target, target());
    assert_eq!(image::guess_format(&sent[0].bytes).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&sent[0].bytes).unwrap();
    assert_eq!(decoded.color(), ColorType::Rgb8);
}

#[tokio::test]
async fn broken_link_next_to_a_video_only_loses_itself() {
    let server = MockServer::start().await;
    serve(&server, "/clip.webm", b"webm payload".to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/missing.webm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/clip.webm", server.uri()),
        format!("{}/missing.webm", server.uri()),
    ];
    let sink = RecordingSink::default();
    let reports = pipeline(fast_config()).run(urls, &sink, &target()).await;

    assert!(matches!(reports[0].outcome, Outcome::Delivered(MediaKind::Video)));
    assert!(matches!(reports[1].outcome, Outcome::FetchFailed(_)));

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, MediaKind::Video);
    assert_eq!(sent[0].bytes, b"webm payload");
}

#[tokio::test]
async fn failed_probe_is_isolated_to_its_candidate() {
    let server = MockServer::start().await;
    serve(&server, "/clip.webm", b"webm payload".to_vec()).await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let urls = vec![
        format!("{}/gone", server.uri()),
        format!("{}/clip.webm", server.uri()),
    ];
    let sink = RecordingSink::default();
    let reports = pipeline(fast_config()).run(urls, &sink, &target()).await;

    assert!(matches!(reports[0].outcome, Outcome::ResolveFailed(_)));
    assert!(matches!(reports[1].outcome, Outcome::Delivered(MediaKind::Video)));
    assert_eq!(sink.sent().len(), 1);
}

#[tokio::test]
async fn message_without_links_does_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let reports = pipeline(fast_config())
        .run(urls_in("just words, no links"), &sink, &target())
        .await;

    assert!(reports.is_empty());
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn unhinted_link_is_probed_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/media"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/webp"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(webp_fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let reports = pipeline(fast_config())
        .run(vec![format!("{}/media?id=3", server.uri())], &sink, &target())
        .await;

    assert!(reports[0].outcome.is_delivered());
    assert_eq!(sink.sent()[0].kind, MediaKind::Image);
}

#[tokio::test]
async fn unknown_content_type_is_skipped_without_download() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let reports = pipeline(fast_config())
        .run(vec![format!("{}/article", server.uri())], &sink, &target())
        .await;

    assert!(matches!(reports[0].outcome, Outcome::Unsupported));
    assert!(!reports[0].outcome.is_failure());
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn slow_host_times_out_while_siblings_deliver() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.webp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(webp_fixture())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    serve(&server, "/quick.webp", webp_fixture()).await;

    let urls = vec![
        format!("{}/slow.webp", server.uri()),
        format!("{}/quick.webp", server.uri()),
    ];
    let sink = RecordingSink::default();
    let reports = pipeline(fast_config()).run(urls, &sink, &target()).await;

    match &reports[0].outcome {
        Outcome::FetchFailed(webp2u_media::Error::Fetch { source, .. }) => {
            assert!(source.is_timeout());
        },
        other => panic!("unexpected outcome: {other}"),
    }
    assert!(reports[1].outcome.is_delivered());
    assert_eq!(sink.sent().len(), 1);
}

#[tokio::test]
async fn deliveries_follow_extraction_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first.webm"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"first".to_vec())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    serve(&server, "/second.webp", webp_fixture()).await;
    serve(&server, "/third.webm", b"third".to_vec()).await;

    let text = format!(
        "{0}/first.webm {0}/second.webp {0}/third.webm",
        server.uri()
    );
    let sink = RecordingSink::default();
    let reports = pipeline(fast_config()).run(urls_in(&text), &sink, &target()).await;

    assert!(reports.iter().all(|r| r.outcome.is_delivered()));
    let sent = sink.sent();
    let kinds: Vec<_> = sent.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, [MediaKind::Video, MediaKind::Image, MediaKind::Video]);
    assert_eq!(sent[0].bytes, b"first");
    assert_eq!(sent[2].bytes, b"third");
}

#[tokio::test]
async fn oversized_download_fails_the_fetch() {
    let server = MockServer::start().await;
    serve(&server, "/huge.webm", vec![0; 4096]).await;

    let config = MediaConfig {
        max_bytes: 1024,
        spill_threshold_bytes: 512,
        ..fast_config()
    };
    let sink = RecordingSink::default();
    let reports = pipeline(config)
        .run(vec![format!("{}/huge.webm", server.uri())], &sink, &target())
        .await;

    assert!(matches!(
        reports[0].outcome,
        Outcome::FetchFailed(webp2u_media::Error::TooLarge { limit: 1024 })
    ));
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn corrupt_image_is_a_transcode_failure() {
    let server = MockServer::start().await;
    serve(&server, "/fake.webp", b"<html>login required</html>".to_vec()).await;

    let sink = RecordingSink::default();
    let reports = pipeline(fast_config())
        .run(vec![format!("{}/fake.webp", server.uri())], &sink, &target())
        .await;

    assert!(matches!(reports[0].outcome, Outcome::TranscodeFailed(_)));
    assert_eq!(reports[0].outcome.stage(), "transcode");
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn sink_errors_become_delivery_failures() {
    let server = MockServer::start().await;
    serve(&server, "/a.webp", webp_fixture()).await;
    serve(&server, "/b.webm", b"video".to_vec()).await;

    let urls = vec![
        format!("{}/a.webp", server.uri()),
        format!("{}/b.webm", server.uri()),
    ];
    let sink = RecordingSink::rejecting();
    let reports = pipeline(fast_config()).run(urls, &sink, &target()).await;

    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, Outcome::DeliveryFailed(_))));
}

#[rstest]
#[case::one_at_a_time(1)]
#[case::two_at_a_time(2)]
#[tokio::test]
async fn conversions_per_message_respect_max_concurrency(#[case] limit: usize) {
    let server = MockServer::start().await;
    let mut urls = Vec::new();
    for i in 0..5 {
        let at = format!("/clip{i}.webm");
        serve(&server, &at, format!("clip {i}").into_bytes()).await;
        urls.push(format!("{}{at}", server.uri()));
    }

    let engine = Arc::new(SlowEngine::default());
    let config = MediaConfig {
        max_concurrency: limit,
        ..fast_config()
    };
    let pipeline = Arc::new(Pipeline::with_engine(&config, engine.clone()).unwrap());
    let sink = RecordingSink::default();
    let reports = pipeline.run(urls, &sink, &target()).await;

    assert!(reports.iter().all(|r| r.outcome.is_delivered()));
    assert_eq!(sink.sent().len(), 5);
    assert_eq!(engine.peak.load(Ordering::SeqCst), limit);
    assert_eq!(engine.running.load(Ordering::SeqCst), 0);
}
