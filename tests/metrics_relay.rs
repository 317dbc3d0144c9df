// tests/metrics_relay.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use timeline_relay::metrics::ensure_metrics_described;
use timeline_relay::notify::RecordingNotifier;
use timeline_relay::source::{PostCandidate, ScriptedSource};
use timeline_relay::{AccountConfig, NoveltyFilter, PollLoop, TimeNormalizer};

#[tokio::test]
async fn metrics_exposed_after_polling() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");
    ensure_metrics_described();

    let now = Utc::now();
    let src = Arc::new(ScriptedSource::with_posts([
        PostCandidate::new("fresh", now),
        PostCandidate::new("fresh", now),
    ]));
    let account = AccountConfig {
        name: "m".into(),
        timeline: "m".into(),
        bearer_token: "t".into(),
        bot_token: "b".into(),
        chat_id: "c".into(),
    };
    let mut pl = PollLoop::new(
        account,
        src,
        Arc::new(RecordingNotifier::new()),
        NoveltyFilter::default(),
        TimeNormalizer::default(),
        5,
    );
    pl.poll_once().await.unwrap();
    pl.poll_once().await.unwrap();

    let out = handle.render();
    assert!(out.contains("relay_polls_total"));
    assert!(out.contains("relay_accepted_total"));
    assert!(out.contains("relay_rejected_total{reason=\"duplicate\"}"));
    assert!(out.contains("relay_history_len"));
}
