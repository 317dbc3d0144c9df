//! Demo that feeds a scripted timeline through one poll loop and logs what
//! would be relayed (no network).

use std::sync::Arc;

use chrono::{Duration, Utc};
use timeline_relay::notify::LogNotifier;
use timeline_relay::source::{PostCandidate, ScriptedSource};
use timeline_relay::{AccountConfig, NoveltyFilter, PollLoop, TimeNormalizer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let now = Utc::now();
    let source = Arc::new(ScriptedSource::new());
    source.push_post(PostCandidate::new("Jones will start tonight", now));
    // same post on the next poll
    source.push_post(PostCandidate::new("Jones will start tonight", now));
    source.push_post(PostCandidate::new("@fan thanks for the support", now));
    source.push_empty();
    source.push_post(PostCandidate::new(
        "Smith is doubtful with an ankle sprain",
        now - Duration::hours(2),
    ));
    source.push_post(PostCandidate::new(
        "Brown listed out for Friday",
        now + Duration::seconds(3),
    ));

    let account = AccountConfig {
        name: "demo".into(),
        timeline: "demo".into(),
        bearer_token: String::new(),
        bot_token: String::new(),
        chat_id: "demo-chat".into(),
    };
    let normalizer = TimeNormalizer::default();
    let mut poll_loop = PollLoop::new(
        account,
        source.clone(),
        Arc::new(LogNotifier),
        NoveltyFilter::new(Default::default(), normalizer),
        normalizer,
        3,
    );

    while source.remaining() > 0 {
        match poll_loop.poll_once().await {
            Ok(Some(entry)) => println!("relayed: {}", entry.text),
            Ok(None) => println!("nothing new"),
            Err(e) => println!("cycle failed: {e}"),
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    println!("relay-demo done, {} remembered", poll_loop.history().len());
}
