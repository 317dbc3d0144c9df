// tests/twitter_contract.rs
use chrono::{TimeZone, Utc};
use serde_json::json;
use timeline_relay::source::twitter::TwitterSource;
use timeline_relay::{PostSource, RelayError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

#[tokio::test]
async fn latest_post_is_parsed_with_utc_creation_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("screen_name", "acme"))
        .and(query_param("count", "1"))
        .and(query_param("tweet_mode", "extended"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "full_text": "Smith is questionable for tonight",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let src = TwitterSource::new("tok").with_base_url(server.uri());
    let post = src.fetch_latest("acme").await.unwrap().expect("one post");
    assert_eq!(post.text, "Smith is questionable for tonight");
    assert_eq!(
        post.created_at,
        Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap()
    );
}

#[tokio::test]
async fn empty_timeline_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let src = TwitterSource::new("tok").with_base_url(server.uri());
    assert!(src.fetch_latest("acme").await.unwrap().is_none());
}

#[tokio::test]
async fn unauthorized_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let src = TwitterSource::new("bad").with_base_url(server.uri());
    let err = src.fetch_latest("acme").await.unwrap_err();
    assert!(matches!(err, RelayError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn unreadable_creation_time_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "full_text": "x",
            "created_at": "last tuesday"
        }])))
        .mount(&server)
        .await;

    let src = TwitterSource::new("tok").with_base_url(server.uri());
    let err = src.fetch_latest("acme").await.unwrap_err();
    assert!(matches!(err, RelayError::MalformedTimestamp { .. }));
}
