// tests/config_load.rs
use std::{env, fs, time::Duration};

use timeline_relay::config::{RelayConfig, ENV_CONFIG_PATH};
use timeline_relay::novelty::{DedupKey, Freshness};
use timeline_relay::HistoryOnRestart;

const TWO_ACCOUNTS: &str = r#"
poll_interval_secs = 2.5
history_capacity = 10
local_timezone = "America/Chicago"
dedup_key = "text"
freshness = "same_day"

[retry]
max_restarts = 5
base_delay_ms = 200
max_delay_ms = 5000
history_on_restart = "retain"
restart_notice = false

[[accounts]]
name = "injuries"
timeline = "injury_feed"
bearer_token = "bearer-1"
bot_token = "bot-1"
chat_id = "-1001"

[[accounts]]
timeline = "lineups"
bearer_token = "env:RELAY_TEST_BEARER"
bot_token = "bot-2"
chat_id = "-1002"
"#;

#[serial_test::serial]
#[test]
fn toml_file_with_two_accounts() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("relay.toml");
    fs::write(&p, TWO_ACCOUNTS).unwrap();
    env::set_var("RELAY_TEST_BEARER", "bearer-2");

    let cfg = RelayConfig::load_from(&p).unwrap();
    env::remove_var("RELAY_TEST_BEARER");

    assert_eq!(cfg.poll_interval, Duration::from_millis(2500));
    assert_eq!(cfg.history_capacity, 10);
    assert_eq!(cfg.timezone, chrono_tz::America::Chicago);
    assert_eq!(cfg.policy.dedup, DedupKey::Text);
    assert_eq!(cfg.policy.freshness, Freshness::SameDay);
    assert_eq!(cfg.retry.max_restarts, Some(5));
    assert_eq!(cfg.retry.history_on_restart, HistoryOnRestart::Retain);
    assert!(!cfg.retry.restart_notice);

    assert_eq!(cfg.accounts.len(), 2);
    assert_eq!(cfg.accounts[0].name, "injuries");
    assert_eq!(cfg.accounts[1].name, "lineups");
    assert_eq!(cfg.accounts[1].bearer_token, "bearer-2");
}

#[test]
fn json_file_and_missing_field() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("relay.json");
    fs::write(
        &p,
        r#"{"accounts":[{"timeline":"acme","bearer_token":"t","bot_token":"b"}]}"#,
    )
    .unwrap();
    let err = RelayConfig::load_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("missing chat_id"), "{err:#}");
}

#[test]
fn unknown_timezone_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("relay.toml");
    fs::write(
        &p,
        r#"
local_timezone = "Mars/Olympus_Mons"
[[accounts]]
timeline = "a"
bearer_token = "t"
bot_token = "b"
chat_id = "c"
"#,
    )
    .unwrap();
    assert!(RelayConfig::load_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_path_then_env_vars() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    for (k, v) in [
        ("TIMELINE", "acme"),
        ("TWITTER_BEARER_TOKEN", "tok"),
        ("BOT_TOKEN", "bot"),
        ("CHAT_ID", "-1"),
    ] {
        env::set_var(k, v);
    }

    let from_env = RelayConfig::load_default().unwrap();
    assert_eq!(from_env.accounts[0].timeline, "acme");

    let p = tmp.path().join("custom.toml");
    fs::write(&p, TWO_ACCOUNTS.replace("env:RELAY_TEST_BEARER", "literal")).unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    let from_file = RelayConfig::load_default().unwrap();
    assert_eq!(from_file.accounts.len(), 2);

    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(RelayConfig::load_default().is_err());

    env::remove_var(ENV_CONFIG_PATH);
    for k in ["TIMELINE", "TWITTER_BEARER_TOKEN", "BOT_TOKEN", "CHAT_ID"] {
        env::remove_var(k);
    }
    env::set_current_dir(&old).unwrap();
}
