use bilifans::bilibili::{BilibiliClient, FetchError, FetchOutcome, DEFAULT_TIMEOUT};
use bilifans::commands::run::{self, RunConfig};
use bilifans::data_log::{
    self, DEFAULT_LOG_FILE, LOG_HEADER, STATUS_ALL_SUCCEEDED, STATUS_PARTIAL_FAILURE,
};
use bilifans::datetime_utils::FixedClock;
use mockito::{Matcher, Mock, ServerGuard};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const CARD_PATH: &str = "/x/web-interface/card";

/// 2024-01-20 15:30:00 UTC, logged as 23:30:00 in UTC+8
const RUN_TIMESTAMP: i64 = 1705764600;

async fn mock_card(server: &mut ServerGuard, mid: &str, name: &str, fans: u64) -> Mock {
    let body = serde_json::json!({
        "code": 0,
        "message": "0",
        "data": { "card": { "mid": mid, "name": name, "fans": fans } }
    });

    server
        .mock("GET", CARD_PATH)
        .match_query(Matcher::UrlEncoded("mid".into(), mid.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

async fn mock_missing_user(server: &mut ServerGuard, mid: &str) -> Mock {
    server
        .mock("GET", CARD_PATH)
        .match_query(Matcher::UrlEncoded("mid".into(), mid.into()))
        .with_status(200)
        .with_body(r#"{"code": -404, "message": "用户不存在"}"#)
        .create_async()
        .await
}

fn mids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_partial_failure_run_logs_outcomes_in_order() {
    let mut server = mockito::Server::new_async().await;
    let ok = mock_card(&mut server, "640584333", "X", 100).await;
    let missing = mock_missing_user(&mut server, "173276266").await;

    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join(DEFAULT_LOG_FILE);
    let client = BilibiliClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();

    let summary = run::run_with_client(
        &client,
        &mids(&["640584333", "173276266"]),
        &log_path,
        &FixedClock::at_unix(RUN_TIMESTAMP),
    )
    .await;

    ok.assert_async().await;
    missing.assert_async().await;

    assert!(summary.persisted);
    assert!(!summary.all_succeeded);
    assert_eq!(summary.log_path, log_path);
    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[0].mid(), "640584333");
    assert_eq!(summary.outcomes[1].mid(), "173276266");

    let content = fs::read_to_string(&log_path).unwrap();
    let expected = format!(
        "{LOG_HEADER}{}\n",
        [
            "[2024-01-20 23:30:00] 抓取记录",
            "✓ 用户名: X | 粉丝数: 100 | UID: 640584333",
            "✗ UID: 173276266 | 错误: API错误 (code -404): 用户不存在",
            STATUS_PARTIAL_FAILURE,
            "--------------------------------------------------",
        ]
        .join("\n")
    );
    assert_eq!(content, expected);
    assert!(!content.contains(STATUS_ALL_SUCCEEDED));
}

#[tokio::test]
async fn test_repeated_runs_append_blocks() {
    let mut server = mockito::Server::new_async().await;
    let _first = mock_card(&mut server, "173276266", "A", 1).await;
    let _second = mock_card(&mut server, "640584333", "B", 2).await;

    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join(DEFAULT_LOG_FILE);
    let client = BilibiliClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();
    let ids = mids(&["173276266", "640584333"]);

    let first = run::run_with_client(
        &client,
        &ids,
        &log_path,
        &FixedClock::at_unix(RUN_TIMESTAMP),
    )
    .await;
    let after_first = fs::read_to_string(&log_path).unwrap();

    let second = run::run_with_client(
        &client,
        &ids,
        &log_path,
        &FixedClock::at_unix(RUN_TIMESTAMP + 3600),
    )
    .await;
    let after_second = fs::read_to_string(&log_path).unwrap();

    assert!(first.all_succeeded && second.all_succeeded);
    assert!(after_second.starts_with(&after_first));
    assert_eq!(after_second.matches(LOG_HEADER).count(), 1);
    assert_eq!(after_second.matches(STATUS_ALL_SUCCEEDED).count(), 2);

    let first_block = after_second.find("[2024-01-20 23:30:00]").unwrap();
    let second_block = after_second.find("[2024-01-21 00:30:00]").unwrap();
    assert!(first_block < second_block);
}

#[tokio::test]
async fn test_every_identifier_is_attempted_after_failures() {
    let mut server = mockito::Server::new_async().await;
    let _failing = server
        .mock("GET", CARD_PATH)
        .match_query(Matcher::UrlEncoded("mid".into(), "1".into()))
        .with_status(500)
        .create_async()
        .await;
    let _garbled = server
        .mock("GET", CARD_PATH)
        .match_query(Matcher::UrlEncoded("mid".into(), "2".into()))
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;
    let last = mock_card(&mut server, "3", "C", 3).await;

    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join(DEFAULT_LOG_FILE);
    let client = BilibiliClient::new(&server.url(), DEFAULT_TIMEOUT).unwrap();

    let summary = run::run_with_client(
        &client,
        &mids(&["1", "2", "3"]),
        &log_path,
        &FixedClock::at_unix(RUN_TIMESTAMP),
    )
    .await;

    last.assert_async().await;
    assert!(matches!(
        &summary.outcomes[0],
        FetchOutcome::Failed {
            error: FetchError::Network { .. },
            ..
        }
    ));
    assert!(matches!(
        &summary.outcomes[1],
        FetchOutcome::Failed {
            error: FetchError::MalformedResponse { .. },
            ..
        }
    ));
    assert!(summary.outcomes[2].is_success());

    let content = data_log::read_log(&log_path).unwrap().unwrap();
    let outcome_lines: Vec<&str> = content
        .lines()
        .filter(|line| line.starts_with('✓') || line.starts_with('✗'))
        .collect();
    assert_eq!(outcome_lines.len(), 3);
    assert!(outcome_lines[0].starts_with("✗ UID: 1 "));
    assert!(outcome_lines[1].starts_with("✗ UID: 2 "));
    assert!(outcome_lines[2].starts_with("✓ "));
}

#[tokio::test]
async fn test_unwritable_log_is_reported_not_raised() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_card(&mut server, "1", "A", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("no-such-dir").join(DEFAULT_LOG_FILE);
    let config = RunConfig {
        mids: mids(&["1"]),
        log_path: log_path.clone(),
        api_base: server.url(),
        ..RunConfig::default()
    };

    let summary = run::execute(&config, &FixedClock::at_unix(RUN_TIMESTAMP))
        .await
        .unwrap();

    assert!(!summary.persisted);
    assert!(summary.all_succeeded);
    assert_eq!(summary.log_path, log_path);
    assert!(!log_path.exists());
}
