mod common;

use axum::{
    body::Body,
    http::{Method, StatusCode},
};
use common::{ADMIN_SECRET, ALICE_SECRET, spawn_app};
use futures::future::join_all;
use scriptvault::models::{AuditAction, AuditResource, NewAuditEntry, RequestContext};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_downloads_count_exactly_once_each() {
    let app = Arc::new(spawn_app().await);
    let token = app.token_for("alice", ALICE_SECRET).await;

    let tasks = (0..40).map(|_| {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let response = app
                .post("/api/resources/script-001/download", Some(&token))
                .await;
            assert_eq!(response.status, StatusCode::OK);
            response.body["download"]["downloadCount"].as_u64().unwrap()
        })
    });

    let counts: HashSet<u64> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(counts, (1..=40).collect::<HashSet<u64>>());

    let admin = app.token_for("admin", ADMIN_SECRET).await;
    let script = app.get("/api/resources/script-001", Some(&admin)).await;
    assert_eq!(script.body["resource"]["downloadCount"], 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_from_one_origin_admit_exactly_ten() {
    let app = Arc::new(spawn_app().await);

    let tasks = (0..25).map(|_| {
        let app = app.clone();
        tokio::spawn(async move {
            app.login_from("alice", ALICE_SECRET, "198.51.100.1")
                .await
                .status
        })
    });

    let statuses: Vec<StatusCode> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let throttled = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(ok, 10);
    assert_eq!(throttled, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_yields_one_winner() {
    let app = Arc::new(spawn_app().await);
    let token = app.token_for("alice", ALICE_SECRET).await;

    let tasks = (0..10).map(|_| {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move { app.post("/api/refresh-token", Some(&token)).await.status })
    });

    let statuses: Vec<StatusCode> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(app.state.tokens.active_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_audit_pages_are_consistent_under_concurrent_appends() {
    let app = Arc::new(spawn_app().await);
    let admin = app.token_for("admin", ADMIN_SECRET).await;

    let writers = (0..200).map(|i| {
        let audit = app.state.audit.clone();
        tokio::spawn(async move {
            audit
                .record(NewAuditEntry::new(
                    AuditAction::ListScripts,
                    AuditResource::Script,
                    format!("w{i}"),
                    &RequestContext::default(),
                ))
                .await
                .unwrap();
        })
    });

    let readers = (0..10).map(|_| {
        let app = app.clone();
        let admin = admin.clone();
        tokio::spawn(async move {
            let peer = app.fresh_peer();
            let request = app.request(
                Method::GET,
                "/api/audit-log?page=1&limit=500",
                Some(&admin),
                &peer,
                Body::empty(),
            );
            app.send(request).await
        })
    });

    let (writes, reads) = tokio::join!(join_all(writers), join_all(readers));
    for write in writes {
        write.unwrap();
    }

    for read in reads {
        let response = read.unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let entries = response.body["entries"].as_array().unwrap();
        assert_eq!(entries.len() as u64, response.body["total"].as_u64().unwrap());

        let ids: HashSet<&str> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids.len(), entries.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_wrong_secrets_stop_at_lockout_threshold() {
    let app = Arc::new(spawn_app().await);

    let tasks = (0..30).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { app.login("alice", "wrong").await.status })
    });

    let statuses: Vec<StatusCode> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let evaluated = statuses
        .iter()
        .filter(|s| **s == StatusCode::UNAUTHORIZED)
        .count();
    let locked = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(evaluated, 5);
    assert_eq!(locked, 25);

    let alice = app.state.credentials.find_by_username("alice").await.unwrap();
    assert_eq!(alice.failed_attempts, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_correct_secret_racing_wrong_ones_respects_lockout() {
    let app = Arc::new(spawn_app().await);
    for _ in 0..4 {
        assert_eq!(app.login("alice", "wrong").await.status, StatusCode::UNAUTHORIZED);
    }

    let tasks = (0..10).map(|i| {
        let app = app.clone();
        let secret = if i == 5 { ALICE_SECRET } else { "wrong" };
        tokio::spawn(async move { app.login("alice", secret).await.status })
    });

    let statuses: Vec<StatusCode> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let count = |status: StatusCode| statuses.iter().filter(|s| **s == status).count();

    // Either the correct secret ran first and reset the counter, or the first
    // wrong guess locked the account and every later attempt was refused.
    let outcome = (
        count(StatusCode::OK),
        count(StatusCode::UNAUTHORIZED),
        count(StatusCode::TOO_MANY_REQUESTS),
    );
    assert!(matches!(outcome, (0, 1, 9) | (1, 5, 4)), "{statuses:?}");

    let alice = app.state.credentials.find_by_username("alice").await.unwrap();
    assert_eq!(alice.failed_attempts, 5);
}
