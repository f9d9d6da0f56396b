mod common;

use common::*;
use serde_json::json;

const CHECK: &str = "/api/auth/check";

#[tokio::test]
async fn cookie_session_is_adopted_without_touching_stores() {
    let h = Harness::new();
    h.transport.respond_json(
        CHECK,
        200,
        json!({ "authenticated": true, "user": { "id": "u1", "email": "ada@example.com" } }),
    );

    let session = h.manager.synchronize().await;

    assert_eq!(session.user, Some(user("u1", "ada@example.com")));
    assert_eq!(h.transport.count("/api/auth/set-cookie"), 0);
    assert_eq!(h.transport.count("/api/auth/clear-cookie"), 0);
    assert_eq!(h.transport.count("/auth/refresh"), 0);
}

#[tokio::test]
async fn valid_local_session_is_adopted_and_cookie_resynced() {
    let h = Harness::new();
    let token = fresh_token();
    let ada = user("u1", "ada@example.com");
    h.seed(&token, "r1", Some(&ada)).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false }));

    let session = h.manager.synchronize().await;

    assert_eq!(session.user, Some(ada));
    let cookie = h.transport.calls_to("/api/auth/set-cookie");
    assert_eq!(cookie.len(), 1);
    assert_eq!(json_body(&cookie[0])["accessToken"], token.as_str());
}

#[tokio::test]
async fn expired_local_session_is_cleared() {
    let h = Harness::new();
    h.seed(&expired_token(), "r1", Some(&user("u1", "ada@example.com"))).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false }));

    let session = h.manager.synchronize().await;

    assert!(session.user.is_none());
    let store = h.manager.token_store();
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
    assert!(store.cached_user().is_none());
    assert_eq!(h.transport.count("/api/auth/clear-cookie"), 1);
    assert_eq!(h.transport.count("/auth/refresh"), 0);
}

#[tokio::test]
async fn local_credential_without_user_record_is_cleared() {
    let h = Harness::new();
    h.seed(&fresh_token(), "r1", None).await;
    h.transport.respond_json(CHECK, 200, json!({ "authenticated": false }));

    let session = h.manager.synchronize().await;

    assert!(session.user.is_none());
    assert!(h.manager.token_store().access_token().is_none());
}

#[tokio::test]
async fn expired_cookie_refreshes_and_keeps_cached_user() {
    let h = Harness::new();
    let ada = user("u1", "ada@example.com");
    h.seed(&expired_token(), "r1", Some(&ada)).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false, "expired": true }));
    let renewed = fresh_token();
    h.refresh_returns(&renewed, "r2");

    let session = h.manager.synchronize().await;

    assert_eq!(session.user, Some(ada));
    assert_eq!(h.manager.token_store().access_token(), Some(renewed.clone()));
    assert_eq!(h.transport.count("/auth/refresh"), 1);
    // Cookie already rewritten when synchronize returns
    let cookie = h.transport.calls_to("/api/auth/set-cookie");
    assert_eq!(cookie.len(), 1);
    assert_eq!(json_body(&cookie[0])["accessToken"], renewed.as_str());
}

#[tokio::test]
async fn expired_cookie_refresh_verifies_user_when_no_record_cached() {
    let h = Harness::new();
    h.seed(&expired_token(), "r1", None).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false, "expired": true }));
    h.refresh_returns(&fresh_token(), "r2");
    // GET and POST share the path; the second call is the explicit-token check
    h.transport.respond_json(
        CHECK,
        200,
        json!({ "authenticated": true, "user": { "id": "u1", "email": "ada@example.com" }, "synced": true }),
    );

    let session = h.manager.synchronize().await;

    assert_eq!(session.user, Some(user("u1", "ada@example.com")));
    let checks = h.transport.calls_to(CHECK);
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[1].method, reqwest::Method::POST);
    assert_eq!(h.manager.token_store().cached_user(), Some(user("u1", "ada@example.com")));
}

#[tokio::test]
async fn expired_cookie_with_failed_refresh_clears_everything() {
    let h = Harness::new();
    h.seed(&expired_token(), "r1", Some(&user("u1", "ada@example.com"))).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false, "expired": true }));
    h.transport.respond("/auth/refresh", 401, r#"{"detail":"revoked"}"#);

    let session = h.manager.synchronize().await;

    assert!(session.user.is_none());
    assert!(h.manager.token_store().refresh_token().is_none());
    assert!(h.manager.token_store().cached_user().is_none());
    assert_eq!(h.transport.count("/api/auth/clear-cookie"), 1);
}

#[tokio::test]
async fn expired_cookie_without_refresh_credential_clears_once() {
    let h = Harness::new();
    h.seed(&expired_token(), "", Some(&user("u1", "ada@example.com"))).await;
    h.transport.respond_json(CHECK, 401, json!({ "authenticated": false, "expired": true }));

    let session = h.manager.synchronize().await;

    assert!(session.user.is_none());
    assert!(h.manager.token_store().access_token().is_none());
    assert_eq!(h.transport.count("/auth/refresh"), 0);
    assert_eq!(h.transport.count("/api/auth/clear-cookie"), 1);
}

#[tokio::test]
async fn network_failure_during_check_signs_out() {
    let h = Harness::new();
    h.seed(&fresh_token(), "r1", Some(&user("u1", "ada@example.com"))).await;
    h.transport.fail(CHECK);

    let session = h.manager.synchronize().await;

    assert!(session.user.is_none());
    assert!(h.manager.token_store().access_token().is_none());
    assert_eq!(h.transport.count("/api/auth/clear-cookie"), 1);
}

#[tokio::test]
async fn session_watchers_see_synchronized_user() {
    let h = Harness::new();
    let mut watcher = h.manager.subscribe();
    h.transport.respond_json(
        CHECK,
        200,
        json!({ "authenticated": true, "user": { "id": "u1", "email": "ada@example.com" } }),
    );

    h.manager.synchronize().await;

    assert!(watcher.has_changed().expect("sender alive"));
    assert_eq!(watcher.borrow_and_update().user_id(), Some("u1"));
}
