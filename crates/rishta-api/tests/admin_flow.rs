mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

async fn file_report(app: &TestApp, reporter_token: &str, reported: uuid::Uuid) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/reports",
            Some(reporter_token),
            Some(json!({ "reported_user_id": reported, "reason": "Fake profile" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["report"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn token_namespaces_are_separate() {
    let app = TestApp::new();
    let member = app.register("ravi@example.com", "groom").await;
    let admin = app.admin_token().await;

    let (status, _) = app.call(Method::GET, "/admin/dashboard", Some(&member.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/api/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::GET, "/admin/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"]["email"], common::ADMIN_EMAIL);

    let (status, _) = app
        .call(
            Method::POST,
            "/admin/auth/login",
            None,
            Some(json!({ "email": common::ADMIN_EMAIL, "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resolving_with_block_action_blocks_the_member() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let reporter = app.register("asha@example.com", "bride").await;
    let offender = app.register("ravi@example.com", "groom").await;

    let report_id = file_report(&app, &reporter.token, offender.id).await;
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/reports/{}/resolve", report_id),
            Some(&admin),
            Some(json!({ "action": "User blocked and warned" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_blocked"], true);
    assert_eq!(body["report"]["status"], "resolved");

    let user = app.db().get_user(offender.id).unwrap().unwrap();
    assert!(user.is_blocked);
    assert!(user.block_reason.unwrap().contains(&report_id));

    let (status, _) = app.call(Method::GET, "/api/me", Some(&offender.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ravi@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/admin/reports/{}/resolve", report_id),
            Some(&admin),
            Some(json!({ "action": "Warning sent" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn resolving_with_warning_leaves_member_active() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let reporter = app.register("asha@example.com", "bride").await;
    let offender = app.register("ravi@example.com", "groom").await;

    let report_id = file_report(&app, &reporter.token, offender.id).await;
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/reports/{}/resolve", report_id),
            Some(&admin),
            Some(json!({ "action": "Warning sent" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_blocked"], false);
    assert!(!app.db().get_user(offender.id).unwrap().unwrap().is_blocked);

    let second = file_report(&app, &reporter.token, offender.id).await;
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/reports/{}/dismiss", second),
            Some(&admin),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "dismissed");

    let (_, body) = app
        .call(Method::GET, "/admin/reports?status=pending", Some(&admin), None)
        .await;
    assert_eq!(body["pagination"]["total"], 0);
    let (status, _) = app
        .call(Method::GET, "/admin/reports?status=bogus", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_redemptions_of_a_single_use_code() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let a = app.register("ravi@example.com", "groom").await;
    let b = app.register("asha@example.com", "bride").await;

    let now = chrono::Utc::now();
    let (status, body) = app
        .call(
            Method::POST,
            "/admin/promo-codes",
            Some(&admin),
            Some(json!({
                "code": "once",
                "discount_type": "fixed",
                "discount_value": 10_000,
                "usage_limit": 1,
                "valid_from": now - chrono::Duration::hours(1),
                "valid_until": now + chrono::Duration::days(1),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["promo_code"]["code"], "ONCE");

    let purchase = |reference: &str| json!({ "payment_reference": reference, "promo_code": "ONCE" });
    let (first, second) = tokio::join!(
        app.call(Method::POST, "/api/boost/purchase", Some(&a.token), Some(purchase("pay_a"))),
        app.call(Method::POST, "/api/boost/purchase", Some(&b.token), Some(purchase("pay_b"))),
    );
    let mut statuses = [first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, [201, 409]);

    let promo = app.db().get_promo_code_by_code("ONCE").unwrap().unwrap();
    assert_eq!(promo.usage_count, 1);

    let (_, body) = app
        .call(Method::GET, "/admin/transactions?status=completed", Some(&admin), None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn promo_code_administration() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let now = chrono::Utc::now();
    let terms = |discount_type: &str, value: i64| {
        json!({
            "discount_type": discount_type,
            "discount_value": value,
            "usage_limit": 10,
            "valid_from": now,
            "valid_until": now + chrono::Duration::days(30),
        })
    };

    let (status, _) = app
        .call(Method::POST, "/admin/promo-codes", Some(&admin), Some(terms("percentage", 150)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/admin/promo-codes", Some(&admin), Some(terms("percentage", 20)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = body["promo_code"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);
    let id = body["promo_code"]["id"].as_str().unwrap().to_string();

    let mut duplicate = terms("fixed", 500);
    duplicate["code"] = json!(code.to_lowercase());
    let (status, _) = app
        .call(Method::POST, "/admin/promo-codes", Some(&admin), Some(duplicate))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/promo-codes/{}", id),
            Some(&admin),
            Some(json!({ "discount_value": 25, "description": "Diwali" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promo_code"]["discount_value"], 25);
    assert_eq!(body["promo_code"]["description"], "Diwali");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/admin/promo-codes/{}", id),
            Some(&admin),
            Some(json!({ "discount_value": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::PUT, &format!("/admin/promo-codes/{}/toggle", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promo_code"]["is_active"], false);

    let member = app.register("ravi@example.com", "groom").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/promo-codes/validate",
            Some(&member.token),
            Some(json!({ "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::DELETE, &format!("/admin/promo-codes/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.call(Method::GET, "/admin/promo-codes", Some(&admin), None).await;
    assert_eq!(body["promo_codes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn user_administration() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let bride = app.register("asha@example.com", "bride").await;
    let groom = app.register("ravi@example.com", "groom").await;

    let (status, body) = app
        .call(Method::GET, "/admin/users?role=bride", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["users"][0]["email"], "asha@example.com");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/users/{}/verify", bride.id),
            Some(&admin),
            Some(json!({ "verified": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_verified"], true);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/admin/users/{}/boost", bride.id),
            Some(&admin),
            Some(json!({ "days": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction"]["kind"], "boost_grant");
    assert_eq!(body["transaction"]["final_amount_cents"], 0);

    let (_, body) = app
        .call(Method::GET, "/admin/users?boost=active", Some(&admin), None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/admin/users/{}/block", groom.id),
            Some(&admin),
            Some(json!({ "reason": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/users/{}/block", groom.id),
            Some(&admin),
            Some(json!({ "reason": "Abusive messages" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["block_reason"], "Abusive messages");
    let (status, _) = app.call(Method::GET, "/api/me", Some(&groom.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::PUT, &format!("/admin/users/{}/unblock", groom.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::GET, "/api/me", Some(&groom.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/admin/dashboard", Some(&admin), None).await;
    assert_eq!(body["stats"]["total_users"], 2);
    assert_eq!(body["stats"]["verified_users"], 1);
    assert_eq!(body["stats"]["active_boosts"], 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/admin/users/{}", groom.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(Method::GET, &format!("/admin/users/{}", groom.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::GET, "/api/me", Some(&groom.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn broadcast_targets_a_role() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let bride = app.register("asha@example.com", "bride").await;
    app.register("meena@example.com", "bride").await;
    let groom = app.register("ravi@example.com", "groom").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/admin/notifications/broadcast",
            Some(&admin),
            Some(json!({ "title": "Festive offer", "body": "20% off boosts", "role": "bride" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipients"], 2);

    let (_, body) = app.call(Method::GET, "/api/notifications", Some(&bride.token), None).await;
    assert_eq!(body["notifications"][0]["kind"], "announcement");
    let (_, body) = app.call(Method::GET, "/api/notifications", Some(&groom.token), None).await;
    assert_eq!(body["unread_count"], 0);

    let (_, body) = app.call(Method::GET, "/admin/notifications", Some(&admin), None).await;
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn settings_update_and_maintenance() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let member = app.register("ravi@example.com", "groom").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/admin/settings",
            Some(&admin),
            Some(json!({ "boost_duration_days": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            "/admin/settings",
            Some(&admin),
            Some(json!({ "boost_price_cents": 99_900, "maintenance_mode": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["boost_price_cents"], 99_900);
    assert_eq!(body["settings"]["currency"], "INR");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/boost/purchase",
            Some(&member.token),
            Some(json!({ "payment_reference": "pay_1" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, body) = app.call(Method::GET, "/api/boost", Some(&member.token), None).await;
    assert_eq!(body["price_cents"], 99_900);

    let (status, body) = app.call(Method::GET, "/admin/settings", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["maintenance_mode"], true);
}

#[tokio::test]
async fn boost_price_is_bounded_and_discounts_stay_exact() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let member = app.register("ravi@example.com", "groom").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/admin/settings",
            Some(&admin),
            Some(json!({ "boost_price_cents": 200_000_000_000_000_000_i64 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::PUT,
            "/admin/settings",
            Some(&admin),
            Some(json!({ "boost_price_cents": 100_000_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let now = chrono::Utc::now();
    let (status, _) = app
        .call(
            Method::POST,
            "/admin/promo-codes",
            Some(&admin),
            Some(json!({
                "code": "HALF",
                "discount_type": "percentage",
                "discount_value": 50,
                "usage_limit": 5,
                "valid_from": now - chrono::Duration::hours(1),
                "valid_until": now + chrono::Duration::days(1),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/boost/purchase",
            Some(&member.token),
            Some(json!({ "payment_reference": "pay_big", "promo_code": "HALF" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["transaction"]["discount_cents"], 50_000_000);
    assert_eq!(body["transaction"]["final_amount_cents"], 50_000_000);

    let (status, _) = app.call(Method::GET, "/api/me", Some(&member.token), None).await;
    assert_eq!(status, StatusCode::OK);
}
