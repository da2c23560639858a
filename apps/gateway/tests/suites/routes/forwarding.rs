// Route → dispatch call shaping for queue-style domains.

use actix_web::http::StatusCode;
use actix_web::test;
use gateway::auth::Role;
use serde_json::json;

use crate::common::read_json;
use crate::support::{bearer, TestGateway};

#[actix_web::test]
async fn expense_create_stamps_verified_subject() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/expenses")
        .insert_header(("Authorization", bearer("user-42", Some(Role::User))))
        .set_json(json!({"description": "Coffee", "amount": 50000, "date": "2025-12-11"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);

    let calls = gw.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, "expense.create");
    assert_eq!(
        gw.backend.last_payload(),
        json!({
            "description": "Coffee",
            "amount": 50000,
            "date": "2025-12-11",
            "userId": "user-42"
        })
    );

    // The reply body is relayed verbatim
    let body = read_json(resp).await;
    assert_eq!(body["userId"], "user-42");
}

#[actix_web::test]
async fn expense_list_applies_paging_defaults() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/expenses?search=grab")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.backend.calls()[0].operation, "expense.findAll");
    assert_eq!(
        gw.backend.last_payload(),
        json!({"page": 1, "limit": 20, "search": "grab", "userId": "user-1"})
    );
}

#[actix_web::test]
async fn expense_update_merges_path_id() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::patch()
        .uri("/api/v1/expenses/exp-9")
        .insert_header(("Authorization", bearer("user-1", Some(Role::User))))
        .set_json(json!({"amount": 12.5}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.backend.calls()[0].operation, "expense.update");
    assert_eq!(
        gw.backend.last_payload(),
        json!({"amount": 12.5, "userId": "user-1", "id": "exp-9"})
    );
}

#[actix_web::test]
async fn query_passthrough_cannot_spoof_user_id() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/blogs/my-blogs?status=DRAFT&userId=someone-else")
        .insert_header(("Authorization", bearer("author-1", Some(Role::User))))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(gw.backend.calls()[0].operation, "blog.find_all");
    assert_eq!(
        gw.backend.last_payload(),
        json!({"status": "DRAFT", "userId": "author-1"})
    );
}

#[actix_web::test]
async fn blog_update_nests_data() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::patch()
        .uri("/api/v1/blogs/b-1")
        .insert_header(("Authorization", bearer("author-1", Some(Role::User))))
        .set_json(json!({"title": "New title"}))
        .to_request();
    test::call_service(&app, req).await;

    assert_eq!(
        gw.backend.last_payload(),
        json!({"id": "b-1", "userId": "author-1", "data": {"title": "New title"}})
    );
}

#[actix_web::test]
async fn blog_moderation_payloads_carry_admin_id() {
    let gw = TestGateway::new();
    let app = gw.service().await;
    let admin = bearer("admin-7", Some(Role::Admin));

    let req = test::TestRequest::post()
        .uri("/api/v1/blogs/b-1/approve")
        .insert_header(("Authorization", admin.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        gw.backend.last_payload(),
        json!({"id": "b-1", "approveDto": {"adminId": "admin-7"}})
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/blogs/b-1/reject")
        .insert_header(("Authorization", admin))
        .set_json(json!({"rejectionReason": "Spam"}))
        .to_request();
    test::call_service(&app, req).await;
    assert_eq!(
        gw.backend.last_payload(),
        json!({"id": "b-1", "rejectDto": {"adminId": "admin-7", "rejectionReason": "Spam"}})
    );
}

#[actix_web::test]
async fn public_blog_lookups_need_no_token() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/blogs/slug/hello-world")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let call = &gw.backend.calls()[0];
    assert_eq!(call.operation, "blog.find_by_slug");
    assert_eq!(gw.backend.last_payload(), json!("hello-world"));
}

#[actix_web::test]
async fn static_segments_win_over_ids() {
    let gw = TestGateway::new();
    let app = gw.service().await;
    let user = bearer("user-1", Some(Role::User));

    for (uri, operation) in [
        ("/api/v1/expenses/summary", "expense.summary"),
        ("/api/v1/expenses/categories", "categories.findAll"),
        ("/api/v1/expenses/abc", "expense.findOne"),
        ("/api/v1/budgets/b-1/progress", "budget.progress"),
        ("/api/v1/ocr/jobs", "ocr.history"),
        ("/api/v1/ocr/jobs/job-1", "ocr.find_one"),
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(("Authorization", user.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert_eq!(gw.backend.calls().last().unwrap().operation, operation);
    }
}

#[actix_web::test]
async fn ai_routes_stamp_user_id() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/ai/assistant/chat")
        .insert_header(("Authorization", bearer("user-5", Some(Role::User))))
        .set_json(json!({
            "message": "How much did I spend?",
            "history": [{"role": "user", "content": "hi"}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(gw.backend.calls()[0].operation, "ai.assistant_chat");
    let payload = gw.backend.last_payload();
    assert_eq!(payload["userId"], "user-5");
    assert_eq!(payload["message"], "How much did I spend?");
}

#[actix_web::test]
async fn http_domain_calls_forward_identity() {
    let gw = TestGateway::new();
    let app = gw.service().await;
    let header = bearer("user-1", Some(Role::User));

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications?page=2&isRead=false")
        .insert_header(("Authorization", header.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let call = gw.backend.calls_for("notification.list").pop().unwrap();
    let identity = call.identity.expect("identity forwarded");
    assert_eq!(identity.subject_id, "user-1");
    assert_eq!(format!("Bearer {}", identity.token), header);
    assert_eq!(
        call.query,
        vec![
            ("page".to_string(), "2".to_string()),
            ("isRead".to_string(), "false".to_string())
        ]
    );
}

#[actix_web::test]
async fn stats_queries_get_defaults() {
    let gw = TestGateway::new();
    let app = gw.service().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/stats/users-over-time")
        .insert_header(("Authorization", bearer("admin-1", Some(Role::Admin))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let call = gw.backend.calls_for("auth.users_over_time").pop().unwrap();
    assert_eq!(call.path, "stats/users-over-time");
    assert_eq!(
        call.query,
        vec![
            ("period".to_string(), "daily".to_string()),
            ("days".to_string(), "30".to_string())
        ]
    );
}
