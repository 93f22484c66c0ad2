#[cfg(test)]
mod tests {
    use axum::http::{Method, Request, StatusCode, header};
    use axum::body::Body;
    use db::models::ticket;
    use serde_json::json;
    use serial_test::serial;

    use crate::helpers::app::ADMIN_SECRET;
    use crate::helpers::{body_json, get_request, json_request, make_test_app};

    #[tokio::test]
    #[serial]
    async fn triggers_reject_wrong_secret() {
        let app = make_test_app().await;

        for uri in ["/api/jobs/sync", "/api/jobs/archive", "/api/jobs/fix-categories"] {
            let response = app.send(json_request("POST", uri, None, json!({ "admin_secret": "nope" }))).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    #[serial]
    async fn archive_trigger_reports_policy() {
        let app = make_test_app().await;
        let t = app.ticket("c1", "001-carol").await;
        t.resolve(app.db()).await.unwrap();

        let response = app
            .send(json_request("POST", "/api/jobs/archive", None, json!({ "admin_secret": ADMIN_SECRET })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total_resolved_before"], 1);
        assert_eq!(json["data"]["tickets_archived"], 0);
        assert_eq!(json["data"]["threshold"], 480);
        assert_eq!(ticket::Model::count_resolved_unarchived(app.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn sync_trigger_accepts_overrides() {
        let app = make_test_app().await;

        let response = app
            .send(json_request("POST", "/api/jobs/sync", None, json!({ "admin_secret": ADMIN_SECRET })))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "no guild configured");

        let body = json!({
            "admin_secret": ADMIN_SECRET,
            "guild_id": "500000000000000001",
            "category_mappings": { "600000000000000001": "Claim" },
        });
        let response = app.send(json_request("POST", "/api/jobs/sync", None, body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["tickets_found_on_discord"], 0);
        assert_eq!(json["data"]["new_tickets_created"], 0);
    }

    #[tokio::test]
    #[serial]
    async fn sync_trigger_conflicts_while_a_job_runs() {
        let app = make_test_app().await;
        let _held = app.state.try_job_guard().unwrap();

        let body = json!({
            "admin_secret": ADMIN_SECRET,
            "guild_id": "500000000000000001",
            "category_mappings": { "600000000000000001": "Claim" },
        });
        let response = app.send(json_request("POST", "/api/jobs/sync", None, body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[serial]
    async fn triggers_answer_cors_preflight() {
        let app = make_test_app().await;

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/jobs/sync")
            .header(header::ORIGIN, "https://cron.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    #[serial]
    async fn dashboard_routes_send_no_cors_headers() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000001", "alice", false).await;

        let mut req = get_request("/api/tickets", Some(&cookie));
        req.headers_mut()
            .insert(header::ORIGIN, "https://evil.example".parse().unwrap());
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/tickets")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.send(preflight).await;
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
