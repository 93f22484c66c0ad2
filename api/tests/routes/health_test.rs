#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serial_test::serial;

    use crate::helpers::{body_json, get_request, make_test_app};

    #[tokio::test]
    #[serial]
    async fn health_check_returns_ok_json() {
        let app = make_test_app().await;

        let response = app.send(get_request("/api/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "OK");
        assert_eq!(json["message"], "Health check passed");
    }
}
