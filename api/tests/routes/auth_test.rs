#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};
    use db::models::user;
    use sea_orm::{ActiveModelTrait, Set};
    use serial_test::serial;

    use crate::helpers::app::{create_user, discord_user};
    use crate::helpers::{body_json, get_request, make_test_app};

    fn state_for(return_to: &str) -> String {
        api::routes::auth::common::LoginState::new(Some(return_to)).encode()
    }

    #[tokio::test]
    #[serial]
    async fn login_redirects_to_discord_with_state() {
        let app = make_test_app().await;

        let response = app.send(get_request("/api/auth/discord?return_to=/tickets.html", None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://discord.test/oauth2/authorize?state="));
    }

    #[tokio::test]
    #[serial]
    async fn callback_opens_session_and_redirects() {
        let app = make_test_app().await;
        create_user(app.db(), "100000000000000001", "alice", false).await;

        let uri = format!("/api/auth/callback?code=good&state={}", state_for("/tickets.html"));
        let response = app.send(get_request(&uri, None)).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/tickets.html");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));

        let token = cookie.split(';').next().unwrap().to_string();
        let me = app.send(get_request("/api/auth/me", Some(&token))).await;
        assert_eq!(me.status(), StatusCode::OK);
        let json = body_json(me).await;
        assert_eq!(json["data"]["user"]["username"], "alice");
    }

    #[tokio::test]
    #[serial]
    async fn callback_refuses_accounts_without_dashboard_access() {
        let app = make_test_app().await;
        app.oauth.sign_in_as(discord_user("100000000000000009", "stranger"));

        let response = app.send(get_request("/api/auth/callback?code=good", None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // First login still records the account for a later grant.
        let stranger = user::Model::find_by_discord_id(app.db(), "100000000000000009").await.unwrap();
        assert!(stranger.is_some_and(|u| !u.can_access_dashboard));
    }

    #[tokio::test]
    #[serial]
    async fn admin_page_requires_super_admin() {
        let app = make_test_app().await;
        create_user(app.db(), "100000000000000001", "alice", false).await;

        for target in ["/admin.html", "/admin.html#users"] {
            let uri = format!("/api/auth/callback?code=good&state={}", state_for(target));
            let response = app.send(get_request(&uri, None)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{target}");
        }
    }

    #[tokio::test]
    #[serial]
    async fn callback_without_code_is_bad_request() {
        let app = make_test_app().await;

        let response = app.send(get_request("/api/auth/callback?error=access_denied", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn me_requires_a_session() {
        let app = make_test_app().await;

        let response = app.send(get_request("/api/auth/me", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn revoked_access_is_forbidden() {
        let app = make_test_app().await;
        let (alice, cookie) = app.staff("100000000000000001", "alice", false).await;

        let mut active: user::ActiveModel = alice.into();
        active.can_access_dashboard = Set(false);
        active.update(app.db()).await.unwrap();

        let response = app.send(get_request("/api/auth/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn logout_clears_session() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000001", "alice", false).await;

        let response = app.send(get_request("/api/auth/logout", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers()[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

        let me = app.send(get_request("/api/auth/me", Some(&cookie))).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }
}
