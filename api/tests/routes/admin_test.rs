#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use db::models::{role, user};
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::json;
    use serial_test::serial;

    use crate::helpers::app::{ADMIN_SECRET, create_user, discord_user};
    use crate::helpers::{TestApp, body_json, get_request, json_request, make_test_app};

    async fn super_admin(app: &TestApp) -> (user::Model, String) {
        let account = create_user(app.db(), "100000000000000001", "root", true).await;
        let mut active: user::ActiveModel = account.into();
        active.is_super_admin = Set(true);
        let account = active.update(app.db()).await.unwrap();
        let cookie = app.login(&account).await;
        (account, cookie)
    }

    #[tokio::test]
    #[serial]
    async fn user_management_requires_super_admin() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000002", "alice", false).await;

        let response = app.send(get_request("/api/admin/users", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn super_admin_updates_permissions_and_roles() {
        let app = make_test_app().await;
        let (_, cookie) = super_admin(&app).await;
        let alice = create_user(app.db(), "100000000000000002", "alice", false).await;
        let roles = role::Model::list_active(app.db()).await.unwrap();
        let role_ids: Vec<i64> = roles.iter().take(2).map(|r| r.id).collect();

        let uri = format!("/api/admin/users/{}", alice.id);
        let response = app
            .send(json_request(
                "PUT",
                &uri,
                Some(&cookie),
                json!({ "can_manage_votes": true, "role_ids": role_ids }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["can_manage_votes"], true);
        assert_eq!(json["data"]["can_access_dashboard"], true);
        assert_eq!(json["data"]["roles"].as_array().unwrap().len(), 2);

        let response = app
            .send(json_request("PUT", &uri, Some(&cookie), json!({ "role_ids": [] })))
            .await;
        let json = body_json(response).await;
        assert!(json["data"]["roles"].as_array().unwrap().is_empty());

        let response = app
            .send(json_request("PUT", &uri, Some(&cookie), json!({ "role_ids": [9999] })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let listed = body_json(app.send(get_request("/api/admin/users", Some(&cookie))).await).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 2);
        assert_eq!(listed["data"][0]["is_super_admin"], true);
    }

    #[tokio::test]
    #[serial]
    async fn super_admin_cannot_lock_themselves_out() {
        let app = make_test_app().await;
        let (me, cookie) = super_admin(&app).await;
        let uri = format!("/api/admin/users/{}", me.id);

        let response = app
            .send(json_request("PUT", &uri, Some(&cookie), json!({ "is_active": false })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(json_request("PUT", &uri, Some(&cookie), json!({ "can_access_dashboard": false })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn create_user_fetches_discord_profile() {
        let app = make_test_app().await;
        let (_, cookie) = super_admin(&app).await;
        app.discord.add_user(discord_user("300000000000000001", "newbie"));

        let body = json!({ "discord_id": "300000000000000001" });
        let response = app.send(json_request("POST", "/api/admin/users", Some(&cookie), body.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["username"], "newbie");
        assert_eq!(json["data"]["can_access_dashboard"], true);

        let response = app.send(json_request("POST", "/api/admin/users", Some(&cookie), body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let unknown = json!({ "discord_id": "300000000000000002" });
        let response = app.send(json_request("POST", "/api/admin/users", Some(&cookie), unknown)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let malformed = json!({ "discord_id": "abc" });
        let response = app.send(json_request("POST", "/api/admin/users", Some(&cookie), malformed)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn grant_access_is_secret_guarded() {
        let app = make_test_app().await;
        app.oauth.sign_in_as(discord_user("400000000000000001", "pending"));
        app.send(get_request("/api/auth/callback?code=good", None)).await;

        let response = app
            .send(json_request(
                "POST",
                "/api/admin/grant-access",
                None,
                json!({ "admin_secret": "wrong", "discord_id": "400000000000000001" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .send(json_request(
                "POST",
                "/api/admin/grant-access",
                None,
                json!({ "admin_secret": ADMIN_SECRET, "discord_id": "400000000000000001" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let pending = user::Model::find_by_discord_id(app.db(), "400000000000000001")
            .await
            .unwrap()
            .unwrap();
        assert!(pending.can_access_dashboard);

        let response = app
            .send(json_request(
                "POST",
                "/api/admin/grant-access",
                None,
                json!({ "admin_secret": ADMIN_SECRET, "discord_id": "400000000000000002" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
