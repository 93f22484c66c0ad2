#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use db::models::ticket::{self, TicketStatus};
    use db::models::ticket_activity_log::{self, ActivityAction};
    use db::models::ticket_message::{self, NewMessage};
    use db::models::ticket_vote::{self, VoteValue};
    use serde_json::json;
    use serial_test::serial;

    use crate::helpers::{TestApp, body_json, get_request, json_request, make_test_app};

    async fn enable_voting(app: &TestApp, ticket_id: i64) {
        let t = ticket::Model::find_by_id(app.db(), ticket_id).await.unwrap().unwrap();
        t.set_voting(app.db(), true).await.unwrap();
    }

    async fn post_message(app: &TestApp, ticket_id: i64, id: &str) {
        ticket_message::Model::insert_if_absent(
            app.db(),
            NewMessage {
                ticket_id,
                discord_message_id: id.into(),
                author_discord_id: "200000000000000001".into(),
                author_username: "customer".into(),
                author_avatar_url: None,
                content: "hello".into(),
                is_from_staff: false,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn listing_requires_a_session() {
        let app = make_test_app().await;

        let response = app.send(get_request("/api/tickets", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.send(get_request("/api/tickets", Some("session=bogus"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn listing_filters_and_reports_unread_counts() {
        let app = make_test_app().await;
        let (alice, cookie) = app.staff("100000000000000001", "alice", false).await;
        let mine = app.ticket("c1", "001-alice-bob").await;
        let other = app.ticket("c2", "002-carol").await;
        mine.assign(app.db(), alice.id, None).await.unwrap();
        post_message(&app, other.id, "m1").await;
        post_message(&app, other.id, "m2").await;

        let response = app.send(get_request("/api/tickets", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["limit"], 50);
        assert_eq!(json["data"]["stats"]["pending_count"], 1);
        let listed = json["data"]["tickets"].as_array().unwrap();
        let carol = listed.iter().find(|t| t["id"] == other.id).unwrap();
        assert_eq!(carol["user_unread_count"], 2);

        let response = app
            .send(get_request("/api/tickets?assigned_to=me&limit=500", Some(&cookie)))
            .await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["total"], 1);
        assert_eq!(json["data"]["limit"], 200);
        assert_eq!(json["data"]["tickets"][0]["assigned_to_username"], "alice");

        let response = app.send(get_request("/api/tickets?status=bogus", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn opening_a_ticket_marks_it_read() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000001", "alice", false).await;
        let t = app.ticket("c1", "001-bob").await;
        post_message(&app, t.id, "m1").await;

        let response = app.send(get_request(&format!("/api/tickets/{}", t.id), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"]["my_vote"], serde_json::Value::Null);

        let response = app.send(get_request("/api/tickets", Some(&cookie))).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["tickets"][0]["user_unread_count"], 0);

        let missing = app.send(get_request("/api/tickets/9999", Some(&cookie))).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn vote_lifecycle() {
        let app = make_test_app().await;
        let (alice, cookie) = app.staff("100000000000000001", "alice", false).await;
        let (_, manager) = app.staff("100000000000000002", "bob", true).await;
        let t = app.ticket("c1", "001-carol").await;
        let votes = format!("/api/tickets/{}/votes", t.id);

        let response = app.send(json_request("POST", &votes, Some(&cookie), json!({ "vote": "for" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "voting not enabled yet");

        enable_voting(&app, t.id).await;

        let response = app.send(json_request("POST", &votes, Some(&cookie), json!({ "vote": "for" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_update"], false);
        assert_eq!(json["data"]["stats"]["votes_for"], 1);

        let response = app.send(json_request("POST", &votes, Some(&cookie), json!({ "vote": "for" }))).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["vote_unchanged"], true);

        let response = app
            .send(json_request("POST", &votes, Some(&cookie), json!({ "vote": "against" })))
            .await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_update"], true);
        assert_eq!(json["data"]["stats"]["votes_against"], 1);
        assert_eq!(json["data"]["stats"]["total_votes"], 1);

        let row = ticket_vote::Model::find_for_user(app.db(), t.id, alice.id).await.unwrap().unwrap();
        assert_eq!(row.vote, VoteValue::Against);
        let cast = ticket_activity_log::Model::for_ticket_with_action(app.db(), t.id, ActivityAction::VoteCast)
            .await
            .unwrap();
        let changed = ticket_activity_log::Model::for_ticket_with_action(app.db(), t.id, ActivityAction::VoteChanged)
            .await
            .unwrap();
        assert_eq!((cast.len(), changed.len()), (1, 1));

        let close = format!("/api/tickets/{}/votes/close", t.id);
        let response = app.send(json_request("POST", &close, Some(&cookie), json!({}))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.send(json_request("POST", &close, Some(&manager), json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.send(json_request("POST", &close, Some(&manager), json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.send(json_request("POST", &votes, Some(&cookie), json!({ "vote": "for" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "closed vote");

        let toggle = format!("/api/tickets/{}/voting", t.id);
        let response = app
            .send(json_request("PUT", &toggle, Some(&manager), json!({ "enable": false })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let t = ticket::Model::find_by_id(app.db(), t.id).await.unwrap().unwrap();
        assert!(!t.voting_enabled);
        assert!(!t.voting_closed);
        assert!(t.voting_closed_at.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn claim_assigns_and_logs() {
        let app = make_test_app().await;
        let (alice, cookie) = app.staff("100000000000000001", "alice", false).await;
        let (bob, _) = app.staff("100000000000000002", "bob", false).await;
        let t = app.ticket("c1", "001-carol").await;
        let claim = format!("/api/tickets/{}/claim", t.id);

        let response = app.send(json_request("POST", &claim, Some(&cookie), json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["assigned_to_user_id"], alice.id);
        assert_eq!(json["data"]["status"], "in_progress");

        let response = app
            .send(json_request("POST", &claim, Some(&cookie), json!({ "user_id": bob.id })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let logs = ticket_activity_log::Model::for_ticket_with_action(app.db(), t.id, ActivityAction::Assigned)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].comment.as_deref(), Some("Self-assigned"));
        assert_eq!(logs[1].comment.as_deref(), Some("Assigned by staff"));
        assert_eq!(logs[1].new_value, Some(bob.id.to_string()));

        let response = app
            .send(json_request("POST", &claim, Some(&cookie), json!({ "user_id": 9999 })))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn priority_update_and_clear() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000001", "alice", false).await;
        let t = app.ticket("c1", "001-carol").await;
        let uri = format!("/api/tickets/{}/priority", t.id);

        let response = app.send(json_request("PUT", &uri, Some(&cookie), json!({ "priority": "high" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["priority"], "high");

        let response = app.send(json_request("PUT", &uri, Some(&cookie), json!({ "priority": null }))).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["priority"], serde_json::Value::Null);

        let response = app.send(json_request("PUT", &uri, Some(&cookie), json!({ "priority": "urgent" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let logs = ticket_activity_log::Model::for_ticket_with_action(app.db(), t.id, ActivityAction::PriorityChanged)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].old_value.as_deref(), Some("medium"));
        assert_eq!(logs[1].new_value, None);
    }

    #[tokio::test]
    #[serial]
    async fn mark_all_read_covers_resolved_tickets() {
        let app = make_test_app().await;
        let (_, cookie) = app.staff("100000000000000001", "alice", false).await;
        let open = app.ticket("c1", "001-carol").await;
        let closed = app.ticket("c2", "002-dave").await;
        post_message(&app, open.id, "m1").await;
        post_message(&app, closed.id, "m2").await;
        let closed = closed.resolve(app.db()).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Resolved);

        let response = app.send(json_request("POST", "/api/tickets/read-all", Some(&cookie), json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["tickets_marked"], 2);

        let response = app.send(get_request("/api/tickets", Some(&cookie))).await;
        let json = body_json(response).await;
        for t in json["data"]["tickets"].as_array().unwrap() {
            assert_eq!(t["user_unread_count"], 0);
        }
    }
}
