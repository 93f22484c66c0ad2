#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use db::models::ticket::{self, TicketStatus};
    use db::models::{category, ticket_message};
    use serde_json::{Value, json};
    use serial_test::serial;

    use crate::helpers::app::WEBHOOK_SECRET;
    use crate::helpers::{TestApp, body_json, json_request, make_test_app};

    async fn push(app: &TestApp, event_type: &str, ticket_data: Value) -> (StatusCode, Value) {
        let body = json!({ "secret": WEBHOOK_SECRET, "event_type": event_type, "ticket_data": ticket_data });
        let response = app.send(json_request("POST", "/api/webhooks/discord", None, body)).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    #[serial]
    async fn rejects_wrong_secret() {
        let app = make_test_app().await;
        let body = json!({ "secret": "nope", "event_type": "ticket_closed", "ticket_data": {} });

        let response = app.send(json_request("POST", "/api/webhooks/discord", None, body)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn ticket_lifecycle_events() {
        let app = make_test_app().await;
        let (alice, _) = app.staff("100000000000000001", "alice", false).await;

        let (status, _) = push(
            &app,
            "ticket_created",
            json!({
                "discord_channel_id": "700000000000000001",
                "discord_server_id": "500000000000000001",
                "title": "042-dave",
                "category_name": "claim",
                "priority": "high",
                "created_by_discord_id": "200000000000000001",
                "created_by_username": "dave",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let t = ticket::Model::find_by_channel_id(app.db(), "700000000000000001")
            .await
            .unwrap()
            .unwrap();
        let claim = category::Model::find_by_name(app.db(), "Claim").await.unwrap();
        assert_eq!(t.category_id, claim.map(|c| c.id));
        assert_eq!(t.status, TicketStatus::New);

        let message = json!({
            "discord_channel_id": "700000000000000001",
            "discord_message_id": "800000000000000001",
            "author_discord_id": "100000000000000001",
            "author_username": "alice",
            "content": "On it",
        });
        let (_, json) = push(&app, "ticket_message", message.clone()).await;
        assert_eq!(json["data"]["applied"], true);
        let (_, json) = push(&app, "ticket_message", message).await;
        assert_eq!(json["data"]["applied"], false, "duplicate message id");

        let stored = ticket_message::Model::list_for_ticket(app.db(), t.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_from_staff);
        let t = ticket::Model::find_by_id(app.db(), t.id).await.unwrap().unwrap();
        assert_eq!(t.unread_count, 1);

        push(
            &app,
            "ticket_claimed",
            json!({ "discord_channel_id": "700000000000000001", "claimed_by_discord_id": "100000000000000001" }),
        )
        .await;
        let t = ticket::Model::find_by_id(app.db(), t.id).await.unwrap().unwrap();
        assert_eq!(t.assigned_to_user_id, Some(alice.id));
        assert_eq!(t.status, TicketStatus::InProgress);

        push(&app, "ticket_closed", json!({ "discord_channel_id": "700000000000000001" })).await;
        let t = ticket::Model::find_by_id(app.db(), t.id).await.unwrap().unwrap();
        assert_eq!(t.status, TicketStatus::Resolved);
        assert!(t.closed_at.is_some());
    }

    #[tokio::test]
    #[serial]
    async fn unknown_events_are_acknowledged() {
        let app = make_test_app().await;

        let (status, json) = push(&app, "ticket_renamed", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["applied"], false);

        let (status, _) = push(&app, "ticket_closed", json!({ "wrong": 1 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
