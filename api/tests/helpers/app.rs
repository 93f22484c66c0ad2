use api::routes::app;
use api::state::AppState;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use chrono::{Duration, Utc};
use db::models::session::{self, NewSession};
use db::models::ticket::{self, NewTicket, TicketPriority};
use db::models::user::{self, DiscordIdentity, PermissionUpdate};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use services::discord::{Channel, ChatError, ChatPlatform, DiscordUser, Message, OAuthProvider, TokenGrant};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use util::config::AppConfig;

pub const ADMIN_SECRET: &str = "test-admin-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub fn discord_user(id: &str, username: &str) -> DiscordUser {
    DiscordUser {
        id: id.into(),
        username: username.into(),
        discriminator: None,
        global_name: None,
        avatar: None,
        bot: false,
        email: None,
    }
}

/// Discord with no channels and a fixed set of known users.
#[derive(Default)]
pub struct StubDiscord {
    users: Mutex<HashMap<String, DiscordUser>>,
}

impl StubDiscord {
    pub fn add_user(&self, user: DiscordUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl ChatPlatform for StubDiscord {
    async fn list_guild_channels(&self, _guild_id: &str) -> Result<Vec<Channel>, ChatError> {
        Ok(Vec::new())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, ChatError> {
        Err(ChatError::NotFound(format!("/channels/{channel_id}")))
    }

    async fn list_channel_messages(
        &self,
        _channel_id: &str,
        _after: Option<&str>,
        _limit: u8,
    ) -> Result<Vec<Message>, ChatError> {
        Ok(Vec::new())
    }

    async fn get_user(&self, user_id: &str) -> Result<DiscordUser, ChatError> {
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound(format!("/users/{user_id}")))
    }
}

/// OAuth provider that accepts the code `good` and signs in `profile`.
pub struct StubOAuth {
    profile: Mutex<DiscordUser>,
}

impl Default for StubOAuth {
    fn default() -> Self {
        Self {
            profile: Mutex::new(discord_user("100000000000000001", "alice")),
        }
    }
}

impl StubOAuth {
    pub fn sign_in_as(&self, profile: DiscordUser) {
        *self.profile.lock().unwrap() = profile;
    }
}

#[async_trait]
impl OAuthProvider for StubOAuth {
    fn authorize_url(&self, state: &str) -> Result<String, ChatError> {
        Ok(format!("https://discord.test/oauth2/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ChatError> {
        if code != "good" {
            return Err(ChatError::Status {
                status: 400,
                path: "/oauth2/token".into(),
                body: "invalid_grant".into(),
            });
        }
        Ok(TokenGrant {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_in: Some(604800),
        })
    }

    async fn current_user(&self, _access_token: &str) -> Result<DiscordUser, ChatError> {
        Ok(self.profile.lock().unwrap().clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub discord: Arc<StubDiscord>,
    pub oauth: Arc<StubOAuth>,
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        self.state.db()
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Dashboard user with a live session; returns the user and its `Cookie` header value.
    pub async fn staff(&self, discord_id: &str, username: &str, can_manage_votes: bool) -> (user::Model, String) {
        let account = create_user(self.db(), discord_id, username, can_manage_votes).await;
        let cookie = self.login(&account).await;
        (account, cookie)
    }

    pub async fn login(&self, account: &user::Model) -> String {
        let created = session::Model::create(self.db(), NewSession::new(account.id, Duration::days(7)))
            .await
            .unwrap();
        format!("session={}", created.session_token)
    }

    pub async fn ticket(&self, channel_id: &str, title: &str) -> ticket::Model {
        ticket::Model::insert_if_absent(
            self.db(),
            NewTicket {
                discord_channel_id: channel_id.into(),
                discord_server_id: "guild".into(),
                title: title.into(),
                category_id: None,
                priority: Some(TicketPriority::Medium),
                created_by_discord_id: "200000000000000001".into(),
                created_by_username: "customer".into(),
                created_by_avatar_url: None,
                assigned_to_user_id: None,
                unread_count: 0,
                created_at: Utc::now(),
                last_message_at: None,
            },
        )
        .await
        .unwrap()
        .unwrap()
    }
}

pub async fn create_user(
    db: &DatabaseConnection,
    discord_id: &str,
    username: &str,
    can_manage_votes: bool,
) -> user::Model {
    let identity = DiscordIdentity {
        discord_id: discord_id.into(),
        username: username.into(),
        ..Default::default()
    };
    user::Model::create_from_discord(db, &identity, true)
        .await
        .unwrap()
        .update_permissions(
            db,
            PermissionUpdate {
                can_manage_votes: Some(can_manage_votes),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

/// Router over a fresh database, with stubbed Discord and test secrets configured.
pub async fn make_test_app() -> TestApp {
    AppConfig::reset();
    AppConfig::set_admin_secret(ADMIN_SECRET);
    AppConfig::set_webhook_secret(WEBHOOK_SECRET);

    let db = setup_test_db().await;
    let discord = Arc::new(StubDiscord::default());
    let oauth = Arc::new(StubOAuth::default());
    let state = AppState::new(db, discord.clone(), oauth.clone());

    TestApp {
        router: app(state.clone()),
        state,
        discord,
        oauth,
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}
