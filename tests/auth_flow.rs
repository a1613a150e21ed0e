use anyhow::{ensure, Context, Result};
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use raiko::{
    api::{router_with_state, ApiState},
    auth::{AuthWorkflow, CredentialHasher, InMemoryDirectory, ManualClock, TokenIssuer},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

const T0: i64 = 1_700_000_000;
const HOUR: i64 = 3600;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Result<Self> {
        let clock = Arc::new(ManualClock::new(T0));
        let tokens = TokenIssuer::new(
            &SecretString::from("integration-secret".to_string()),
            Duration::from_secs(24 * 60 * 60),
        )?
        .with_clock(clock.clone());
        let workflow = AuthWorkflow::new(
            Arc::new(InMemoryDirectory::new()),
            CredentialHasher::new().with_cost(4),
            tokens,
        );
        Ok(Self {
            router: router_with_state(Arc::new(ApiState::new(workflow))),
            clock,
        })
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = serde_json::from_slice(&bytes).context("response is not JSON")?;
        Ok((status, value))
    }

    async fn post(&self, uri: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }

    async fn session(&self, token: &str) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/session")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())?;
        self.send(request).await
    }
}

#[tokio::test]
async fn register_login_and_collisions() -> Result<()> {
    let app = TestApp::new()?;

    let (status, _) = app
        .post(
            "/api/v1/register",
            &json!({"email": "a@x.com", "username": "alice", "password": "Abc12345!"}),
        )
        .await?;
    ensure!(status == StatusCode::CREATED, "register returned {status}");

    let (status, body) = app
        .post(
            "/api/v1/login",
            &json!({"login": "alice", "password": "Abc12345!"}),
        )
        .await?;
    ensure!(status == StatusCode::OK, "login returned {status}");
    let token = body["token"].as_str().context("missing token")?.to_string();

    let (status, session) = app.session(&token).await?;
    ensure!(status == StatusCode::OK, "session returned {status}");
    assert_eq!(session["role"], "user");
    assert_eq!(session["expires_at"], T0 + 24 * HOUR);

    let (wrong_status, wrong_body) = app
        .post(
            "/api/v1/login",
            &json!({"login": "alice", "password": "wrongpass"}),
        )
        .await?;
    let (missing_status, missing_body) = app
        .post(
            "/api/v1/login",
            &json!({"login": "nouser", "password": "whatever"}),
        )
        .await?;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, missing_body);

    let (status, body) = app
        .post(
            "/api/v1/register",
            &json!({"email": "a@x.com", "username": "bob", "password": "Abc12345!"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email or username already exists");

    Ok(())
}

#[tokio::test]
async fn token_expires_after_ttl() -> Result<()> {
    let app = TestApp::new()?;

    app.post(
        "/api/v1/register",
        &json!({"email": "a@x.com", "username": "alice", "password": "Abc12345!"}),
    )
    .await?;
    let (_, body) = app
        .post(
            "/api/v1/login",
            &json!({"login": "a@x.com", "password": "Abc12345!"}),
        )
        .await?;
    let token = body["token"].as_str().context("missing token")?.to_string();

    app.clock.set(T0 + 23 * HOUR);
    let (status, _) = app.session(&token).await?;
    assert_eq!(status, StatusCode::OK);

    app.clock.set(T0 + 25 * HOUR);
    let (status, body) = app.session(&token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");

    Ok(())
}

#[tokio::test]
async fn concurrent_registrations_store_one_user() -> Result<()> {
    let app = Arc::new(TestApp::new()?);

    let mut handles = Vec::new();
    for i in 0..6 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.post(
                "/api/v1/register",
                &json!({
                    "email": format!("user{i}@x.com"),
                    "username": "alice",
                    "password": "Abc12345!",
                }),
            )
            .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        let (status, _) = handle.await??;
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => anyhow::bail!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 5);

    Ok(())
}
