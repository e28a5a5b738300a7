use std::collections::BTreeSet;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::StatusCode;
use serde_json::{Value, json};

use fieldgate_api::config::Settings;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let settings = Settings {
            jwt_secret: JWT_SECRET.to_string(),
            app_base_url: "http://app.test".to_string(),
            ..Settings::default()
        };
        let app = fieldgate_api::app::build_app(&settings)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn token(&self, username: &str, password: &str) -> String {
        let res = self.login(username, password).await;
        assert_eq!(res.status(), StatusCode::OK, "login failed for {username}");
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.token("admin", "admin123").await
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn create_role(&self, token: &str, name: &str) -> i64 {
        let res = self.post("/admin/roles", token, json!({ "name": name })).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let role: Value = res.json().await.unwrap();
        role["id"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn token_param(link: &str) -> String {
    link.rsplit("token=").next().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    for path in ["/data/employees", "/admin/roles", "/auth/permissions"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");
    }
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();
    let claims = json!({
        "sub": 1,
        "username": "admin",
        "role_id": 1,
        "iat": now.timestamp(),
        "exp": (now + ChronoDuration::minutes(10)).timestamp(),
    });
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"not-the-server-secret"),
    )
    .unwrap();

    let res = srv.get("/data/employees", &forged).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_reports_failures_and_embeds_role() {
    let srv = TestServer::spawn().await;

    let res = srv.login("admin", "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = srv.login("ghost", "admin123").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.login("admin", "admin123").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], "admin");

    let decoded = jsonwebtoken::decode::<Value>(
        body["token"].as_str().unwrap(),
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();
    assert_eq!(decoded.claims["role_id"], body["user"]["role_id"]);
}

#[tokio::test]
async fn viewer_sees_only_granted_columns() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    for (name, position, salary, department) in [
        ("Ada", "Engineer", 120_000, "R&D"),
        ("Grace", "Admiral", 150_000, "Navy"),
        ("Linus", "Maintainer", 90_000, "Kernel"),
    ] {
        let res = srv
            .post(
                "/data/employees",
                &admin,
                json!({ "name": name, "position": position, "salary": salary, "department": department }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let viewer_role = srv.create_role(&admin, "Viewer").await;
    let res = srv
        .post(
            "/admin/permissions",
            &admin,
            json!({ "role_id": viewer_role, "resource": "employees", "action": "read" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    for field in ["name", "position", "department"] {
        let res = srv
            .post(
                "/admin/field-permissions",
                &admin,
                json!({ "role_id": viewer_role, "resource": "employees", "field": field, "can_view": true, "can_edit": false }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = srv
        .post(
            "/admin/users",
            &admin,
            json!({ "email": "viewer@example.com", "username": "viewer", "password": "pw", "role_id": viewer_role }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let viewer = srv.token("viewer", "pw").await;
    let res = srv.get("/data/employees", &viewer).await;
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 3);
    let expected: BTreeSet<&str> = ["id", "name", "position", "department"].into();
    for row in &rows {
        let keys: BTreeSet<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
    }
    assert_eq!(rows[0]["name"], "Ada");

    // Read-only role: writes are forbidden, other resources are invisible.
    let res = srv.post("/data/employees", &viewer, json!({ "name": "Eve" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.get("/data/projects", &viewer).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.get("/admin/roles", &viewer).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.get("/auth/permissions", &viewer).await;
    let perms: Vec<Value> = res.json().await.unwrap();
    assert_eq!(perms, vec![json!({ "role_id": viewer_role, "resource": "employees", "action": "read" })]);
}

#[tokio::test]
async fn create_reports_missing_required_fields() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.post("/data/employees", &admin, json!({ "position": "Intern" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["fields"], json!(["name"]));
}

#[tokio::test]
async fn unknown_and_meta_resources_are_not_found() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    for path in ["/data/payroll", "/data/users", "/data/roles"] {
        let res = srv.get(path, &admin).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn update_and_delete_missing_records_are_not_found() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv
        .client
        .put(srv.url("/data/orders/999"))
        .bearer_auth(&admin)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .delete(srv.url("/data/orders/999"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invitation_accept_then_login() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv
        .post("/admin/users", &admin, json!({ "email": "new@example.com", "role_id": 2 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let outcome: Value = res.json().await.unwrap();
    let accept = outcome["links"]["accept"].as_str().unwrap();
    assert!(accept.starts_with("http://app.test/set-password?token="));
    let token = token_param(accept);

    // Pending accounts cannot log in yet.
    let res = srv.login("new@example.com", "whatever").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/set-password"))
        .json(&json!({ "token": token, "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Password set successfully");

    let res = srv.login("new@example.com", "s3cret").await;
    assert_eq!(res.status(), StatusCode::OK);
    let session: Value = res.json().await.unwrap();
    assert_eq!(session["user"]["role_id"], 2);

    // The token is single use.
    let res = srv
        .client
        .post(srv.url("/auth/set-password"))
        .json(&json!({ "token": token, "password": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn declined_invitation_cannot_be_accepted() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv
        .post("/admin/users", &admin, json!({ "email": "no@example.com", "role_id": 2 }))
        .await;
    let outcome: Value = res.json().await.unwrap();
    let token = token_param(outcome["links"]["decline"].as_str().unwrap());

    let res = srv
        .client
        .post(srv.url("/auth/decline-invitation"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .post(srv.url("/auth/set-password"))
        .json(&json!({ "token": token, "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_in_use_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let role = srv.create_role(&admin, "Support").await;
    let res = srv
        .post("/admin/users", &admin, json!({ "email": "s@example.com", "role_id": role }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .delete(srv.url(&format!("/admin/roles/{role}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let roles: Vec<Value> = srv.get("/admin/roles", &admin).await.json().await.unwrap();
    assert!(roles.iter().any(|r| r["id"] == role));
}

#[tokio::test]
async fn revoke_keeps_other_columns() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let role = srv.create_role(&admin, "Clerk").await;

    for action in ["read", "create"] {
        let res = srv
            .post(
                "/admin/permissions",
                &admin,
                json!({ "role_id": role, "resource": "orders", "action": action }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = srv
        .client
        .delete(srv.url("/admin/permissions"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": role, "resource": "orders", "action": "read" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get(&format!("/admin/permissions?role_id={role}"), &admin).await;
    let perms: Vec<Value> = res.json().await.unwrap();
    assert_eq!(perms, vec![json!({ "role_id": role, "resource": "orders", "action": "create" })]);

    let res = srv
        .post(
            "/admin/permissions",
            &admin,
            json!({ "role_id": role, "resource": "orders", "action": "approve" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_management_is_guarded_before_the_body_is_read() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let role = srv.create_role(&admin, "Staff").await;
    let res = srv
        .post(
            "/admin/users",
            &admin,
            json!({ "email": "staff@example.com", "username": "staff", "password": "pw", "role_id": role }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let staff = srv.token("staff", "pw").await;
    let res = srv.post("/admin/users", &staff, json!({ "unexpected": true })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.post("/admin/users", &admin, json!({ "unexpected": true })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_cannot_null_a_required_field() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.post("/data/employees", &admin, json!({ "name": "Ann" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/data/employees/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "name": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("name"));

    let rows: Vec<Value> = srv.get("/data/employees", &admin).await.json().await.unwrap();
    assert_eq!(rows[0]["name"], "Ann");
}
