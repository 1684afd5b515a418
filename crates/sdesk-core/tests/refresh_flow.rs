use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use sdesk_core::api::{auth, companies, projects};
use sdesk_core::models::{CompanyQuery, ProjectQuery, TicketQuery};
use sdesk_core::views::{Route, initial_route};
use sdesk_core::{ApiClient, ApiError, AuthContext, Principal, Role, Session, SessionStore};
use serde_json::{Value, json};
use tempfile::tempdir;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, home: &Path) -> ApiClient {
    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let session = Session::open(SessionStore::in_home(home)).unwrap();
    ApiClient::new(base, Duration::from_secs(5), session).unwrap()
}

fn stored_principal(token: &str) -> Principal {
    Principal {
        id: 1,
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        role: Role::ClientAdmin,
        company_id: Some(7),
        agent_id: None,
        access_token: token.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        issued_at: Utc::now(),
    }
}

fn auth_body(token: &str) -> Value {
    json!({
        "success": true,
        "message": "ok",
        "data": {
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "user": {"id": 1, "name": "Ana", "email": "ana@example.com", "role": "client_admin", "company_id": 7}
        }
    })
}

fn company_body() -> Value {
    json!({
        "success": true,
        "message": "",
        "data": {"id": 7, "name": "Acme", "email": "contato@acme.com", "cnpj": "11.222.333/0001-81", "is_active": true}
    })
}

/// Login persists the principal and later requests carry `Bearer t1`.
#[tokio::test]
async fn test_login_persists_token_and_sets_header() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ana@example.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("t1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthContext::new(client(&server, home.path()));
    let principal = auth.login("ana@example.com", "secret").await.unwrap();
    assert_eq!(principal.access_token, "t1");
    assert_eq!(principal.role, Role::ClientAdmin);
    assert!(!auth.is_loading());
    assert!(auth.error().is_none());

    let stored = SessionStore::in_home(home.path()).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "t1");

    let company = companies::get(auth.client(), 7).await.unwrap();
    assert_eq!(company.name, "Acme");
}

/// A stored principal is hydrated before the first request goes out.
#[tokio::test]
async fn test_hydrated_session_sends_header() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("persisted"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer persisted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    assert_eq!(
        initial_route(client.session().current().as_ref()),
        Route::Dashboard
    );
    companies::get(&client, 7).await.unwrap();
}

/// One 401 -> exactly one refresh and one replay with the new token.
#[tokio::test]
async fn test_401_refreshes_once_and_replays() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("old"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("new")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let company = companies::get(&client, 7).await.unwrap();
    assert_eq!(company.id, 7);

    assert_eq!(client.session().authorization().as_deref(), Some("Bearer new"));
    let stored = SessionStore::in_home(home.path()).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "new");
}

/// A 401 on the replay is final: no second refresh.
#[tokio::test]
async fn test_second_401_is_final() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("old"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/projects/3"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("new")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let err = projects::get(&client, 3).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }), "{err:?}");
    // The refreshed session stays; only a failed refresh ends it.
    assert!(client.session().is_authenticated());
}

/// A 401 from login never triggers a refresh.
#[tokio::test]
async fn test_login_401_does_not_refresh() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Credenciais inválidas"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("new")))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthContext::new(client(&server, home.path()));
    let err = auth.login("ana@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(auth.error().as_deref(), Some("Credenciais inválidas"));
    assert!(!auth.is_loading());
}

/// A 401 from refresh itself is returned as-is, not refreshed again.
#[tokio::test]
async fn test_refresh_401_does_not_loop() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("old"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let err = auth::refresh(&client).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
}

/// Refresh failure tears the session down and reports an expired session,
/// distinct from a network error.
#[tokio::test]
async fn test_failed_refresh_ends_session() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("old"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/companies"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let query = CompanyQuery {
        page: 1,
        per_page: 15,
        ..Default::default()
    };
    let err = companies::list(&client, &query).await.unwrap_err();
    assert!(err.is_session_expired(), "{err:?}");
    assert!(!client.session().is_authenticated());
    assert!(!home.path().join("session.json").exists());

    let reopened = Session::open(SessionStore::in_home(home.path())).unwrap();
    assert_eq!(initial_route(reopened.current().as_ref()), Route::Login);
}

/// A caller abandoning its request mid-refresh must not lose the rotated
/// token: the refresh finishes on its own and the next request uses it.
#[tokio::test]
async fn test_cancelled_request_keeps_rotated_token() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("t1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/companies/7"))
        .and(header("Authorization", "Bearer t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(company_body()))
        .expect(1)
        .mount(&server)
        .await;
    // The backend rotates once; t1 is dead afterwards.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_body("t2"))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), companies::get(&client, 7)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.session().authorization().as_deref(), Some("Bearer t2"));
    let stored = SessionStore::in_home(home.path()).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "t2");

    let company = companies::get(&client, 7).await.unwrap();
    assert_eq!(company.name, "Acme");
    assert!(client.session().is_authenticated());
}

/// Blank credentials never reach the backend.
#[tokio::test]
async fn test_blank_credentials_are_rejected_locally() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("t1")))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthContext::new(client(&server, home.path()));
    for (email, password) in [("", "x"), ("x@x.com", ""), ("   ", "x")] {
        let err = auth.login(email, password).await.unwrap_err();
        assert_eq!(err.to_string(), "Informe e-mail e senha para continuar.");
    }
    assert_eq!(
        auth.error().as_deref(),
        Some("Informe e-mail e senha para continuar.")
    );
}

/// A failed login leaves the previous session untouched and falls back to
/// the generic message when the backend sends none.
#[tokio::test]
async fn test_failed_login_keeps_previous_session() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("keep"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let auth = AuthContext::new(client(&server, home.path()));
    auth.login("outra@example.com", "x").await.unwrap_err();

    assert_eq!(auth.error().as_deref(), Some("Erro ao autenticar"));
    assert_eq!(auth.principal().unwrap().access_token, "keep");
    let stored = SessionStore::in_home(home.path()).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "keep");
}

/// Remote logout is best effort; the local session ends regardless.
#[tokio::test]
async fn test_remote_logout_ignores_backend_failure() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("t1"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthContext::new(client(&server, home.path()));
    auth.logout_remote().await.unwrap();

    assert!(auth.principal().is_none());
    assert!(SessionStore::in_home(home.path()).load().unwrap().is_none());
}

#[tokio::test]
async fn test_project_listing_with_statistics_and_bare_ticket_page() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("t1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(query_param("company_id", "7"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "projects": {
                    "data": [{"id": 3, "company_id": 7, "name": "Portal", "description": "Web", "hourly_rate": "150.00", "is_active": true}],
                    "current_page": 1, "per_page": 10, "total": 1, "last_page": 1
                },
                "statistics": {"total_projects": 1, "active_projects": 1, "inactive_projects": 0, "total_tickets": 4, "avg_hourly_rate": "150.00"}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/3/tickets"))
        .and(query_param("status", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 9, "project_id": 3, "title": "Erro", "status": "open", "priority": "high"}],
            "current_page": 1, "per_page": 10, "total": 1, "last_page": 1
        })))
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let listing = projects::list(
        &client,
        &ProjectQuery {
            page: 1,
            per_page: 10,
            company_id: Some(7),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(listing.projects.data[0].name, "Portal");
    assert_eq!(listing.statistics.total_tickets, 4);

    let tickets = projects::tickets(
        &client,
        3,
        &TicketQuery {
            page: 1,
            per_page: 10,
            status: Some("open".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(tickets.data[0].status_label(), "Aberto");
}

#[tokio::test]
async fn test_validation_errors_surface_fields() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    SessionStore::in_home(home.path())
        .save(&stored_principal("t1"))
        .unwrap();

    Mock::given(method("PATCH"))
        .and(path("/api/projects/3/toggle-active"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Dados inválidos",
            "errors": {"is_active": ["Projeto possui tickets abertos"]}
        })))
        .mount(&server)
        .await;

    let client = client(&server, home.path());
    let err = projects::toggle_active(&client, 3).await.unwrap_err();
    assert_eq!(
        err.field_errors().unwrap()["is_active"],
        "Projeto possui tickets abertos"
    );
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/companies/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(company_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let session = Session::open(SessionStore::in_home(home.path())).unwrap();
    let client = ApiClient::new(base, Duration::from_millis(50), session).unwrap();

    let err = companies::get(&client, 1).await.unwrap_err();
    assert!(
        matches!(err, ApiError::Network { timeout: true, .. }),
        "{err:?}"
    );
    assert!(!err.is_session_expired());
}
