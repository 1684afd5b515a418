//! Session and backend fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use chrono::Utc;
use serde_json::{Value, json};
use wiremock::MockServer;

/// `sdesk` pointed at `home` and, when given, at the mock backend.
pub fn sdesk(home: &Path, server: Option<&MockServer>) -> Command {
    let mut cmd = cargo_bin_cmd!("sdesk");
    cmd.env("SDESK_HOME", home)
        .env_remove("SDESK_LOG")
        .env_remove("SDESK_PASSWORD");
    match server {
        Some(server) => cmd.env("SDESK_API_BASE_URL", format!("{}/api", server.uri())),
        None => cmd.env("SDESK_API_BASE_URL", "http://127.0.0.1:9/api"),
    };
    cmd
}

/// Writes a stored session for `role` into `home`.
pub fn write_session(home: &Path, role: &str, company_id: Option<u64>) {
    let session = json!({
        "id": 1,
        "name": "Ana",
        "email": "ana@example.com",
        "role": role,
        "company_id": company_id,
        "access_token": "t1",
        "token_type": "Bearer",
        "expires_in": 3600,
        "issued_at": Utc::now().to_rfc3339(),
    });
    fs::write(
        home.join("session.json"),
        serde_json::to_string_pretty(&session).unwrap(),
    )
    .unwrap();
}

pub fn auth_body(token: &str, role: &str) -> Value {
    json!({
        "success": true,
        "message": "Login realizado com sucesso",
        "data": {
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "user": {"id": 1, "name": "Ana", "email": "ana@example.com", "role": role, "company_id": 7}
        }
    })
}

pub fn enveloped(data: Value) -> Value {
    json!({"success": true, "message": "", "data": data})
}
