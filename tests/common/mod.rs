#![allow(dead_code)]

use langconnect_cli::config::DEFAULT_TIMEOUT;
use langconnect_cli::{ApiClient, Credential, Settings};
use mockito::{Mock, ServerGuard};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";

pub fn password_client(server: &ServerGuard) -> ApiClient {
    let credential = Credential::Password {
        email: "admin@example.com".into(),
        password: "secret".into(),
    };
    ApiClient::new(&Settings::new(&server.url(), Some(credential)).unwrap()).unwrap()
}

pub fn key_client(server: &ServerGuard) -> ApiClient {
    key_client_with_timeout(server, DEFAULT_TIMEOUT)
}

pub fn key_client_with_timeout(server: &ServerGuard, timeout: Duration) -> ApiClient {
    let credential = Credential::ApiKey("key-1".into());
    let settings = Settings::new(&server.url(), Some(credential))
        .unwrap()
        .with_timeout(timeout);
    ApiClient::new(&settings).unwrap()
}

/// Response body that stalls for `delay` before sending `body`, so a
/// client with a shorter timeout fails at the transport level.
pub fn stalled_body(
    delay: Duration,
    body: &'static str,
) -> impl Fn(&mut dyn Write) -> std::io::Result<()> + Send + Sync + 'static {
    move |w| {
        thread::sleep(delay);
        w.write_all(body.as_bytes())
    }
}

pub fn anonymous_client(server: &ServerGuard) -> ApiClient {
    ApiClient::new(&Settings::new(&server.url(), None).unwrap()).unwrap()
}

/// `/auth/signin` answering with `ACCESS_TOKEN` / `REFRESH_TOKEN`.
/// Not yet registered: call `.create()`.
pub fn mock_signin(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/auth/signin")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "email": "admin@example.com",
            "password": "secret"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"access_token":"{ACCESS_TOKEN}","refresh_token":"{REFRESH_TOKEN}","token_type":"bearer"}}"#
        ))
}

/// Write `count` split documents into `dir` and return their paths.
pub fn write_documents(dir: &Path, count: usize) -> Vec<PathBuf> {
    fs::create_dir_all(dir).unwrap();
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("document_{i:05}.txt"));
            fs::write(&path, format!("code,description\nA{i:02},row {i}\n")).unwrap();
            path
        })
        .collect()
}
