// Session state held by the client: where to talk to, who we are, and the
// tokens obtained so far. Lives for one process; never written to disk.

use crate::config::{Credential, Settings};
use crate::models::TokenResponse;
use std::fmt;

pub struct Session {
    base_url: String,
    credential: Option<Credential>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Session {
            base_url: settings.base_url.clone(),
            credential: settings.credential.clone(),
            access_token: None,
            refresh_token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Join `endpoint` onto the base URL. An empty endpoint is the base URL.
    pub fn url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Value for the `Authorization` header, if we have anything to send.
    pub fn auth_header(&self) -> Option<String> {
        match (&self.credential, &self.access_token) {
            (Some(Credential::ApiKey(key)), _) => Some(format!("Bearer {key}")),
            (_, Some(token)) => Some(format!("Bearer {token}")),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_header().is_some()
    }

    /// Adopt a freshly issued token pair. A missing refresh token in the
    /// response keeps the previous one.
    pub fn store_tokens(&mut self, tokens: &TokenResponse) {
        self.access_token = Some(tokens.access_token.clone());
        if let Some(refresh) = &tokens.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
    }

    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(credential: Option<Credential>) -> Session {
        Session::new(&Settings::new("http://api.local/", credential).unwrap())
    }

    fn tokens(access: &str, refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access.into(),
            refresh_token: refresh.map(str::to_string),
            extra: Default::default(),
        }
    }

    #[test]
    fn url_joins_endpoints() {
        let s = session(None);
        assert_eq!(s.url("collections"), "http://api.local/collections");
        assert_eq!(s.url("/auth/me"), "http://api.local/auth/me");
        assert_eq!(s.url(""), "http://api.local");
    }

    #[test]
    fn api_key_is_always_authenticated() {
        let s = session(Some(Credential::ApiKey("k".into())));
        assert!(s.is_authenticated());
        assert_eq!(s.auth_header().as_deref(), Some("Bearer k"));
    }

    #[test]
    fn password_session_needs_tokens() {
        let mut s = session(Some(Credential::Password {
            email: "a@b.c".into(),
            password: "pw".into(),
        }));
        assert!(!s.is_authenticated());

        s.store_tokens(&tokens("t1", Some("r1")));
        assert_eq!(s.auth_header().as_deref(), Some("Bearer t1"));
        assert_eq!(s.refresh_token(), Some("r1"));

        s.store_tokens(&tokens("t2", None));
        assert_eq!(s.access_token(), Some("t2"));
        assert_eq!(s.refresh_token(), Some("r1"));

        s.clear_tokens();
        assert!(!s.is_authenticated());
        assert!(s.refresh_token().is_none());
    }

    #[test]
    fn debug_hides_tokens() {
        let mut s = session(None);
        s.store_tokens(&tokens("secret-access", Some("secret-refresh")));
        let shown = format!("{s:?}");
        assert!(!shown.contains("secret-access"));
        assert!(!shown.contains("secret-refresh"));
    }
}
