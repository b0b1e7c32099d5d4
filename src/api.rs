// API client module: a blocking HTTP client that talks to the LangConnect
// API. It owns the session (tokens) and makes authentication an explicit
// precondition of every authorized request.

use crate::config::{Credential, Settings};
use crate::error::{ClientError, Result};
use crate::models::{SignInRequest, TokenResponse};
use crate::session::Session;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info};

/// Body attached to a request.
pub enum Payload {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(multipart::Form),
}

/// Normalized result of a completed HTTP exchange. Non-2xx statuses are
/// not errors; they are logged and surfaced as `Failure`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx. `None` when the body was empty (e.g. 204).
    Success(Option<Value>),
    Failure { status: StatusCode, body: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The payload of a successful call; `None` for failures and empty bodies.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure { .. } => None,
        }
    }

    /// Printable form: the payload, or an error record for failures.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Outcome::Success(value) => value.clone(),
            Outcome::Failure { status, body } => Some(json!({
                "error": body,
                "status": status.as_u16(),
            })),
        }
    }

    fn from_response(method: &Method, endpoint: &str, response: Response) -> Result<Self> {
        let status = response.status();
        let text = response.text()?;
        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Outcome::Success(None));
            }
            let value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "message": text }));
            return Ok(Outcome::Success(Some(value)));
        }
        error!("{} {} failed: {} - {}", method, endpoint, status.as_u16(), text);
        Ok(Outcome::Failure { status, body: text })
    }
}

/// Blocking client for the LangConnect API. Holds the reqwest client and
/// the session; every authorized call goes through `request`.
pub struct ApiClient {
    http: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(ApiClient {
            http,
            session: Session::new(settings),
        })
    }

    /// Create a client from `LANGCONNECT_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self> {
        Self::new(&Settings::from_env()?)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Establish a credential. An API key is always valid; email/password
    /// is exchanged for a token pair. Returns `false` when the server
    /// rejects the credentials.
    pub fn authenticate(&mut self) -> Result<bool> {
        let (email, password) = match self.session.credential() {
            Some(Credential::ApiKey(_)) => return Ok(true),
            Some(Credential::Password { email, password }) => (email.clone(), password.clone()),
            None => {
                return Err(ClientError::Authentication(
                    "no API key or admin email/password configured".into(),
                ))
            }
        };

        let body = SignInRequest {
            email: &email,
            password: &password,
        };
        let response = self.http.post(self.session.url("auth/signin")).json(&body).send()?;
        match self.accept_tokens(response, "sign in")? {
            Some(_) => {
                info!("signed in as {}", email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make sure an `Authorization` header is available, signing in at most
    /// once. Calling this with a valid header performs no request.
    pub fn ensure_authenticated(&mut self) -> Result<()> {
        if self.session.is_authenticated() {
            return Ok(());
        }
        if self.authenticate()? {
            Ok(())
        } else {
            Err(ClientError::Authentication(
                "Authentication with LangConnect failed.".into(),
            ))
        }
    }

    /// Exchange the held refresh token for a new token pair.
    pub fn refresh(&mut self) -> Result<bool> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| {
                ClientError::Authentication("no refresh token available to refresh access token".into())
            })?
            .to_string();

        // The API expects the refresh token as a query parameter.
        let response = self
            .http
            .post(self.session.url("auth/refresh"))
            .query(&[("refresh_token", refresh_token.as_str())])
            .send()?;
        Ok(self.accept_tokens(response, "refresh token")?.is_some())
    }

    /// Register a new user; on success the new user's tokens become the
    /// session's tokens.
    pub fn signup(&mut self, email: &str, password: &str) -> Result<Option<TokenResponse>> {
        let body = SignInRequest { email, password };
        let response = self.http.post(self.session.url("auth/signup")).json(&body).send()?;
        self.accept_tokens(response, "sign up")
    }

    pub fn signout(&mut self) -> Result<bool> {
        self.ensure_authenticated()?;
        let response = self.authorized(Method::POST, "auth/signout").send()?;
        match Outcome::from_response(&Method::POST, "auth/signout", response)? {
            Outcome::Success(_) => {
                self.session.clear_tokens();
                Ok(true)
            }
            Outcome::Failure { .. } => Ok(false),
        }
    }

    /// Perform an authorized request against `endpoint` (relative to the
    /// base URL).
    pub fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        payload: Payload,
    ) -> Result<Outcome> {
        self.ensure_authenticated()?;

        let mut req = self.authorized(method.clone(), endpoint);
        if !params.is_empty() {
            req = req.query(params);
        }
        req = match payload {
            Payload::Empty => req,
            Payload::Json(body) => req.json(&body),
            Payload::Form(fields) => req.form(&fields),
            Payload::Multipart(form) => req.multipart(form),
        };

        debug!("{} {}", method, endpoint);
        let response = req.send().map_err(|e| {
            error!("{} {} could not be sent: {}", method, endpoint, e);
            ClientError::from(e)
        })?;
        Outcome::from_response(&method, endpoint, response)
    }

    pub fn get(&mut self, endpoint: &str, params: &[(String, String)]) -> Result<Outcome> {
        self.request(Method::GET, endpoint, params, Payload::Empty)
    }

    pub fn post(&mut self, endpoint: &str, payload: Payload) -> Result<Outcome> {
        self.request(Method::POST, endpoint, &[], payload)
    }

    pub fn patch(&mut self, endpoint: &str, body: Value) -> Result<Outcome> {
        self.request(Method::PATCH, endpoint, &[], Payload::Json(body))
    }

    pub fn delete(
        &mut self,
        endpoint: &str,
        params: &[(String, String)],
        payload: Payload,
    ) -> Result<Outcome> {
        self.request(Method::DELETE, endpoint, params, payload)
    }

    /// `GET /health`. Needs no credentials.
    pub fn health_check(&self) -> Result<Outcome> {
        let response = self.http.get(self.session.url("health")).send()?;
        Outcome::from_response(&Method::GET, "health", response)
    }

    fn authorized(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let req = self.http.request(method, self.session.url(endpoint));
        match self.session.auth_header() {
            Some(header) => req.header(AUTHORIZATION, header),
            None => req,
        }
    }

    /// Store the token pair from a 200 response. Anything else is logged
    /// and yields `None`.
    fn accept_tokens(&mut self, response: Response, action: &str) -> Result<Option<TokenResponse>> {
        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().unwrap_or_default();
            error!("Failed to {}: {} - {}", action, status.as_u16(), text);
            return Ok(None);
        }
        let tokens: TokenResponse = serde_json::from_str(&response.text()?)?;
        self.session.store_tokens(&tokens);
        Ok(Some(tokens))
    }
}
