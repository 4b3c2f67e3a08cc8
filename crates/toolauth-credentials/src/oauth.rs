//! OAuth 2.0 issuer over HTTP.
//!
//! Implements the refresh exchange and the Authorization Code flow with PKCE
//! (Proof Key for Code Exchange), using a loopback redirect for desktop use.
//!
//! # Consent flow
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a loopback listener (ephemeral port by default)
//! 3. Open the user's browser at the authorization endpoint
//! 4. Wait, bounded by the consent timeout, for the redirect carrying the code
//! 5. Check the state and exchange the code (with verifier) for tokens

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::client_secret::ClientSecret;
use crate::error::{CredentialError, CredentialResult};
use crate::issuer::{BoxFuture, TokenGrant, TokenIssuer};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Path the loopback listener expects the redirect on.
const CALLBACK_PATH: &str = "/callback";

/// How long one loopback connection may stay silent before it is dropped.
///
/// Browsers open speculative connections that never send a request; those
/// must not hold up the one carrying the redirect.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for [`OAuthIssuer`].
#[derive(Debug, Clone)]
pub struct IssuerOptions {
    /// Timeout for each token endpoint request.
    pub http_timeout: Duration,
    /// User agent sent to the issuer.
    pub user_agent: String,
    /// Ports to try for the loopback listener. `(0, 0)` binds an ephemeral port.
    pub loopback_port_range: (u16, u16),
    /// How long to wait for the user to finish consent. `None` waits forever.
    pub consent_timeout: Option<Duration>,
    /// Whether to launch the browser. The URL is printed either way when
    /// launching is off or fails.
    pub open_browser: bool,
}

impl IssuerOptions {
    /// Default token endpoint timeout in seconds.
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    /// Default consent timeout in seconds.
    pub const DEFAULT_CONSENT_TIMEOUT_SECS: u64 = 120;

    /// Sets the consent timeout.
    pub fn with_consent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Sets the loopback port range.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the token endpoint timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Enables or disables launching the browser.
    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<(), String> {
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }
        if self.consent_timeout.is_some_and(|t| t.is_zero()) {
            return Err("consent timeout must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for IssuerOptions {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(Self::DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: format!("toolauth/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (0, 0),
            consent_timeout: Some(Duration::from_secs(Self::DEFAULT_CONSENT_TIMEOUT_SECS)),
            open_browser: true,
        }
    }
}

/// Token issuer speaking OAuth 2.0 over HTTP.
#[derive(Debug)]
pub struct OAuthIssuer {
    options: IssuerOptions,
    http_client: reqwest::Client,
}

impl OAuthIssuer {
    /// Creates a new issuer client.
    pub fn new(options: IssuerOptions) -> CredentialResult<Self> {
        options.validate().map_err(CredentialError::configuration)?;

        let http_client = reqwest::Client::builder()
            .timeout(options.http_timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| {
                CredentialError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            options,
            http_client,
        })
    }

    /// Returns the issuer options.
    pub fn options(&self) -> &IssuerOptions {
        &self.options
    }

    /// Refreshes an access token.
    pub async fn refresh_token(
        &self,
        secret: &ClientSecret,
        refresh_token: &str,
    ) -> CredentialResult<TokenGrant> {
        let params = [
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let grant = self.post_token_form(&secret.token_uri, &params).await?;
        info!("successfully refreshed access token");
        Ok(grant)
    }

    /// Runs the PKCE consent flow and returns the issued tokens.
    pub async fn authorize(
        &self,
        secret: &ClientSecret,
        scopes: &[String],
    ) -> CredentialResult<TokenGrant> {
        self.authorize_with(secret, scopes, PkceFlow::new()).await
    }

    async fn authorize_with(
        &self,
        secret: &ClientSecret,
        scopes: &[String],
        pkce: PkceFlow,
    ) -> CredentialResult<TokenGrant> {
        let (listener, port) = bind_loopback_server(self.options.loopback_port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url =
            pkce.build_auth_url(&secret.auth_uri, &secret.client_id, &redirect_uri, scopes)?;

        info!("starting OAuth consent flow");
        debug!("authorization URL: {}", auth_url);

        let opened = self.options.open_browser
            && match open::that(&auth_url) {
                Ok(()) => true,
                Err(e) => {
                    warn!("failed to open browser: {}", e);
                    false
                }
            };
        if !opened {
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) =
            wait_for_callback(listener, self.options.consent_timeout).await?;

        if received_state != pkce.state {
            return Err(CredentialError::consent_failed(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(secret, &code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Exchanges an authorization code for tokens.
    pub(crate) async fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> CredentialResult<TokenGrant> {
        let params = [
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let grant = self.post_token_form(&secret.token_uri, &params).await?;
        if grant.refresh_token.is_none() {
            warn!("issuer did not return a refresh token; consent will be needed again on expiry");
        }
        info!("successfully obtained tokens");
        Ok(grant)
    }

    /// Posts a form to the token endpoint and parses the grant.
    async fn post_token_form(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> CredentialResult<TokenGrant> {
        let response = self
            .http_client
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "token request timed out".to_string()
                } else {
                    format!("token request failed: {}", e)
                };
                CredentialError::network(message).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => err.to_string(),
                Err(_) => body,
            };
            return Err(CredentialError::authentication(format!(
                "token endpoint rejected the request ({}): {}",
                status, detail
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            CredentialError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

impl TokenIssuer for OAuthIssuer {
    fn refresh<'a>(
        &'a self,
        secret: &'a ClientSecret,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, CredentialResult<TokenGrant>> {
        Box::pin(async move { self.refresh_token(secret, refresh_token).await })
    }

    fn consent<'a>(
        &'a self,
        secret: &'a ClientSecret,
        scopes: &'a [String],
    ) -> BoxFuture<'a, CredentialResult<TokenGrant>> {
        Box::pin(async move { self.authorize(secret, scopes).await })
    }
}

/// Error body returned by the token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.error_description {
            Some(ref description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Binds a loopback listener on the first free port in the range.
fn bind_loopback_server(port_range: (u16, u16)) -> CredentialResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) else {
            continue;
        };
        let bound = listener
            .local_addr()
            .map_err(|e| {
                CredentialError::consent_failed(format!("failed to read listener address: {}", e))
            })?
            .port();
        debug!("bound loopback server on port {}", bound);
        return Ok((listener, bound));
    }
    Err(CredentialError::consent_failed(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Waits for the redirect and returns `(code, state)`.
///
/// Accepting runs on a dedicated thread because `TcpListener::accept` blocks.
/// When the wait times out or is cancelled the thread stays parked in
/// `accept` until the process exits.
async fn wait_for_callback(
    listener: TcpListener,
    timeout: Option<Duration>,
) -> CredentialResult<(String, String)> {
    listener
        .set_nonblocking(false)
        .map_err(|e| CredentialError::internal(format!("failed to set blocking: {}", e)))?;

    let (tx, rx) = oneshot::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    });

    let received = match timeout {
        Some(limit) => tokio::time::timeout(limit, rx).await.map_err(|_| {
            CredentialError::consent_failed(format!(
                "timed out after {}s waiting for authorization",
                limit.as_secs()
            ))
        })?,
        None => rx.await,
    };

    received.map_err(|_| CredentialError::internal("callback channel disconnected"))?
}

/// Handles an incoming HTTP request on the callback listener.
///
/// Returns `None` for requests that are not the redirect (e.g. favicon).
fn handle_callback(mut stream: TcpStream) -> Option<CredentialResult<(String, String)>> {
    if let Err(e) = stream.set_read_timeout(Some(CALLBACK_READ_TIMEOUT)) {
        warn!("failed to set callback read timeout: {}", e);
        return None;
    }

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();

    if let Err(e) = reader.read_line(&mut request_line) {
        debug!("dropping callback connection: {}", e);
        return None;
    }

    // GET /callback?code=...&state=... HTTP/1.1
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "GET" {
        return None;
    }

    let path = parts[1];
    if !path.starts_with(CALLBACK_PATH) {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return None;
    }

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    let response = if error.is_some() || code.is_none() {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    } else {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    if let Some(error) = error {
        return Some(Err(CredentialError::consent_failed(format!(
            "authorization denied: {}",
            error
        ))));
    }

    match (code, state) {
        (Some(c), Some(s)) => Some(Ok((c, s))),
        (Some(c), None) => Some(Ok((c, String::new()))),
        _ => Some(Err(CredentialError::consent_failed(
            "missing authorization code in callback",
        ))),
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the authorization URL for the given endpoint.
    pub fn build_auth_url(
        &self,
        auth_uri: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> CredentialResult<String> {
        let mut url = url::Url::parse(auth_uri).map_err(|e| {
            CredentialError::configuration(format!("invalid authorization endpoint: {}", e))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("code_challenge", &self.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &self.state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.into())
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}
