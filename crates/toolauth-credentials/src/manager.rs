//! Credential acquisition: load, refresh or consent, then persist.
//!
//! [`CredentialManager::obtain`] evaluates the stored credential afresh on
//! every call:
//!
//! 1. A stored credential that covers the requested scopes and has not
//!    expired is returned unchanged, without touching the network.
//! 2. An expired one with a refresh token is refreshed once; on success the
//!    store is overwritten, on failure it is left as it was.
//! 3. Anything else (no store, scope mismatch, no refresh token) needs
//!    interactive consent, which requires the client secret and is only run
//!    under [`ConsentPolicy::Interactive`].
//!
//! A request marked [`ObtainRequest::with_reauthorize`] skips straight to
//! step 3. The stored credential stays in place until consent succeeds.
//!
//! Nothing is retried.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client_secret::{ClientSecret, ClientSecretSource};
use crate::credential::{Credential, CredentialState};
use crate::error::{CredentialError, CredentialErrorCode, CredentialResult};
use crate::issuer::TokenIssuer;
use crate::oauth::{IssuerOptions, OAuthIssuer};
use crate::store::CredentialStore;
use crate::transport::{BearerTransport, TransportOptions};

/// Whether `obtain` may fall back to interactive consent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsentPolicy {
    /// Open a browser and wait for the user to authorize.
    Interactive,
    /// Fail with `ConsentRequired` and tell the operator what to run.
    #[default]
    Deny,
}

/// Everything `obtain` needs to know about one credential.
#[derive(Debug, Clone)]
pub struct ObtainRequest {
    /// Service label used in messages (e.g., "calendar").
    pub service: String,
    /// Scopes the caller needs.
    pub scopes: Vec<String>,
    /// Where the credential lives.
    pub store: CredentialStore,
    /// Where the client identity comes from.
    pub client_secret: ClientSecretSource,
    /// Whether consent may be run interactively.
    pub consent: ConsentPolicy,
    /// Ignore the stored credential and go straight to consent.
    pub reauthorize: bool,
}

impl ObtainRequest {
    /// Creates a request with no client secret and consent denied.
    pub fn new(service: impl Into<String>, scopes: Vec<String>, store: CredentialStore) -> Self {
        Self {
            service: service.into(),
            scopes,
            store,
            client_secret: ClientSecretSource::Missing,
            consent: ConsentPolicy::Deny,
            reauthorize: false,
        }
    }

    /// Sets the client secret source.
    pub fn with_client_secret(mut self, source: ClientSecretSource) -> Self {
        self.client_secret = source;
        self
    }

    /// Sets the consent policy.
    pub fn with_consent_policy(mut self, policy: ConsentPolicy) -> Self {
        self.consent = policy;
        self
    }

    /// Forces consent even when a usable credential is stored.
    pub fn with_reauthorize(mut self, reauthorize: bool) -> Self {
        self.reauthorize = reauthorize;
        self
    }

    /// Describes the stored credential without any network access.
    pub fn status(&self) -> CredentialStatus {
        match self.store.load() {
            Ok(None) => CredentialStatus::NotAuthenticated,
            Err(e) => CredentialStatus::Unreadable(e.message().to_string()),
            Ok(Some(credential)) => {
                let missing: Vec<String> = self
                    .scopes
                    .iter()
                    .filter(|scope| !credential.scopes.contains(*scope))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    CredentialStatus::Stored {
                        state: credential.state(),
                        expiry: credential.expiry,
                    }
                } else {
                    CredentialStatus::ScopeMismatch { missing }
                }
            }
        }
    }

    fn reauth_hint(&self) -> String {
        format!("run `toolauth auth {} --force` to re-authorize", self.service)
    }
}

/// What is currently stored for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// No credential file.
    NotAuthenticated,
    /// The credential file exists but cannot be used.
    Unreadable(String),
    /// The stored credential lacks some requested scopes.
    ScopeMismatch {
        /// Requested scopes not granted to the stored credential.
        missing: Vec<String>,
    },
    /// A credential covering the requested scopes.
    Stored {
        /// Its validity right now.
        state: CredentialState,
        /// When its access token expires.
        expiry: Option<DateTime<Utc>>,
    },
}

impl CredentialStatus {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not authenticated",
            Self::Unreadable(_) => "unreadable",
            Self::ScopeMismatch { .. } => "scope mismatch",
            Self::Stored { state, .. } => state.as_str(),
        }
    }

    /// Returns true if `obtain` would succeed without consent.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            Self::Stored {
                state: CredentialState::Valid | CredentialState::Refreshable,
                ..
            }
        )
    }
}

/// Produces valid credentials and keeps the store current.
pub struct CredentialManager {
    issuer: Box<dyn TokenIssuer>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager").finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Creates a manager backed by the given issuer.
    pub fn new(issuer: impl TokenIssuer + 'static) -> Self {
        Self {
            issuer: Box::new(issuer),
        }
    }

    /// Creates a manager talking OAuth 2.0 over HTTP.
    pub fn with_options(options: IssuerOptions) -> CredentialResult<Self> {
        Ok(Self::new(OAuthIssuer::new(options)?))
    }

    /// Returns a currently valid credential for the request.
    ///
    /// Errors are tagged with the request's service name.
    pub async fn obtain(&self, request: &ObtainRequest) -> CredentialResult<Credential> {
        self.obtain_inner(request)
            .await
            .map_err(|e| e.with_service(&request.service))
    }

    /// Obtains a credential and wraps it in a bearer transport.
    pub async fn transport(
        &self,
        request: &ObtainRequest,
        options: TransportOptions,
    ) -> CredentialResult<BearerTransport> {
        let credential = self.obtain(request).await?;
        BearerTransport::new(credential, options).map_err(|e| e.with_service(&request.service))
    }

    async fn obtain_inner(&self, request: &ObtainRequest) -> CredentialResult<Credential> {
        if request.reauthorize {
            debug!("re-authorization requested for {}", request.service);
            return self.consent(request).await;
        }

        let stored = match request.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("ignoring stored credential: {}", e);
                None
            }
        };

        if let Some(credential) = stored {
            if !credential.has_scopes(&request.scopes) {
                info!(
                    "stored {} credential was issued for different scopes, consent required",
                    request.service
                );
            } else {
                match credential.state() {
                    CredentialState::Valid => {
                        debug!("stored {} credential is valid", request.service);
                        return Ok(credential);
                    }
                    CredentialState::Refreshable => {
                        return self.refresh(request, credential).await;
                    }
                    CredentialState::Unusable => {
                        info!(
                            "stored {} credential expired without a refresh token",
                            request.service
                        );
                    }
                }
            }
        }

        self.consent(request).await
    }

    async fn refresh(
        &self,
        request: &ObtainRequest,
        mut credential: Credential,
    ) -> CredentialResult<Credential> {
        let secret = self.refresh_identity(request, &credential)?;
        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(CredentialError::internal("refreshable credential has no refresh token"));
        };

        debug!("refreshing expired {} access token", request.service);
        let grant = self
            .issuer
            .refresh(&secret, &refresh_token)
            .await
            .map_err(|e| {
                CredentialError::refresh_failed(format!(
                    "token refresh failed: {}; {}",
                    e.message(),
                    request.reauth_hint()
                ))
                .with_source(e)
            })?;

        credential.apply_refresh(grant, Utc::now())?;
        request.store.save(&credential)?;
        info!("refreshed {} credential", request.service);
        Ok(credential)
    }

    /// Picks the identity for a refresh: the configured client secret, or
    /// the one recorded in the credential when none is configured.
    fn refresh_identity(
        &self,
        request: &ObtainRequest,
        credential: &Credential,
    ) -> CredentialResult<ClientSecret> {
        match request.client_secret.resolve() {
            Ok(secret) => Ok(secret),
            Err(e) if e.code() == CredentialErrorCode::MissingClientSecret => {
                match credential.issuer_identity() {
                    Some(identity) => {
                        debug!("using client identity recorded in the credential");
                        Ok(identity)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn consent(&self, request: &ObtainRequest) -> CredentialResult<Credential> {
        let secret = request.client_secret.resolve()?;

        if request.consent == ConsentPolicy::Deny {
            return Err(CredentialError::consent_required(format!(
                "no usable credential at {}; run `toolauth auth {}` first",
                request.store.path().display(),
                request.service
            )));
        }

        let grant = self
            .issuer
            .consent(&secret, &request.scopes)
            .await
            .map_err(|e| {
                CredentialError::consent_failed(format!("authorization failed: {}", e.message()))
                    .with_source(e)
            })?;

        let credential =
            Credential::from_grant(grant, &request.scopes, Utc::now())?.with_issuer(&secret);
        if !credential.has_scopes(&request.scopes) {
            return Err(CredentialError::consent_failed(format!(
                "authorization granted only {}; approve every requested permission",
                credential.scopes.join(", ")
            )));
        }

        request.store.save(&credential)?;
        info!("stored new {} credential", request.service);
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::{BoxFuture, TokenGrant};
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Issuer that answers from canned results and counts calls.
    #[derive(Default)]
    struct FakeIssuer {
        refresh_result: Option<TokenGrant>,
        consent_result: Option<TokenGrant>,
        refresh_calls: Arc<AtomicUsize>,
        consent_calls: Arc<AtomicUsize>,
    }

    impl TokenIssuer for FakeIssuer {
        fn refresh<'a>(
            &'a self,
            _secret: &'a ClientSecret,
            _refresh_token: &'a str,
        ) -> BoxFuture<'a, CredentialResult<TokenGrant>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .refresh_result
                .clone()
                .ok_or_else(|| CredentialError::authentication("invalid_grant"));
            Box::pin(async move { result })
        }

        fn consent<'a>(
            &'a self,
            _secret: &'a ClientSecret,
            _scopes: &'a [String],
        ) -> BoxFuture<'a, CredentialResult<TokenGrant>> {
            self.consent_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .consent_result
                .clone()
                .ok_or_else(|| CredentialError::consent_failed("access_denied"));
            Box::pin(async move { result })
        }
    }

    fn calendar() -> Vec<String> {
        vec!["calendar".to_string()]
    }

    fn request(dir: &tempfile::TempDir) -> ObtainRequest {
        ObtainRequest::new(
            "calendar",
            calendar(),
            CredentialStore::new(dir.path().join("token.json")),
        )
        .with_client_secret(ClientSecretSource::Inline(ClientSecret::new("id", "secret")))
        .with_consent_policy(ConsentPolicy::Interactive)
    }

    #[tokio::test]
    async fn valid_credential_is_returned_without_issuer_calls() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        let stored = Credential::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() + Duration::hours(1)),
            calendar(),
        );
        request.store.save(&stored).unwrap();
        let before = std::fs::read_to_string(request.store.path()).unwrap();

        let issuer = FakeIssuer::default();
        let refresh_calls = issuer.refresh_calls.clone();
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let first = manager.obtain(&request).await.unwrap();
        let second = manager.obtain(&request).await.unwrap();
        assert_eq!(first, stored);
        assert_eq!(second, stored);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(request.store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        request
            .store
            .save(&Credential::new(
                "a1",
                Some("r1".to_string()),
                Some(Utc::now() - Duration::hours(1)),
                calendar(),
            ))
            .unwrap();

        let issuer = FakeIssuer {
            refresh_result: Some(TokenGrant::new("a2", None, Some(3600))),
            ..Default::default()
        };
        let refresh_calls = issuer.refresh_calls.clone();
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(credential.access_token, "a2");
        assert_eq!(credential.refresh_token.as_deref(), Some("r1"));
        assert_eq!(credential.scopes, calendar());
        assert!(credential.expiry.unwrap() > Utc::now());
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(request.store.load().unwrap().unwrap(), credential);

        // The refreshed credential is now valid, so no further exchange
        manager.obtain(&request).await.unwrap();
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_is_fatal_and_leaves_store() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        request
            .store
            .save(&Credential::new(
                "a1",
                Some("revoked".to_string()),
                Some(Utc::now() - Duration::hours(1)),
                calendar(),
            ))
            .unwrap();
        let before = std::fs::read_to_string(request.store.path()).unwrap();

        let issuer = FakeIssuer::default();
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::RefreshFailed);
        assert!(err.needs_reauth());
        assert!(err.message().contains("toolauth auth calendar --force"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(request.store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_secret_fails_before_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir)
            .with_client_secret(ClientSecretSource::File(dir.path().join("credentials.json")));

        let issuer = FakeIssuer {
            consent_result: Some(TokenGrant::new("a1", None, Some(3600))),
            ..Default::default()
        };
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::MissingClientSecret);
        assert!(err.is_fatal());
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
        assert!(!request.store.exists());
    }

    #[tokio::test]
    async fn scope_mismatch_forces_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        request
            .store
            .save(&Credential::new(
                "sheets-token",
                Some("r1".to_string()),
                Some(Utc::now() + Duration::hours(1)),
                vec!["spreadsheets".to_string()],
            ))
            .unwrap();

        let issuer = FakeIssuer {
            consent_result: Some(TokenGrant::new("cal-token", Some("r2".to_string()), Some(3600))),
            ..Default::default()
        };
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(credential.access_token, "cal-token");
        assert_eq!(credential.scopes, calendar());
        assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unusable_credential_goes_to_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        request
            .store
            .save(&Credential::new(
                "old",
                None,
                Some(Utc::now() - Duration::hours(1)),
                calendar(),
            ))
            .unwrap();

        let issuer = FakeIssuer {
            consent_result: Some(TokenGrant::new("fresh", Some("r".to_string()), Some(3600))),
            ..Default::default()
        };
        let refresh_calls = issuer.refresh_calls.clone();
        let manager = CredentialManager::new(issuer);

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(credential.access_token, "fresh");
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(credential.client_id.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn deny_policy_reports_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir).with_consent_policy(ConsentPolicy::Deny);
        let issuer = FakeIssuer::default();
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::ConsentRequired);
        assert_eq!(err.service(), Some("calendar"));
        assert!(err.message().contains("toolauth auth calendar"));
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deny_policy_still_requires_client_secret() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir)
            .with_client_secret(ClientSecretSource::File(dir.path().join("credentials.json")))
            .with_consent_policy(ConsentPolicy::Deny);
        let issuer = FakeIssuer::default();
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::MissingClientSecret);
        assert_eq!(consent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn absent_store_is_created_by_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        assert!(!request.store.exists());

        let issuer = FakeIssuer {
            consent_result: Some(TokenGrant::new("a1", Some("r1".to_string()), Some(3600))),
            ..Default::default()
        };
        let consent_calls = issuer.consent_calls.clone();
        let manager = CredentialManager::new(issuer);

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(credential.access_token, "a1");
        assert_eq!(credential.refresh_token.as_deref(), Some("r1"));
        assert!(credential.expiry.unwrap() > Utc::now() + Duration::minutes(59));

        let stored = request.store.load().unwrap().unwrap();
        assert_eq!(stored, credential);
        assert_eq!(stored.refresh_token, credential.refresh_token);
        assert_eq!(stored.expiry, credential.expiry);
    }

    #[tokio::test]
    async fn reauthorize_keeps_store_until_consent_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir).with_reauthorize(true);
        let stored = Credential::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() + Duration::hours(1)),
            calendar(),
        );
        request.store.save(&stored).unwrap();
        let before = std::fs::read_to_string(request.store.path()).unwrap();

        let denied = CredentialManager::new(FakeIssuer::default());
        let err = denied.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::ConsentFailed);
        assert_eq!(std::fs::read_to_string(request.store.path()).unwrap(), before);

        let issuer = FakeIssuer {
            consent_result: Some(TokenGrant::new("a2", Some("r2".to_string()), Some(3600))),
            ..Default::default()
        };
        let consent_calls = issuer.consent_calls.clone();
        let granted = CredentialManager::new(issuer);
        let credential = granted.obtain(&request).await.unwrap();
        assert_eq!(consent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(credential.access_token, "a2");
        assert_eq!(request.store.load().unwrap().unwrap(), credential);
    }

    #[tokio::test]
    async fn out_of_range_refresh_lifetime_leaves_store() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        request
            .store
            .save(&Credential::new(
                "a1",
                Some("r1".to_string()),
                Some(Utc::now() - Duration::hours(1)),
                calendar(),
            ))
            .unwrap();
        let before = std::fs::read_to_string(request.store.path()).unwrap();

        let manager = CredentialManager::new(FakeIssuer {
            refresh_result: Some(TokenGrant::new("a2", None, Some(i64::MAX))),
            ..Default::default()
        });

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::InvalidResponse);
        assert_eq!(std::fs::read_to_string(request.store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn corrupt_store_falls_through_to_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        std::fs::write(request.store.path(), "garbage").unwrap();

        let manager = CredentialManager::new(FakeIssuer {
            consent_result: Some(TokenGrant::new("a1", Some("r1".to_string()), Some(3600))),
            ..Default::default()
        });

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(credential.access_token, "a1");
        assert_eq!(request.store.load().unwrap().unwrap().access_token, "a1");
    }

    #[tokio::test]
    async fn consent_denial_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        let manager = CredentialManager::new(FakeIssuer::default());

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::ConsentFailed);
        assert!(!request.store.exists());
    }

    #[tokio::test]
    async fn partial_grant_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        let mut grant = TokenGrant::new("a1", Some("r1".to_string()), Some(3600));
        grant.scope = Some("openid".to_string());
        let manager = CredentialManager::new(FakeIssuer {
            consent_result: Some(grant),
            ..Default::default()
        });

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::ConsentFailed);
        assert!(!request.store.exists());
    }

    #[tokio::test]
    async fn refresh_falls_back_to_recorded_identity() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir).with_client_secret(ClientSecretSource::Missing);
        let stored = Credential::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() - Duration::hours(1)),
            calendar(),
        )
        .with_issuer(&ClientSecret::new("recorded-id", "recorded-secret"));
        request.store.save(&stored).unwrap();

        let manager = CredentialManager::new(FakeIssuer {
            refresh_result: Some(TokenGrant::new("a2", None, Some(3600))),
            ..Default::default()
        });

        let credential = manager.obtain(&request).await.unwrap();
        assert_eq!(credential.access_token, "a2");
    }

    #[tokio::test]
    async fn refresh_without_any_identity_is_missing_secret() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir).with_client_secret(ClientSecretSource::Missing);
        request
            .store
            .save(&Credential::new(
                "a1",
                Some("r1".to_string()),
                Some(Utc::now() - Duration::hours(1)),
                calendar(),
            ))
            .unwrap();

        let issuer = FakeIssuer::default();
        let refresh_calls = issuer.refresh_calls.clone();
        let manager = CredentialManager::new(issuer);

        let err = manager.obtain(&request).await.unwrap_err();
        assert_eq!(err.code(), CredentialErrorCode::MissingClientSecret);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn status_reports_each_case() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir);
        assert_eq!(request.status(), CredentialStatus::NotAuthenticated);

        let mut credential = Credential::new(
            "a1",
            Some("r1".to_string()),
            Some(Utc::now() - Duration::hours(1)),
            calendar(),
        );
        request.store.save(&credential).unwrap();
        assert_eq!(request.status().label(), "refreshable");
        assert!(request.status().is_usable());

        credential.scopes = vec!["other".to_string()];
        request.store.save(&credential).unwrap();
        assert_eq!(
            request.status(),
            CredentialStatus::ScopeMismatch {
                missing: calendar()
            }
        );

        std::fs::write(request.store.path(), "nope").unwrap();
        assert_eq!(request.status().label(), "unreadable");
        assert!(!request.status().is_usable());
    }
}
