//! OAuth 2.0 credential lifecycle for tool adapters.
//!
//! This crate turns "I need to call the Calendar API" into a valid bearer
//! credential:
//!
//! - [`CredentialManager`] - Loads, refreshes or re-consents, then persists
//! - [`CredentialStore`] - One JSON credential file per service
//! - [`TokenIssuer`] - The issuer seam, implemented over HTTP by [`OAuthIssuer`]
//! - [`AuthenticatedTransport`] - What adapters receive once authorized
//! - [`CredentialError`] - Error taxonomy shared by every operation
//!
//! # Flow
//!
//! ```text
//!  load store ──► valid? ──yes──────────────────────────► return
//!       │            │no
//!       │            ▼
//!       │       refresh token? ──yes──► refresh ──► save ──► return
//!       │            │no                  │fail
//!       ▼            ▼                    ▼
//!   (absent)  interactive consent    RefreshFailed
//!                    │
//!                    ▼
//!             save ──► return
//! ```
//!
//! # Example
//!
//! ```ignore
//! use toolauth_credentials::{
//!     ClientSecretSource, ConsentPolicy, CredentialManager, IssuerOptions, Service,
//!     ServiceProfile,
//! };
//!
//! let manager = CredentialManager::with_options(IssuerOptions::default())?;
//! let request = ServiceProfile::new(Service::Calendar)
//!     .request(ClientSecretSource::File("credentials.json".into()), ConsentPolicy::Interactive);
//! let credential = manager.obtain(&request).await?;
//! ```

pub mod client_secret;
pub mod credential;
pub mod error;
pub mod issuer;
pub mod manager;
pub mod oauth;
pub mod service;
pub mod store;
pub mod transport;

pub use client_secret::{ClientSecret, ClientSecretSource};
pub use credential::{Credential, CredentialState};
pub use error::{CredentialError, CredentialErrorCode, CredentialResult};
pub use issuer::{BoxFuture, TokenGrant, TokenIssuer};
pub use manager::{ConsentPolicy, CredentialManager, CredentialStatus, ObtainRequest};
pub use oauth::{IssuerOptions, OAuthIssuer};
pub use service::{Service, ServiceProfile};
pub use store::CredentialStore;
pub use transport::{AuthenticatedTransport, BearerTransport, TransportOptions};
