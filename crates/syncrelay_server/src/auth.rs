//! Tenant authentication.
//!
//! A tenant proves its identity with a client identifier and a pre-shared
//! access token. Both are matched in a single query, so an unknown client
//! and a wrong token produce the same [`AuthVerdict::Unauthorized`] and the
//! caller cannot enumerate client identifiers.
//!
//! Tokens never reach the logs; diagnostics carry a short SHA-256
//! fingerprint instead (see [`Credentials::fingerprint`]).

use crate::error::{ServerError, ServerResult};
use sha2::{Digest, Sha256};
use std::fmt;
use syncrelay_store::{StoreConnection, StoreResult, Tenant};

/// A validated (non-empty) client identifier and access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    access_token: String,
}

impl Credentials {
    /// Builds credentials from optional request fields.
    ///
    /// Returns `None` if either field is missing or empty.
    pub fn from_parts(client_id: Option<String>, access_token: Option<String>) -> Option<Self> {
        match (client_id, access_token) {
            (Some(client_id), Some(access_token))
                if !client_id.is_empty() && !access_token.is_empty() =>
            {
                Some(Self {
                    client_id,
                    access_token,
                })
            }
            _ => None,
        }
    }

    /// Returns the claimed client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the first 8 bytes of the token's SHA-256 as hex.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.access_token.as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("token", &self.fingerprint())
            .finish()
    }
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthVerdict {
    /// Exactly one tenant matched both fields.
    Authorized(Tenant),
    /// No tenant matched.
    Unauthorized,
}

impl AuthVerdict {
    /// Returns the tenant, or [`ServerError::Unauthorized`].
    pub fn into_tenant(self) -> ServerResult<Tenant> {
        match self {
            AuthVerdict::Authorized(tenant) => Ok(tenant),
            AuthVerdict::Unauthorized => Err(ServerError::Unauthorized),
        }
    }

    /// Returns true if a tenant matched.
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthVerdict::Authorized(_))
    }
}

/// Checks credentials against the tenant table.
///
/// Performs exactly one read. Store failures are returned as errors and
/// never folded into [`AuthVerdict::Unauthorized`].
pub async fn authenticate(
    conn: &mut dyn StoreConnection,
    credentials: &Credentials,
) -> StoreResult<AuthVerdict> {
    let tenant = conn
        .find_tenant(&credentials.client_id, &credentials.access_token)
        .await?;

    Ok(match tenant {
        Some(tenant) => {
            tracing::debug!(client_id = %credentials.client_id, "Tenant authenticated");
            AuthVerdict::Authorized(tenant)
        }
        None => {
            tracing::warn!(
                client_id = %credentials.client_id,
                token = %credentials.fingerprint(),
                "Rejected client credentials"
            );
            AuthVerdict::Unauthorized
        }
    })
}
