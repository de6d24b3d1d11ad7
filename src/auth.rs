//! Access tokens for protected datasets.
//!
//! Token acquisition itself belongs to MSAL; this module only reads what MSAL
//! (or the user) already produced and turns it into an `Authorization` header.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A bearer credential ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token_type: String,
    pub secret: String,
}

impl AccessToken {
    pub fn bearer(secret: impl Into<String>) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            secret: secret.into(),
        }
    }

    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.secret)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Source of access tokens, asked once per outgoing request.
pub trait TokenProvider: fmt::Debug + Send + Sync {
    fn access_token(&self) -> Result<AccessToken>;
}

/// A token supplied up front, e.g. from `IMFDATA_ACCESS_TOKEN`.
#[derive(Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        // Accept a pasted `Bearer xyz` as well as the bare token.
        let secret = secret
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or(secret);
        Self(AccessToken::bearer(secret.trim()))
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&self.0).finish()
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Result<AccessToken> {
        if self.0.secret.is_empty() {
            return Err(Error::Authentication("configured access token is empty".into()));
        }
        Ok(self.0.clone())
    }
}

/// Silent acquisition from an MSAL serialized token cache.
///
/// Picks the unexpired `AccessToken` entry issued to `client_id` whose target
/// contains `scope`. Refreshing or interactive sign-in is left to MSAL.
#[derive(Debug, Clone)]
pub struct MsalTokenCache {
    path: PathBuf,
    client_id: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct MsalCacheFile {
    #[serde(default, rename = "AccessToken")]
    access_tokens: HashMap<String, MsalAccessToken>,
}

#[derive(Debug, Deserialize)]
struct MsalAccessToken {
    secret: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    expires_on: Option<serde_json::Value>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

impl MsalTokenCache {
    pub fn new(path: impl Into<PathBuf>, client_id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            client_id: client_id.into(),
            scope: scope.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn select(&self, cache: MsalCacheFile, now: i64) -> Result<AccessToken> {
        let mut best: Option<(i64, MsalAccessToken)> = None;
        for entry in cache.access_tokens.into_values() {
            if !entry.client_id.eq_ignore_ascii_case(&self.client_id) {
                continue;
            }
            if !entry
                .target
                .split_whitespace()
                .any(|s| s.eq_ignore_ascii_case(&self.scope))
            {
                continue;
            }
            let expires = entry.expires_on.as_ref().and_then(epoch_seconds).unwrap_or(0);
            if expires - EXPIRY_MARGIN_SECS <= now {
                continue;
            }
            if best.as_ref().is_none_or(|(e, _)| expires > *e) {
                best = Some((expires, entry));
            }
        }

        let (_, entry) = best.ok_or_else(|| {
            Error::Authentication(format!(
                "no valid access token for client {} in {} (sign in with MSAL to refresh the cache)",
                self.client_id,
                self.path.display()
            ))
        })?;
        Ok(AccessToken {
            token_type: entry.token_type.unwrap_or_else(|| "Bearer".to_string()),
            secret: entry.secret,
        })
    }
}

// MSAL writes `expires_on` as a string of epoch seconds; accept numbers too.
fn epoch_seconds(v: &serde_json::Value) -> Option<i64> {
    match v {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

impl TokenProvider for MsalTokenCache {
    fn access_token(&self) -> Result<AccessToken> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Authentication(format!(
                "cannot read MSAL token cache {}: {e}",
                self.path.display()
            ))
        })?;
        let cache: MsalCacheFile = serde_json::from_str(&text).map_err(|e| {
            Error::Authentication(format!(
                "MSAL token cache {} is not valid JSON: {e}",
                self.path.display()
            ))
        })?;
        self.select(cache, chrono::Utc::now().timestamp())
    }
}

/// Tries providers in order and returns the first token obtained.
#[derive(Debug)]
pub struct TokenChain {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl TokenChain {
    pub fn new(providers: Vec<Box<dyn TokenProvider>>) -> Self {
        Self { providers }
    }
}

impl TokenProvider for TokenChain {
    fn access_token(&self) -> Result<AccessToken> {
        let mut failures = Vec::new();
        for p in &self.providers {
            match p.access_token() {
                Ok(tok) => return Ok(tok),
                Err(e) => {
                    log::debug!("token provider {p:?} failed: {e}");
                    failures.push(e.to_string());
                }
            }
        }
        if failures.is_empty() {
            return Err(Error::Authentication("no token provider configured".into()));
        }
        Err(Error::Authentication(failures.join("; ")))
    }
}
