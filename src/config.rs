use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

pub(crate) const DEFAULT_URL: &str = "https://api.imf.org/external/sdmx/3.0";
pub(crate) const DEFAULT_CLIENT_ID: &str = "446ce2fa-88b1-436c-b8e6-94491ca4f6fb";
pub(crate) const DEFAULT_SCOPE: &str =
    "https://imfprdb2c.onmicrosoft.com/4042e178-3e2f-4ff9-ac38-1276c901c13d/iData.Login";
pub(crate) const DEFAULT_TOKEN_CACHE: &str = "msal_token_cache.bin";

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    token: Option<String>,
    verify: Option<bool>,
    client_id: Option<String>,
    scope: Option<String>,
    token_cache: Option<String>,
}

/// Layers environment variables over the first rc file found, then defaults.
pub(crate) fn load_config() -> Result<ClientConfig> {
    let mut url = env_var("IMFDATA_URL");
    let mut access_token = env_var("IMFDATA_ACCESS_TOKEN");
    let mut client_id = env_var("IMFIDATA_CLIENT_ID");
    let mut scope = env_var("IMFIDATA_SCOPE");
    let mut token_cache = env_var("IMFIDATA_CACHE_PATH");
    let mut verify: Option<bool> = None;

    for rc_path in rc_candidates() {
        if !rc_path.exists() {
            continue;
        }
        let cfg = read_rc(&rc_path).with_context(|| {
            format!("failed to read configuration file {}", rc_path.display())
        })?;
        log::debug!("loaded settings from {}", rc_path.display());

        url = url.or(cfg.url);
        access_token = access_token.or(cfg.token);
        client_id = client_id.or(cfg.client_id);
        scope = scope.or(cfg.scope);
        token_cache = token_cache.or(cfg.token_cache);
        verify = cfg.verify;
        break;
    }

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        verify: verify.unwrap_or(true),
        access_token,
        client_id: client_id.unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
        scope: scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        token_cache: PathBuf::from(token_cache.unwrap_or_else(|| DEFAULT_TOKEN_CACHE.to_string())),
    })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Long tokens are often wrapped: `token:` on one line and the value on the next.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                cfg.set(k, v);
            }
        }
    }

    cfg
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        let value = value.to_string();
        match key {
            "url" => self.url = Some(value),
            "token" => self.token = Some(value),
            "verify" => self.verify = Some(value != "0" && value != "false"),
            "client_id" => self.client_id = Some(value),
            "scope" => self.scope = Some(value),
            "token_cache" => self.token_cache = Some(value),
            _ => {}
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) IMFDATA_RC (explicit)
    // 2) ./.imfdatarc
    // 3) ~/.imfdatarc
    if let Ok(p) = std::env::var("IMFDATA_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".imfdatarc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".imfdatarc"));
    }
    v
}
