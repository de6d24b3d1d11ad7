use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Dataset, dimension or codelist metadata could not be fetched or parsed.
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The codelist is not registered for the dataset.
    #[error("codelist '{codelist}' not found in dataset '{dataset}'")]
    CodelistNotFound { codelist: String, dataset: String },

    /// The time-series request failed or returned an unusable payload.
    #[error("data request failed: {0}")]
    DataRequest(String),

    /// A token could not be acquired, or the service rejected it.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The operation needs a dataset but the client was built without one.
    #[error("dataset required for {0}")]
    MissingDataset(&'static str),

    /// The dimension exists but is not a group of the series key (`TIME_PERIOD`).
    #[error("dimension '{0}' is not part of the series key; restrict it with query parameters such as c[{0}]")]
    NotAKeyDimension(String),

    /// A dataset id or key code that cannot be placed in a REST path.
    #[error("'{0}' is not a valid SDMX identifier")]
    InvalidIdentifier(String),

    /// A sanitized label is not present in a label environment.
    #[error("no code with label '{0}'")]
    UnknownLabel(String),

    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Which endpoint family a failed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Metadata,
    Data,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct SdmxErrorResponse {
    #[serde(default)]
    pub(crate) errors: Vec<SdmxErrorEntry>,
    // Gateways sometimes answer with {"statusCode":..,"message":..}
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct SdmxErrorEntry {
    #[serde(default)]
    pub(crate) code: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

impl SdmxErrorResponse {
    fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| {
                let code = e.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
                let title = e.title.as_deref().unwrap_or("");
                let detail = e.detail.as_deref().unwrap_or("");
                [code.as_str(), title, detail]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(m) = self.message.as_deref() {
            parts.push(m.to_string());
        }
        parts.join("; ")
    }
}

pub(crate) fn format_sdmx_error(
    endpoint: Endpoint,
    status: StatusCode,
    url: &str,
    body: &str,
) -> Error {
    let server = serde_json::from_str::<SdmxErrorResponse>(body)
        .map(|e| e.summary())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.trim().chars().take(500).collect());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Authentication(format!(
            "HTTP {} for url ({}).\n- Protected datasets need auth=true and a valid IMF access token\n- Tokens are read from IMFDATA_ACCESS_TOKEN or the MSAL cache (IMFIDATA_CACHE_PATH)\n\nServer message: {}",
            status.as_u16(),
            url,
            server
        ));
    }

    let msg = format!("HTTP {} for url ({})\n{}", status.as_u16(), url, server);
    match endpoint {
        Endpoint::Metadata => Error::MetadataUnavailable(msg),
        Endpoint::Data => Error::DataRequest(msg),
    }
}
