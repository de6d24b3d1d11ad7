use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::auth::{MsalTokenCache, StaticToken, TokenChain, TokenProvider};
use crate::config::{DEFAULT_CLIENT_ID, DEFAULT_SCOPE, DEFAULT_TOKEN_CACHE, DEFAULT_URL, load_config};
use crate::data::DataMessage;
use crate::dates::convert_time_periods;
use crate::error::{Endpoint, Error, Result, format_sdmx_error};
use crate::key::{CODE_SEPARATOR, GROUP_SEPARATOR, make_key_str, parse_key};
use crate::labels::{DimensionEnv, LabelEnv};
use crate::model::{Code, CodelistSummary, DataTable, Dataflow, Dimension, TIME_PERIOD};
use crate::structure::StructureMessage;
use crate::util::{is_sdmx_id, resource_path, urljoin};

const STRUCTURE_JSON: &str = "application/vnd.sdmx.structure+json;version=2.0.0";
const DATA_JSON: &str = "application/vnd.sdmx.data+json;version=2.0.0";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base SDMX 3.0 REST URL, typically `https://api.imf.org/external/sdmx/3.0`.
    pub url: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Pre-acquired access token; takes precedence over the MSAL cache.
    pub access_token: Option<String>,
    /// MSAL application id the cached tokens were issued to.
    pub client_id: String,
    /// Scope a cached token must carry.
    pub scope: String,
    /// MSAL serialized token cache.
    pub token_cache: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            verify: true,
            access_token: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            token_cache: PathBuf::from(DEFAULT_TOKEN_CACHE),
        }
    }
}

impl ClientConfig {
    /// Reads `IMFDATA_*` / `IMFIDATA_*` environment variables and `.imfdatarc`.
    pub fn from_env() -> Result<Self> {
        load_config().map_err(Error::Config)
    }

    /// The provider used when a client is built with `auth = true`.
    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        let mut providers: Vec<Box<dyn TokenProvider>> = Vec::new();
        if let Some(tok) = self.access_token.as_deref() {
            providers.push(Box::new(StaticToken::new(tok)));
        }
        providers.push(Box::new(MsalTokenCache::new(
            self.token_cache.clone(),
            self.client_id.clone(),
            self.scope.clone(),
        )));
        Arc::new(TokenChain::new(providers))
    }
}

/// Client for one dataset of the IMF SDMX service.
///
/// Structure metadata is fetched on first use and kept for the lifetime of the
/// client; data requests always go to the service.
#[derive(Debug, Clone)]
pub struct Client {
    dataset: Option<String>,
    url: String,
    auth: Option<Arc<dyn TokenProvider>>,

    timeout: Duration,
    progress: bool,

    http: HttpClient,

    dataflow_message: OnceLock<StructureMessage>,
    dsd_message: OnceLock<StructureMessage>,
}

impl Client {
    /// Creates a client for `dataset` using environment/rc configuration.
    ///
    /// With `auth = true` every request carries an `Authorization` header.
    pub fn new(dataset: impl Into<String>, auth: bool) -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?, Some(dataset.into()), auth)
    }

    /// Creates a client from an explicit configuration. `dataset` may be omitted
    /// when only [`dataflows`](Self::dataflows) is needed.
    pub fn with_config(config: ClientConfig, dataset: Option<String>, auth: bool) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("imfdata-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("imfdata-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);
        if !config.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        let dataset = dataset
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = dataset.as_deref() {
            if !is_sdmx_id(d) {
                return Err(Error::InvalidIdentifier(d.to_string()));
            }
        }

        let auth = auth.then(|| config.token_provider());

        Ok(Self {
            dataset,
            url: config.url,
            auth,
            timeout: Duration::from_secs(60),
            progress: true,
            http,
            dataflow_message: OnceLock::new(),
            dsd_message: OnceLock::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the token source and turns authentication on.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// All dataflows visible under the given auth mode, keyed by id.
    pub fn datasets(auth: bool) -> Result<BTreeMap<String, String>> {
        let client = Self::with_config(ClientConfig::from_env()?, None, auth)?;
        Ok(client
            .dataflows()?
            .into_iter()
            .map(|df| (df.id, df.description))
            .collect())
    }

    /// Full dataflow records in service order. Needs no dataset.
    pub fn dataflows(&self) -> Result<Vec<Dataflow>> {
        let path = resource_path(&["structure", "dataflow", "*", "*", "+"]);
        let msg = self.fetch_structure(&path, &[])?;
        Ok(msg.dataflows())
    }

    /// Dimensions of the dataset in key order; `TIME_PERIOD` comes last.
    pub fn list_dimensions(&self) -> Result<Vec<Dimension>> {
        let dataset = self.require_dataset("list_dimensions")?;
        self.dataflow_message()?.dimensions(dataset).ok_or_else(|| {
            Error::MetadataUnavailable(format!("no data structure found for dataset '{dataset}'"))
        })
    }

    /// Dimension id → codelist id, in key order.
    pub fn dimension_env(&self) -> Result<DimensionEnv> {
        Ok(DimensionEnv::new(
            self.list_dimensions()?
                .into_iter()
                .map(|d| (d.id, d.codelist))
                .collect(),
        ))
    }

    /// Every codelist the dataset's structure pulls in, used or not.
    pub fn codelists_summary(&self) -> Result<Vec<CodelistSummary>> {
        Ok(self.dsd_message()?.codelists_summary())
    }

    /// Codes of one codelist plus their label environment.
    pub fn codelist(&self, codelist_id: &str) -> Result<(Vec<Code>, LabelEnv)> {
        let dataset = self.require_dataset("codelist")?;
        let codes = self
            .dsd_message()?
            .codes(codelist_id)
            .ok_or_else(|| Error::CodelistNotFound {
                codelist: codelist_id.to_string(),
                dataset: dataset.to_string(),
            })?;
        let env = LabelEnv::from_pairs(codes.iter().map(|c| (c.name.as_str(), c.code_id.clone())));
        Ok((codes, env))
    }

    /// Builds a key from `(dimension, codes)` pairs given in any order.
    ///
    /// Dimensions left out become wildcards. The key has one group per
    /// dimension of [`list_dimensions`](Self::list_dimensions) except
    /// `TIME_PERIOD`, which is not part of the series key: selecting it fails
    /// with [`Error::NotAKeyDimension`]. Restrict time with
    /// [`get_data_with_params`](Self::get_data_with_params) instead. Unknown
    /// dimensions fail with [`Error::MetadataUnavailable`].
    pub fn key_for<D, C, S>(&self, selection: &[(D, C)]) -> Result<String>
    where
        D: AsRef<str>,
        C: AsRef<[S]>,
        S: AsRef<str>,
    {
        let dims: Vec<Dimension> = self
            .list_dimensions()?
            .into_iter()
            .filter(|d| d.id != TIME_PERIOD)
            .collect();

        let mut groups: Vec<Vec<&str>> = vec![Vec::new(); dims.len()];
        for (dim, codes) in selection {
            let dim = dim.as_ref();
            if dim == TIME_PERIOD {
                return Err(Error::NotAKeyDimension(dim.to_string()));
            }
            let pos = dims.iter().position(|d| d.id == dim).ok_or_else(|| {
                Error::MetadataUnavailable(format!(
                    "dataset '{}' has no dimension '{dim}'",
                    self.dataset.as_deref().unwrap_or_default()
                ))
            })?;
            groups[pos].extend(codes.as_ref().iter().map(|s| AsRef::<str>::as_ref(s)));
        }
        Ok(make_key_str(&groups))
    }

    /// Retrieves the observations matching `key`.
    ///
    /// With `convert_dates`, a `date` column holds the end of each period.
    pub fn get_data(&self, key: &str, convert_dates: bool) -> Result<DataTable> {
        self.get_data_with_params(key, &[], convert_dates)
    }

    /// [`get_data`](Self::get_data) with extra query parameters, e.g.
    /// `("c[TIME_PERIOD]", "ge:2015")`.
    pub fn get_data_with_params(
        &self,
        key: &str,
        params: &[(&str, &str)],
        convert_dates: bool,
    ) -> Result<DataTable> {
        let dataset = self.require_dataset("get_data")?;
        let path = resource_path(&["data", "dataflow", "*", dataset, "+", &wire_key(key)?]);

        let pb = self.progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("fetching {dataset}/{key}"));
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        let text = self.get_text(Endpoint::Data, &path, params, DATA_JSON);
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let mut table = DataMessage::from_json(&text?)?.into_table()?;
        log::debug!("{} observation(s) for {dataset}/{key}", table.len());
        if convert_dates {
            convert_time_periods(&mut table);
        }
        Ok(table)
    }

    fn require_dataset(&self, op: &'static str) -> Result<&str> {
        self.dataset.as_deref().ok_or(Error::MissingDataset(op))
    }

    fn dataflow_message(&self) -> Result<&StructureMessage> {
        if let Some(msg) = self.dataflow_message.get() {
            return Ok(msg);
        }
        let dataset = self.require_dataset("dimension metadata")?;
        let path = resource_path(&["structure", "dataflow", "*", dataset, "+"]);
        let msg = self.fetch_structure(&path, &[("references", "descendants"), ("detail", "full")])?;
        log::info!("cached dataflow structure for {dataset}");
        Ok(self.dataflow_message.get_or_init(|| msg))
    }

    fn dsd_message(&self) -> Result<&StructureMessage> {
        if let Some(msg) = self.dsd_message.get() {
            return Ok(msg);
        }
        let dataset = self.require_dataset("codelist metadata")?;
        let dsd = format!("DSD_{dataset}");
        let path = resource_path(&["structure", "datastructure", "*", &dsd, "+"]);
        let msg = self.fetch_structure(&path, &[("references", "descendants")])?;
        log::info!("cached {dsd} with codelists");
        Ok(self.dsd_message.get_or_init(|| msg))
    }

    fn fetch_structure(&self, path: &str, params: &[(&str, &str)]) -> Result<StructureMessage> {
        let text = self.get_text(Endpoint::Metadata, path, params, STRUCTURE_JSON)?;
        StructureMessage::from_json(&text).map_err(|e| {
            Error::MetadataUnavailable(format!("failed to parse structure message ({path}): {e}"))
        })
    }

    fn apply_auth(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.auth {
            Some(provider) => {
                let token = provider.access_token()?;
                Ok(req.header(AUTHORIZATION, token.header_value()))
            }
            None => Ok(req),
        }
    }

    fn get_text(
        &self,
        endpoint: Endpoint,
        path: &str,
        params: &[(&str, &str)],
        accept: &str,
    ) -> Result<String> {
        let url = urljoin(&self.url, path);
        let mut req = self
            .http
            .get(&url)
            .header(ACCEPT, accept)
            .timeout(self.timeout);
        if !params.is_empty() {
            req = req.query(params);
        }
        let req = self.apply_auth(req)?;

        log::debug!("GET {url}");
        let resp = req.send()?;
        let status = resp.status();
        let text = resp.text()?;
        log::debug!("HTTP {} from {url} ({} bytes)", status.as_u16(), text.len());

        if !status.is_success() {
            return Err(format_sdmx_error(endpoint, status, &url, &text));
        }
        if text.trim().is_empty() {
            let msg = format!("empty response body from {url}");
            return Err(match endpoint {
                Endpoint::Metadata => Error::MetadataUnavailable(msg),
                Endpoint::Data => Error::DataRequest(msg),
            });
        }
        Ok(text)
    }
}

/// SDMX 3.0 paths spell a wildcard group as `*` rather than an empty token.
fn wire_key(key: &str) -> Result<String> {
    let code_sep = CODE_SEPARATOR.to_string();
    let group_sep = GROUP_SEPARATOR.to_string();
    let groups = parse_key(key.trim());
    if let Some(bad) = groups.iter().flatten().find(|c| !is_sdmx_id(c)) {
        return Err(Error::InvalidIdentifier(bad.clone()));
    }
    Ok(groups
        .iter()
        .map(|g| if g.is_empty() { "*".to_string() } else { g.join(code_sep.as_str()) })
        .collect::<Vec<_>>()
        .join(group_sep.as_str()))
}
