//! A small Rust client for the IMF SDMX data service.
//!
//! The workflow mirrors how the service is meant to be queried:
//! list dataflows, inspect a dataset's dimensions and codelists, build a query
//! key from codes, then retrieve the matching time series as a flat table.
//!
//! ## Quick start
//! - Public datasets need no configuration. For protected ones, set
//!   `IMFDATA_ACCESS_TOKEN` or point `IMFIDATA_CACHE_PATH` at an MSAL token cache,
//!   and build the client with `auth = true`.
//! - Settings can also live in `.imfdatarc` (current directory or home directory).
//!
//! ```no_run
//! use imfdata::{Client, make_key_str};
//!
//! fn main() -> imfdata::Result<()> {
//!     let client = Client::new("WEO", false)?;
//!
//!     let dims = client.dimension_env()?;
//!     let country_cl = dims.get("COUNTRY").flatten().unwrap_or("CL_WEO_COUNTRY");
//!     let (_codes, countries) = client.codelist(country_cl)?;
//!
//!     let key = make_key_str(&[
//!         vec![countries.code("United_States")?, countries.code("Netherlands")?],
//!         vec!["LUR"],
//!         vec!["A"],
//!     ]);
//!     let table = client.get_data(&key, true)?;
//!     for obs in &table {
//!         println!("{:?} {:?} {:?}", obs.dimension("COUNTRY"), obs.date, obs.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For configuration details, see the crate README.

#![forbid(unsafe_code)]

mod auth;
mod client;
mod config;
mod data;
mod dates;
mod error;
mod key;
mod labels;
mod model;
mod structure;
mod util;

pub use auth::{AccessToken, MsalTokenCache, StaticToken, TokenChain, TokenProvider};
pub use client::{Client, ClientConfig};
pub use dates::period_end;
pub use error::{Error, Result};
pub use key::{CODE_SEPARATOR, GROUP_SEPARATOR, make_key_str, parse_key};
pub use labels::{DimensionEnv, LabelEnv, sanitize};
pub use model::{Code, CodelistSummary, DataTable, Dataflow, Dimension, Observation, TIME_PERIOD};
