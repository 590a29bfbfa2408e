//! Raw HTTP client for the Nominatim API.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::error::GeocodeError;
use crate::types::{Coordinates, HealthStatus, Place};

/// Raw Nominatim API client.
///
/// Owns the shared HTTP connection pool. Every operation is one GET
/// translated into a typed value; transport, status and decode failures
/// are logged with their diagnostics and collapse to
/// [`GeocodeError::Upstream`].
#[derive(Clone)]
pub struct NominatimClient {
  http: reqwest::Client,
  base_url: Url,
  language: String,
  address_details: bool,
  extra_tags: bool,
  name_details: bool,
}

impl NominatimClient {
  pub fn new(config: &Config) -> Result<Self, GeocodeError> {
    let mut base_url = Url::parse(&config.base_url)
      .map_err(|e| GeocodeError::Config(format!("invalid base URL {}: {}", config.base_url, e)))?;

    // Url::join drops the last path segment without this
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .user_agent(&config.user_agent)
      .build()
      .map_err(|e| GeocodeError::Config(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url,
      language: config.language.clone(),
      address_details: config.address_details,
      extra_tags: config.extra_tags,
      name_details: config.name_details,
    })
  }

  /// Free-text search, most relevant result first (upstream ordering,
  /// never recomputed).
  pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
    let mut params = self.detail_params();
    params.push(("q", query.to_string()));

    self.request("search", &params).await
  }

  /// Reverse geocode a coordinate pair to the place at that point.
  ///
  /// Upstream signals "nothing there" with an `error` body on a 200;
  /// that also fails the call.
  pub async fn reverse(&self, coordinates: &Coordinates) -> Result<Place, GeocodeError> {
    let mut params = self.detail_params();
    params.push(("lat", coordinates.lat.to_string()));
    params.push(("lon", coordinates.lon.to_string()));

    match self.request::<ReverseResponse>("reverse", &params).await? {
      ReverseResponse::Place(place) => Ok(*place),
      ReverseResponse::Error { error } => {
        warn!(%error, "reverse geocoding returned no result");
        Err(GeocodeError::Upstream)
      }
    }
  }

  /// Look up specific OSM objects by prefixed id (`N…`, `W…`, `R…`).
  /// Result order follows the upstream response.
  pub async fn lookup(&self, osm_ids: &[String]) -> Result<Vec<Place>, GeocodeError> {
    if osm_ids.is_empty() {
      return Err(GeocodeError::InvalidInput(
        "osm_ids must not be empty".to_string(),
      ));
    }

    let mut params = self.detail_params();
    params.push(("osm_ids", osm_ids.join(",")));

    self.request("lookup", &params).await
  }

  /// Upstream service status.
  pub async fn health_check(&self) -> Result<HealthStatus, GeocodeError> {
    self.request("status", &[]).await
  }

  /// Issue a GET against `path` and decode the JSON body.
  async fn request<T: DeserializeOwned>(
    &self,
    path: &str,
    params: &[(&str, String)],
  ) -> Result<T, GeocodeError> {
    let url = self.endpoint_url(path, params)?;

    let response = self.http.get(url.clone()).send().await.map_err(|e| {
      warn!(url = %url, error = %e, "request to upstream failed");
      GeocodeError::Upstream
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
      warn!(url = %url, %status, error = %e, "failed to read upstream response body");
      GeocodeError::Upstream
    })?;

    if !status.is_success() {
      warn!(url = %url, %status, %body, "upstream returned an error status");
      return Err(GeocodeError::Upstream);
    }

    serde_json::from_str(&body).map_err(|e| {
      warn!(url = %url, %status, %body, error = %e, "failed to decode upstream response");
      GeocodeError::Upstream
    })
  }

  fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, GeocodeError> {
    let mut url = self
      .base_url
      .join(path)
      .map_err(|e| GeocodeError::Config(format!("invalid endpoint path {}: {}", path, e)))?;

    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("format", "json");
      pairs.append_pair("accept-language", &self.language);
      for (name, value) in params {
        pairs.append_pair(name, value);
      }
    }

    Ok(url)
  }

  /// Detail flags shared by the three geocoding operations. The status
  /// endpoint takes none of them.
  fn detail_params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if self.address_details {
      params.push(("addressdetails", "1".to_string()));
    }
    if self.extra_tags {
      params.push(("extratags", "1".to_string()));
    }
    if self.name_details {
      params.push(("namedetails", "1".to_string()));
    }
    params
  }
}

/// `/reverse` answers 200 with an `error` body when nothing is there.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
  Place(Box<Place>),
  Error { error: String },
}
