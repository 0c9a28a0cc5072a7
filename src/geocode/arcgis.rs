use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::Geocoder;
use crate::config::GeocodingConfig;
use crate::geo::Coordinate;

/// Geocoder backed by the ArcGIS World GeocodeServer, with ipinfo.io for
/// the approximate current location. Neither service needs an API key.
pub struct ArcGisGeocoder {
    search_url: String,
    ip_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    location: Point,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
}

impl ArcGisGeocoder {
    pub fn new(search_url: String, ip_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geotagger/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            search_url,
            ip_url,
            client,
        })
    }

    pub fn from_config(config: &GeocodingConfig) -> Result<Self> {
        Self::new(
            config.arcgis_url.clone(),
            config.ip_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl Geocoder for ArcGisGeocoder {
    fn name(&self) -> &str {
        "ArcGIS"
    }

    async fn resolve(&self, name: &str) -> Result<Option<Coordinate>> {
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[("SingleLine", name), ("f", "json"), ("maxLocations", "1")])
            .send()
            .await
            .context("ArcGIS request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read ArcGIS response")?;

        if !status.is_success() {
            anyhow::bail!("ArcGIS API error ({}): {}", status, text);
        }

        let parsed: CandidatesResponse =
            serde_json::from_str(&text).context("Failed to parse ArcGIS response JSON")?;

        Ok(parsed.candidates.into_iter().next().map(|c| {
            log::debug!("ArcGIS matched {name:?} to {:?}", c.address);
            Coordinate::new(c.location.y, c.location.x)
        }))
    }

    async fn current_location(&self) -> Result<Coordinate> {
        let info: IpInfoResponse = self
            .client
            .get(&self.ip_url)
            .send()
            .await
            .context("IP location request failed")?
            .error_for_status()
            .context("IP location service returned an error")?
            .json()
            .await
            .context("Failed to parse IP location response")?;

        let loc = info.loc.context("IP location response has no coordinates")?;
        parse_latlng(&loc).with_context(|| format!("Malformed location {loc:?}"))
    }
}

/// Parse a `"lat,lon"` pair.
fn parse_latlng(s: &str) -> Option<Coordinate> {
    let (lat, lon) = s.split_once(',')?;
    let lat = lat.trim().parse().ok()?;
    let lon = lon.trim().parse().ok()?;
    Some(Coordinate::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_latlng_pair() {
        assert_eq!(
            parse_latlng("34.0522,-118.2437"),
            Some(Coordinate::new(34.0522, -118.2437))
        );
        assert_eq!(parse_latlng(" 1.5 , 2.5 "), Some(Coordinate::new(1.5, 2.5)));
    }

    #[test]
    fn parse_latlng_rejects_garbage() {
        assert_eq!(parse_latlng(""), None);
        assert_eq!(parse_latlng("34.05"), None);
        assert_eq!(parse_latlng("north,west"), None);
    }

    #[test]
    fn candidates_response_uses_y_as_latitude() {
        let json = r#"{"spatialReference":{"wkid":4326},"candidates":[
            {"address":"Pasadena, California","location":{"x":-118.1445,"y":34.1478},"score":100}
        ]}"#;
        let parsed: CandidatesResponse = serde_json::from_str(json).unwrap();
        let c = &parsed.candidates[0];
        assert_eq!(Coordinate::new(c.location.y, c.location.x), Coordinate::new(34.1478, -118.1445));
    }

    #[test]
    fn candidates_response_may_be_empty() {
        let parsed: CandidatesResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(parsed.candidates.is_empty());
        let parsed: CandidatesResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
