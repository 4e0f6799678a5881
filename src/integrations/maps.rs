//! Google Distance Matrix lookup for job-site travel

use super::{http_client, response_text};
use crate::error::{EstimatorError, Result};
use estimator_common::SiteCosts;
use reqwest::Client;
use serde::Deserialize;

const SERVICE: &str = "Google Maps";
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const METERS_PER_MILE: f64 = 1609.344;

/// One-way driving distance and time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub miles: f64,
    pub hours: f64,
}

impl RouteEstimate {
    /// Fill travel costs for `trips` round trips. Mileage and drive time are
    /// both stored per trip, so each is doubled for the way back.
    pub fn apply_to(&self, site: &mut SiteCosts, trips: f64) {
        site.mileage.miles = self.miles * 2.0;
        site.mileage.trips = trips;
        site.drive_time.hours = self.hours * 2.0;
        site.drive_time.trips = trips;
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixValue>,
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    /// Meters for distance, seconds for duration
    value: f64,
}

fn api_error(reason: impl Into<String>) -> EstimatorError {
    EstimatorError::Api {
        service: SERVICE,
        reason: reason.into(),
    }
}

pub fn parse_distance_matrix(json: &str) -> Result<RouteEstimate> {
    let response: MatrixResponse = serde_json::from_str(json)?;
    if response.status != "OK" {
        let detail = response.error_message.unwrap_or_default();
        return Err(api_error(format!("{} {}", response.status, detail).trim().to_string()));
    }

    let element = response
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| api_error("response has no route"))?;

    if element.status != "OK" {
        return Err(api_error(format!("no route found ({})", element.status)));
    }

    match (element.distance, element.duration) {
        (Some(distance), Some(duration)) => Ok(RouteEstimate {
            miles: distance.value / METERS_PER_MILE,
            hours: duration.value / 3600.0,
        }),
        _ => Err(api_error("route is missing distance or duration")),
    }
}

pub struct MapsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MapsClient {
    pub fn new(api_key: String, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn route(&self, origin: &str, destination: &str) -> Result<RouteEstimate> {
        tracing::debug!("Distance Matrix request: {} -> {}", origin, destination);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("units", "imperial"),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Distance Matrix request failed: {}", e);
                e
            })?;

        let text = response_text(SERVICE, response).await?;
        parse_distance_matrix(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_RESPONSE: &str = r#"{
        "destination_addresses": ["12 Harbor Rd, Clearwater, FL"],
        "origin_addresses": ["410 Industrial Pkwy, Tampa, FL"],
        "rows": [{
            "elements": [{
                "distance": {"text": "20.0 mi", "value": 32186.88},
                "duration": {"text": "45 mins", "value": 2700},
                "status": "OK"
            }]
        }],
        "status": "OK"
    }"#;

    #[test]
    fn test_parse_distance_matrix() {
        let route = parse_distance_matrix(OK_RESPONSE).unwrap();
        assert!((route.miles - 20.0).abs() < 1e-9);
        assert_eq!(route.hours, 0.75);
    }

    #[test]
    fn test_parse_request_denied() {
        let json = r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "rows": []}"#;
        let err = parse_distance_matrix(json).unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_parse_no_route() {
        let json = r#"{"status": "OK", "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]}"#;
        let err = parse_distance_matrix(json).unwrap_err();
        assert!(err.to_string().contains("ZERO_RESULTS"));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_distance_matrix("<html>"),
            Err(EstimatorError::JsonParse(_))
        ));
    }

    #[test]
    fn test_apply_to_round_trips() {
        let mut site = SiteCosts::default();
        RouteEstimate { miles: 35.0, hours: 0.75 }.apply_to(&mut site, 3.0);
        assert_eq!(site.mileage.miles, 70.0);
        assert_eq!(site.mileage.trips, 3.0);
        assert_eq!(site.drive_time.hours, 1.5);
        assert_eq!(site.drive_time.trips, 3.0);
        // crew size is left to the estimator
        assert_eq!(site.drive_time.people, 0.0);
    }
}
