use serde::Deserialize;
use std::time::Duration;

const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Resolve coordinates to a human-readable address via Nominatim.
/// Best effort: every failure is logged and reported as `None`,
/// a check-in must never fail because the geocoder is down.
pub async fn reverse_geocode(user_agent: &str, latitude: f64, longitude: f64) -> Option<String> {
    let client = match reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(LOOKUP_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Failed to build geocoder client: {}", e);
            return None;
        }
    };

    let response = client
        .get(NOMINATIM_REVERSE_URL)
        .query(&[
            ("format", "jsonv2".to_string()),
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
        ])
        .send()
        .await;

    let response = match response.and_then(|r| r.error_for_status()) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Reverse geocode request failed: {}", e);
            return None;
        }
    };

    match response.json::<ReverseResponse>().await {
        Ok(body) => body.display_name,
        Err(e) => {
            log::warn!("Failed to parse geocoder response: {}", e);
            None
        }
    }
}
