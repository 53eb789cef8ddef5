use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Address fields preferred as a point-of-interest label, checked in order.
const POI_KEYS: [&str; 10] = [
    "amenity", "restaurant", "cafe", "shop", "tourism", "leisure", "station", "railway",
    "aeroway", "building",
];

/// Resolves coordinates to human-readable location labels. Failures are
/// always non-fatal to the caller: a trip saves with "Unknown" labels.
pub trait Geocoder {
    fn lookup(
        &self,
        lat: f64,
        lng: f64,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub display_name: String,
    #[serde(default)]
    pub address: HashMap<String, String>,
}

/// Nominatim-style reverse geocoding client.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, lat: f64, lng: f64) -> Result<String> {
        let url = format!(
            "{}/reverse?format=json&lat={lat}&lon={lng}&zoom=18&addressdetails=1",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "tripmeter")
            .send()
            .await
            .map_err(|e| anyhow!("reverse geocoding request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("reverse geocoding error: {}", response.status()));
        }

        let body: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse geocoding response: {e}"))?;
        Ok(format_location_name(&body))
    }
}

/// Pick the most meaningful label from a reverse-geocode response:
/// a point of interest, else road (plus house number), else the city,
/// else the first comma-delimited token of the display name.
pub fn format_location_name(response: &ReverseGeocodeResponse) -> String {
    let address = &response.address;

    for key in POI_KEYS {
        if let Some(name) = address.get(key) {
            if !name.is_empty() {
                return name.clone();
            }
        }
    }

    if let Some(road) = address.get("road") {
        return match address.get("house_number") {
            Some(number) => format!("{road} {number}"),
            None => road.clone(),
        };
    }

    for key in ["city", "town", "village"] {
        if let Some(city) = address.get(key) {
            return city.clone();
        }
    }

    response
        .display_name
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(display_name: &str, fields: &[(&str, &str)]) -> ReverseGeocodeResponse {
        ReverseGeocodeResponse {
            display_name: display_name.to_string(),
            address: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_poi_preferred_over_street_address() {
        let r = response(
            "Zur Letzten Instanz, Waisenstraße, Berlin",
            &[
                ("restaurant", "Zur Letzten Instanz"),
                ("road", "Waisenstraße"),
                ("house_number", "14"),
                ("city", "Berlin"),
            ],
        );
        assert_eq!(format_location_name(&r), "Zur Letzten Instanz");
    }

    #[test]
    fn test_road_and_house_number() {
        let r = response(
            "Waisenstraße 14, Berlin",
            &[
                ("road", "Waisenstraße"),
                ("house_number", "14"),
                ("city", "Berlin"),
            ],
        );
        assert_eq!(format_location_name(&r), "Waisenstraße 14");
    }

    #[test]
    fn test_road_without_house_number() {
        let r = response("Unter den Linden, Berlin", &[("road", "Unter den Linden")]);
        assert_eq!(format_location_name(&r), "Unter den Linden");
    }

    #[test]
    fn test_city_fallback() {
        let r = response("Berlin, Deutschland", &[("city", "Berlin")]);
        assert_eq!(format_location_name(&r), "Berlin");
        let r = response("Kleindorf, Deutschland", &[("village", "Kleindorf")]);
        assert_eq!(format_location_name(&r), "Kleindorf");
    }

    #[test]
    fn test_display_name_first_token_fallback() {
        let r = response("Tiergarten, Mitte, Berlin, Deutschland", &[]);
        assert_eq!(format_location_name(&r), "Tiergarten");
    }

    #[test]
    fn test_response_deserializes_without_address() {
        let r: ReverseGeocodeResponse =
            serde_json::from_str(r#"{ "display_name": "Somewhere, Earth" }"#).unwrap();
        assert!(r.address.is_empty());
        assert_eq!(format_location_name(&r), "Somewhere");
    }
}
