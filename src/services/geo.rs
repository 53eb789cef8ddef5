//! Pure geospatial math: great-circle distance, bearings and the
//! speed-to-color mapping used for route rendering.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers (haversine).
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Travel bearing from the previous coordinate to the current one,
/// in degrees within (-180, 180].
///
/// Deliberately the flat-plane `atan2(dlng, dlat)` approximation: at route
/// sampling distances (~100 m) it is indistinguishable from the great-circle
/// bearing and much cheaper.
pub fn bearing_degrees(prev_lat: f64, prev_lng: f64, lat: f64, lng: f64) -> f64 {
    let degrees = (lng - prev_lng).atan2(lat - prev_lat).to_degrees();
    normalize_degrees(degrees)
}

/// Circular difference `b - a` normalized to (-180, 180].
pub fn bearing_delta(a: f64, b: f64) -> f64 {
    normalize_degrees(b - a)
}

fn normalize_degrees(degrees: f64) -> f64 {
    let mut d = degrees % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// An RGB color.
pub type Rgb = (u8, u8, u8);

/// Color stages for speed rendering. White at standstill through the
/// speedometer gradient palette up to purple at 300 km/h.
const SPEED_STAGES: [(f64, Rgb); 8] = [
    (0.0, (255, 255, 255)),
    (30.0, (0, 212, 255)),
    (60.0, (0, 255, 136)),
    (100.0, (255, 215, 0)),
    (150.0, (255, 107, 107)),
    (200.0, (255, 0, 0)),
    (250.0, (200, 0, 200)),
    (300.0, (128, 0, 128)),
];

/// Map a speed in km/h to a display color.
///
/// Linear interpolation per channel between the two bracketing stages;
/// clamps below 0 km/h to the first stage and above 300 km/h to the last.
pub fn speed_color(speed_kmh: f64) -> Rgb {
    let (first_speed, first_color) = SPEED_STAGES[0];
    if !speed_kmh.is_finite() || speed_kmh <= first_speed {
        return first_color;
    }
    let (last_speed, last_color) = SPEED_STAGES[SPEED_STAGES.len() - 1];
    if speed_kmh >= last_speed {
        return last_color;
    }

    for window in SPEED_STAGES.windows(2) {
        let (lo_speed, lo) = window[0];
        let (hi_speed, hi) = window[1];
        if speed_kmh <= hi_speed {
            let t = (speed_kmh - lo_speed) / (hi_speed - lo_speed);
            return (
                lerp_channel(lo.0, hi.0, t),
                lerp_channel(lo.1, hi.1, t),
                lerp_channel(lo.2, hi.2, t),
            );
        }
    }
    last_color
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (52.5200, 13.4050, 48.1351, 11.5820),
            (40.7128, -74.0060, 34.0522, -118.2437),
            (-33.8688, 151.2093, 35.6762, 139.6503),
        ];
        for (lat1, lng1, lat2, lng2) in pairs {
            let forward = distance_km(lat1, lng1, lat2, lng2);
            let backward = distance_km(lat2, lng2, lat1, lng1);
            assert!((forward - backward).abs() < 1e-9);
            assert!(forward >= 0.0);
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_km(52.52, 13.405, 52.52, 13.405), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // Berlin Alexanderplatz area, ~87.6 m apart
        let d = distance_km(52.5200, 13.4050, 52.5205, 13.4060);
        assert!((d - 0.0876).abs() < 0.0005, "got {d}");
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        // Due north: dlat > 0, dlng = 0
        assert!((bearing_degrees(52.0, 13.0, 52.1, 13.0) - 0.0).abs() < 1e-9);
        // Due east
        assert!((bearing_degrees(52.0, 13.0, 52.0, 13.1) - 90.0).abs() < 1e-9);
        // Due south
        assert!((bearing_degrees(52.0, 13.0, 51.9, 13.0) - 180.0).abs() < 1e-9);
        // Due west
        assert!((bearing_degrees(52.0, 13.0, 52.0, 12.9) - (-90.0)).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_delta_wraps_around() {
        assert!((bearing_delta(170.0, -170.0) - 20.0).abs() < 1e-9);
        assert!((bearing_delta(-170.0, 170.0) - (-20.0)).abs() < 1e-9);
        assert!((bearing_delta(10.0, 55.0) - 45.0).abs() < 1e-9);
        assert_eq!(bearing_delta(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_speed_color_endpoints() {
        assert_eq!(speed_color(0.0), (255, 255, 255));
        assert_eq!(speed_color(300.0), (128, 0, 128));
    }

    #[test]
    fn test_speed_color_clamps() {
        assert_eq!(speed_color(-10.0), speed_color(0.0));
        assert_eq!(speed_color(400.0), speed_color(300.0));
    }

    #[test]
    fn test_speed_color_interpolates_between_stages() {
        // Halfway between white (0) and #00d4ff (30)
        assert_eq!(speed_color(15.0), (128, 234, 255));
        // Exactly on a stage boundary
        assert_eq!(speed_color(60.0), (0, 255, 136));
    }
}
