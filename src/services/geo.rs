//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.4;

/// Average truck speed in km/h for travel time estimation
pub const AVERAGE_SPEED_KMH: f64 = 60.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance from straight-line distance
pub fn road_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_distance(from, to) * ROAD_COEFFICIENT
}

/// Estimated road distance along consecutive waypoints
pub fn road_distance_along(points: &[Coordinates]) -> f64 {
    points
        .windows(2)
        .map(|pair| road_distance(&pair[0], &pair[1]))
        .sum()
}

/// Estimate travel time in hours for a road distance
pub fn travel_time_hours(distance_km: f64) -> f64 {
    distance_km / AVERAGE_SPEED_KMH
}

/// Point at `target_km` along a `[lat, lng]` polyline.
///
/// Walks the polyline by cumulative haversine length and interpolates
/// linearly inside the segment that contains the target. Targets at or
/// before the start snap to the first point, targets at or past
/// `total_km` (or past the end of the geometry) snap to the last point.
/// An empty geometry yields `(0, 0)`.
pub fn interpolate_point_on_route(geometry: &[[f64; 2]], total_km: f64, target_km: f64) -> Coordinates {
    let (first, last) = match (geometry.first(), geometry.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Coordinates::new(0.0, 0.0),
    };

    if target_km <= 0.0 {
        return Coordinates::new(first[0], first[1]);
    }
    if target_km >= total_km {
        return Coordinates::new(last[0], last[1]);
    }

    let mut cumulative = 0.0;
    for pair in geometry.windows(2) {
        let a = Coordinates::new(pair[0][0], pair[0][1]);
        let b = Coordinates::new(pair[1][0], pair[1][1]);
        let segment = haversine_distance(&a, &b);

        if cumulative + segment >= target_km {
            let fraction = if segment > 0.0 {
                (target_km - cumulative) / segment
            } else {
                0.0
            };
            return Coordinates::new(
                a.lat + fraction * (b.lat - a.lat),
                a.lng + fraction * (b.lng - a.lng),
            );
        }
        cumulative += segment;
    }

    Coordinates::new(last[0], last[1])
}
