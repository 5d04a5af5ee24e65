//! Geographic helpers
//!
//! Great-circle distance for the delivery-radius check.

/// Mean earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points (haversine formula), in km
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
