//! Geographic positions attached to traces.

/// WGS-84 position in fractional degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

const EARTH_RADIUS_M: f64 = 6_371_008.8;

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance to another position, in meters.
    pub fn distance_m(&self, other: &LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    pub fn is_valid_latitude(lat: f64) -> bool {
        if lat.is_nan() {
            return false;
        }
        let abs = lat.abs();
        abs > 1e-6 && abs <= 90.0
    }

    pub fn is_valid_longitude(lon: f64) -> bool {
        if lon.is_nan() {
            return false;
        }
        let abs = lon.abs();
        abs > 1e-6 && abs <= 180.0
    }
}

/// Convert a ddmm.mmmm packed value, as stored in the trace headers, to
/// fractional degrees.
pub fn degrees_from_ddmm(org: f64) -> f64 {
    let org = org / 100.0;
    let dgr = org.trunc();
    let fract = org - dgr;
    dgr + fract / 60.0 * 100.0
}

/// Inverse of [`degrees_from_ddmm`], used when patching headers on save.
pub fn ddmm_from_degrees(org: f64) -> f64 {
    let dgr = org.trunc();
    let fr = org - dgr;
    100.0 * (dgr + fr * 60.0 / 100.0)
}
