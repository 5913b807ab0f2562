// ── Geofence evaluation ──
//
// Pure functions: safe to call on every fix. The boundary is
// inclusive -- a point at exactly the radius is inside.

use crate::model::{GeoPoint, DEFAULT_RADIUS_M};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points via the haversine formula.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Distance plus an inside/outside verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceVerdict {
    pub distance_m: f64,
    pub inside: bool,
}

/// Evaluate a point against a circular geofence.
///
/// A non-positive `radius_m` falls back to [`DEFAULT_RADIUS_M`].
pub fn evaluate(center: GeoPoint, point: GeoPoint, radius_m: f64) -> GeofenceVerdict {
    let radius_m = if radius_m > 0.0 {
        radius_m
    } else {
        DEFAULT_RADIUS_M
    };
    let distance_m = haversine_m(center, point);
    GeofenceVerdict {
        distance_m,
        inside: distance_m <= radius_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Meters-per-degree of latitude (R * pi / 180).
    const M_PER_DEG_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn offset_north(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.lat + meters / M_PER_DEG_LAT, p.lng)
    }

    #[test]
    fn same_point_is_inside_any_radius() {
        let c = GeoPoint::new(6.0, 7.0);
        for r in [0.0, 1.0, 60.0, 1_000.0] {
            let v = evaluate(c, c, r);
            assert_eq!(v.distance_m, 0.0);
            assert!(v.inside, "radius {r}");
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(6.0, 7.0);
        let b = GeoPoint::new(6.01, 7.02);
        let ab = haversine_m(a, b);
        let ba = haversine_m(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn boundary_is_inclusive_at_60m() {
        let center = GeoPoint::new(6.0, 7.0);

        let near = offset_north(center, 59.0);
        let v = evaluate(center, near, 60.0);
        assert!((v.distance_m - 59.0).abs() < 0.5);
        assert!(v.inside, "59 m must be inside a 60 m fence");

        let far = offset_north(center, 61.0);
        let v = evaluate(center, far, 60.0);
        assert!((v.distance_m - 61.0).abs() < 0.5);
        assert!(!v.inside, "61 m must be outside a 60 m fence");

        // Exactly on the boundary: inside, by contract. Use the computed
        // distance itself as the radius so the comparison is exact.
        let edge = offset_north(center, 60.0);
        let d = haversine_m(center, edge);
        assert!(evaluate(center, edge, d).inside);
    }

    #[test]
    fn zero_radius_falls_back_to_default() {
        let center = GeoPoint::new(6.0, 7.0);
        let near = offset_north(center, 59.0);
        assert!(evaluate(center, near, 0.0).inside);
        let far = offset_north(center, 61.0);
        assert!(!evaluate(center, far, 0.0).inside);
    }

    #[test]
    fn known_distance_sanity() {
        // One degree of latitude at the equator is ~111.19 km.
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        let d = haversine_m(a, b);
        assert!((d - 111_194.9).abs() < 10.0, "got {d}");
    }
}
