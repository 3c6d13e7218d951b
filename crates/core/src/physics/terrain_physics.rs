//! Terrain slope effects on fire spread rate.
//!
//! Fire spreads faster uphill because flames lean toward and preheat the
//! upslope fuel. The FBP System expresses this as a spread factor applied to
//! the zero-wind spread index, converted to an equivalent wind speed so that
//! slope and wind can be added as vectors.
//!
//! # References
//!
//! - Van Wagner, C.E. (1977). "Effect of slope on fire spread rate".
//!   Canadian Forestry Service Bi-monthly Research Notes 33, 7-8.
//! - Forestry Canada Fire Danger Group (1992). ST-X-3, equations 39-44.
//! - Horn, B.K.P. (1981). "Hill Shading and the Reflectance Map."

use nalgebra::Vector2;

/// Slopes steeper than this (percent) are treated as 60%
pub const MAX_EFFECTIVE_SLOPE: f32 = 60.0;

/// Calculate the slope spread factor.
///
/// SF = exp(3.533 × (GS/100)^1.2), GS capped at 60%.
///
/// # Returns
/// The multiplier (≥ 1) and whether the slope was capped
pub fn calculate_slope_factor(slope_percent: f32) -> (f32, bool) {
    let capped = slope_percent > MAX_EFFECTIVE_SLOPE;
    let gs = slope_percent.clamp(0.0, MAX_EFFECTIVE_SLOPE);
    ((3.533 * (gs / 100.0).powf(1.2)).exp(), capped)
}

/// Invert the FWI wind function: the wind speed (km/h) whose f(W) equals
/// `factor`. Used to turn a slope factor into a slope-equivalent wind.
pub fn slope_equivalent_wind(factor: f32) -> f32 {
    if factor <= 1.0 {
        return 0.0;
    }
    // f(W) at 40 km/h; above it the saturating form applies
    let f40 = (0.05039_f32 * 40.0).exp();
    if factor <= f40 {
        factor.ln() / 0.05039
    } else {
        let ratio = (factor / 12.0).min(0.999);
        28.0 - (1.0 - ratio).ln() / 0.0818
    }
}

/// Unit vector pointing along a compass bearing (x = east, y = north).
#[inline]
pub fn bearing_vector(bearing_deg: f32) -> Vector2<f32> {
    let rad = bearing_deg.to_radians();
    Vector2::new(rad.sin(), rad.cos())
}

/// Compass bearing (0-360, 0 = north, clockwise) of a vector.
#[inline]
pub fn vector_bearing(v: &Vector2<f32>) -> f32 {
    v.x.atan2(v.y).to_degrees().rem_euclid(360.0)
}

/// Upslope bearing from an aspect (aspect faces downslope).
#[inline]
pub fn upslope_bearing(aspect_deg: f32) -> f32 {
    (aspect_deg + 180.0).rem_euclid(360.0)
}

/// Slope (percent) and aspect (degrees) at the centre of a 3×3 elevation
/// window using Horn's method.
///
/// `z` is ordered north row first: NW, N, NE, W, C, E, SW, S, SE.
pub fn horn_slope_aspect(z: &[f32; 9], cell_size: f32) -> (f32, f32) {
    let d = cell_size.max(f32::EPSILON);
    // Gradient toward east and toward north
    let dz_east = ((z[2] + 2.0 * z[5] + z[8]) - (z[0] + 2.0 * z[3] + z[6])) / (8.0 * d);
    let dz_north = ((z[0] + 2.0 * z[1] + z[2]) - (z[6] + 2.0 * z[7] + z[8])) / (8.0 * d);

    let slope_percent = 100.0 * (dz_east * dz_east + dz_north * dz_north).sqrt();
    if slope_percent < 1e-6 {
        return (0.0, 0.0);
    }
    // Aspect is the direction of steepest descent
    let aspect = vector_bearing(&Vector2::new(-dz_east, -dz_north));
    (slope_percent, aspect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_ground_has_unit_factor() {
        let (sf, capped) = calculate_slope_factor(0.0);
        assert!((sf - 1.0).abs() < 1e-6);
        assert!(!capped);
    }

    #[test]
    fn test_slope_factor_caps_at_sixty_percent() {
        let (sf60, _) = calculate_slope_factor(60.0);
        let (sf90, capped) = calculate_slope_factor(90.0);
        assert!(capped);
        assert_eq!(sf60, sf90);
        // exp(3.533 × 0.6^1.2) ≈ 6.78
        assert!((sf60 - 6.78).abs() < 0.05, "SF was {}", sf60);
    }

    #[test]
    fn test_slope_equivalent_wind_inverts_wind_function() {
        let wse = slope_equivalent_wind((0.05039_f32 * 25.0).exp());
        assert!((wse - 25.0).abs() < 0.01, "WSE was {}", wse);
        assert_eq!(slope_equivalent_wind(1.0), 0.0);
    }

    #[test]
    fn test_bearing_round_trip() {
        for bearing in [0.0_f32, 45.0, 90.0, 200.0, 359.0] {
            let back = vector_bearing(&bearing_vector(bearing));
            assert!((back - bearing).abs() < 1e-3, "{} -> {}", bearing, back);
        }
    }

    #[test]
    fn test_horn_east_facing_slope() {
        // Elevation falls toward the east by 10 m per 100 m cell
        let z = [20.0, 10.0, 0.0, 20.0, 10.0, 0.0, 20.0, 10.0, 0.0];
        let (slope, aspect) = horn_slope_aspect(&z, 100.0);
        assert!((slope - 10.0).abs() < 1e-3, "slope {}", slope);
        assert!((aspect - 90.0).abs() < 1e-3, "aspect {}", aspect);
    }
}
