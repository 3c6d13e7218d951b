//! Elliptical fire growth geometry
//!
//! A point ignition under steady wind grows as an ellipse with the ignition
//! point at the rear focus (Anderson 1983; FBP ST-X-3 eqs. 79-90). The head
//! of the ellipse runs at the head ROS, the back at a fraction fixed by the
//! eccentricity, and any direction in between follows the polar equation of
//! the ellipse about its focus.

/// Length-to-breadth ratio of the fire ellipse.
///
/// FBP forest form `1 + 8.729 (1 − e^(−0.030 WSV))^2.155`; the grass types
/// use `1.1 WSV^0.464` (never below 1).
///
/// # Arguments
/// * `effective_wind_speed` - Net wind + slope-equivalent wind (km/h)
/// * `is_grass` - Use the grass form
pub fn length_to_breadth(effective_wind_speed: f32, is_grass: bool) -> f32 {
    let wsv = effective_wind_speed.max(0.0);
    if is_grass {
        if wsv < 1.0 {
            1.0
        } else {
            (1.1 * wsv.powf(0.464)).max(1.0)
        }
    } else {
        1.0 + 8.729 * (1.0 - (-0.030 * wsv).exp()).powf(2.155)
    }
}

/// Eccentricity of an ellipse with the given length-to-breadth ratio.
#[inline]
pub fn eccentricity(length_to_breadth: f32) -> f32 {
    let lb = length_to_breadth.max(1.0);
    (1.0 - 1.0 / (lb * lb)).max(0.0).sqrt()
}

/// Spread rate in a direction `angle` radians off the head bearing.
///
/// `r(θ) = ROS (1 − e) / (1 − e cos θ)`, so `r(0) = ROS` and
/// `r(π) = ROS (1 − e) / (1 + e)`.
#[inline]
pub fn directional_rate(head_ros: f32, length_to_breadth: f32, angle: f32) -> f32 {
    let e = eccentricity(length_to_breadth);
    head_ros * (1.0 - e) / (1.0 - e * angle.cos())
}

/// Backing fire rate of spread.
#[inline]
pub fn back_rate(head_ros: f32, length_to_breadth: f32) -> f32 {
    let e = eccentricity(length_to_breadth);
    head_ros * (1.0 - e) / (1.0 + e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_calm_wind_is_circular() {
        let lb = length_to_breadth(0.0, false);
        assert_relative_eq!(lb, 1.0);
        assert_relative_eq!(eccentricity(lb), 0.0);
        assert_relative_eq!(directional_rate(5.0, lb, PI), 5.0);
    }

    #[test]
    fn test_lb_grows_with_wind() {
        let mut last = 0.0;
        for ws in [0.0_f32, 10.0, 20.0, 40.0, 80.0] {
            let lb = length_to_breadth(ws, false);
            assert!(lb >= last);
            last = lb;
        }
        // 8.729 + 1 is the asymptote
        assert!(last < 9.73);
    }

    #[test]
    fn test_head_and_back_rates() {
        let lb = length_to_breadth(30.0, false);
        assert_relative_eq!(directional_rate(10.0, lb, 0.0), 10.0, epsilon = 1e-4);
        assert_relative_eq!(
            directional_rate(10.0, lb, PI),
            back_rate(10.0, lb),
            epsilon = 1e-4
        );
        assert!(back_rate(10.0, lb) < directional_rate(10.0, lb, PI / 2.0));
    }

    #[test]
    fn test_grass_form() {
        assert_relative_eq!(length_to_breadth(0.5, true), 1.0);
        // 1.1 × 20^0.464 ≈ 4.416
        assert_relative_eq!(length_to_breadth(20.0, true), 4.416, epsilon = 0.01);
    }
}
