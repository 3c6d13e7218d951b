//! FBP fire behavior calculator
//!
//! Pure mapping from (fuel type, fire weather, wind, terrain) to head-fire
//! rate of spread, fireline intensity and crown involvement. Nothing here
//! touches shared state, so realizations call it freely from worker threads.
//!
//! # Calculation Order
//!
//! 1. f(F) from FFMC (values above 101 are clamped and flagged)
//! 2. Slope factor → slope-equivalent wind, added to the wind as vectors
//! 3. ISI from the net effective wind
//! 4. Fuel-specific initial spread rate (RSI)
//! 5. Buildup effect (capped, see [`buildup_effect`]) → head ROS
//! 6. Surface consumption, crown fraction burned, total consumption
//! 7. Byram intensity I = 300 × TFC × ROS
//! 8. Ellipse shape (length-to-breadth) and backing spread rate
//!
//! # Scientific References
//! - Forestry Canada Fire Danger Group (1992). ST-X-3
//! - Wotton, B.M., Alexander, M.E., Taylor, S.W. (2009). GLC-X-10

use serde::{Deserialize, Serialize};

use super::crown_fire::{calculate_crown_fire_behavior, CrownFireType};
use super::terrain_physics::{
    bearing_vector, calculate_slope_factor, slope_equivalent_wind, upslope_bearing, vector_bearing,
};
use crate::core_types::diagnostics::BehaviorFlags;
use crate::core_types::fuel::{CanopyProperties, FuelCoefficients, FuelModifiers, FuelType};
use crate::core_types::weather::{
    moisture_function, wind_function, WeatherState, EXTREME_BUILDUP, FFMC_MAX, NOMINAL_WIND_MAX,
};
use crate::solver::ellipse::{back_rate, length_to_breadth};

/// Buildup above which the effect term is evaluated at the cap
pub const BUILDUP_CAP: f32 = 80.0;

/// Buildup beyond which the linear extension stops growing
pub const BUILDUP_EXTENSION_LIMIT: f32 = 300.0;

/// Buildup values below this are treated as this value
pub const BUILDUP_FLOOR: f32 = 1.0;

/// Heat of combustion over 60 s/min: 18 000 kJ/kg / 60
const INTENSITY_CONSTANT: f32 = 300.0;

/// Wind at a point (km/h, direction blowing from).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f32,
    pub direction: f32,
}

impl From<&WeatherState> for Wind {
    fn from(weather: &WeatherState) -> Self {
        Self {
            speed: weather.wind_speed,
            direction: weather.wind_direction,
        }
    }
}

/// Local terrain seen by the calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Ground slope (percent)
    pub slope: f32,
    /// Downslope direction (degrees)
    pub aspect: f32,
}

/// Parameters shared by every evaluation in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorParams {
    pub modifiers: FuelModifiers,
    /// Foliar moisture content (%)
    pub foliar_moisture: f32,
    /// Calibration multiplier on head ROS
    pub ros_multiplier: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            modifiers: FuelModifiers::default(),
            foliar_moisture: 97.0,
            ros_multiplier: 1.0,
        }
    }
}

/// Fire behavior for one cell over one time step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireBehaviorResult {
    ros: f32,
    back_ros: f32,
    length_to_breadth: f32,
    intensity: f32,
    surface_intensity: f32,
    crown_fraction_burned: f32,
    fire_type: CrownFireType,
    total_fuel_consumption: f32,
    effective_wind_speed: f32,
    head_bearing: f32,
    buildup_effect: f32,
    flags: BehaviorFlags,
}

impl FireBehaviorResult {
    /// Head fire rate of spread (m/min)
    pub fn ros(&self) -> f32 {
        self.ros
    }

    /// Backing fire rate of spread (m/min)
    pub fn back_ros(&self) -> f32 {
        self.back_ros
    }

    /// Length-to-breadth ratio of the fire ellipse
    pub fn length_to_breadth(&self) -> f32 {
        self.length_to_breadth
    }

    /// Head fire intensity (kW/m)
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Intensity of the surface fire alone (kW/m)
    pub fn surface_intensity(&self) -> f32 {
        self.surface_intensity
    }

    pub fn crown_fraction_burned(&self) -> f32 {
        self.crown_fraction_burned
    }

    pub fn fire_type(&self) -> CrownFireType {
        self.fire_type
    }

    /// Total fuel consumption (kg/m²)
    pub fn total_fuel_consumption(&self) -> f32 {
        self.total_fuel_consumption
    }

    /// Net wind + slope-equivalent wind speed (km/h)
    pub fn effective_wind_speed(&self) -> f32 {
        self.effective_wind_speed
    }

    /// Bearing the head fire runs toward (degrees)
    pub fn head_bearing(&self) -> f32 {
        self.head_bearing
    }

    pub fn buildup_effect(&self) -> f32 {
        self.buildup_effect
    }

    pub fn flags(&self) -> BehaviorFlags {
        self.flags
    }

    /// True when every quantity is finite.
    pub fn is_finite(&self) -> bool {
        self.ros.is_finite()
            && self.back_ros.is_finite()
            && self.intensity.is_finite()
            && self.crown_fraction_burned.is_finite()
            && self.effective_wind_speed.is_finite()
            && self.head_bearing.is_finite()
    }

    /// Name of the first non-finite quantity, if any.
    pub fn non_finite_quantity(&self) -> Option<&'static str> {
        [
            ("rate_of_spread", self.ros),
            ("back_rate_of_spread", self.back_ros),
            ("intensity", self.intensity),
            ("crown_fraction_burned", self.crown_fraction_burned),
            ("effective_wind_speed", self.effective_wind_speed),
            ("head_bearing", self.head_bearing),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Uncapped FBP buildup effect, evaluated in f64.
fn raw_buildup_effect(coefficients: &FuelCoefficients, bui: f64) -> f64 {
    let q = f64::from(coefficients.q);
    let bui0 = f64::from(coefficients.bui0);
    (50.0 * q.ln() * (1.0 / bui - 1.0 / bui0)).exp()
}

/// Buildup effect multiplier on spread rate.
///
/// `BE(b) = exp(50 ln q (1/b − 1/BUI0))` (ST-X-3 eq. 54) for
/// `1 ≤ b ≤ 80`. Above the cap the curve continues along its tangent at 80,
/// so the effect stays continuous, keeps its slope, and never decreases as
/// buildup grows. The extension stops growing at 300 and never exceeds the
/// curve's own limit `exp(−50 ln q / BUI0)` as buildup goes to infinity.
///
/// # Returns
/// The multiplier and whether the capped path was taken
pub fn buildup_effect(coefficients: &FuelCoefficients, bui: f32) -> (f32, bool) {
    if coefficients.q >= 1.0 {
        return (1.0, false);
    }
    let bui = f64::from(bui.max(BUILDUP_FLOOR));
    let cap = f64::from(BUILDUP_CAP);
    if bui <= cap {
        return (raw_buildup_effect(coefficients, bui) as f32, false);
    }

    let at_cap = raw_buildup_effect(coefficients, cap);
    // d/db exp(50 ln q (1/b − 1/b0)) = −50 ln q / b² × BE(b)
    let slope = -50.0 * f64::from(coefficients.q).ln() / (cap * cap) * at_cap;
    let extension = bui.min(f64::from(BUILDUP_EXTENSION_LIMIT)) - cap;
    let asymptote = raw_buildup_effect(coefficients, f64::INFINITY);
    ((at_cap + slope * extension).min(asymptote) as f32, true)
}

/// Calculate fire behavior for one cell.
///
/// # Arguments
/// * `fuel` - FBP fuel type of the cell
/// * `weather` - Fire weather for the current step (FFMC and BUI are used)
/// * `wind` - Wind at the cell
/// * `terrain` - Slope and aspect at the cell
/// * `canopy` - Canopy attributes; `None` forces a surface fire
/// * `params` - Run-wide modifiers and calibration
pub fn calculate_fire_behavior(
    fuel: FuelType,
    weather: &WeatherState,
    wind: Wind,
    terrain: Terrain,
    canopy: Option<&CanopyProperties>,
    params: &BehaviorParams,
) -> FireBehaviorResult {
    let coefficients = fuel.coefficients();
    let mut flags = BehaviorFlags {
        ffmc_out_of_range: weather.ffmc > FFMC_MAX,
        wind_out_of_range: wind.speed > NOMINAL_WIND_MAX,
        extreme_buildup: weather.bui > EXTREME_BUILDUP,
        ..BehaviorFlags::default()
    };
    let ffmc = weather.ffmc.clamp(0.0, FFMC_MAX);
    let wind_speed = wind.speed.max(0.0);

    // Slope as an equivalent wind along the upslope bearing
    let (slope_factor, slope_capped) = calculate_slope_factor(terrain.slope);
    flags.slope_capped = slope_capped;
    let wse = slope_equivalent_wind(slope_factor);

    let downwind = (wind.direction + 180.0).rem_euclid(360.0);
    let net = bearing_vector(downwind) * wind_speed
        + bearing_vector(upslope_bearing(terrain.aspect)) * wse;
    let effective_wind_speed = net.norm();
    let head_bearing = if effective_wind_speed > 1e-3 {
        vector_bearing(&net)
    } else {
        downwind
    };

    let isi = 0.208 * wind_function(effective_wind_speed) * moisture_function(ffmc);
    let rsi = fuel.initial_rate_of_spread(isi, &params.modifiers);

    let (be, capped) = buildup_effect(coefficients, weather.bui);
    flags.buildup_capped = capped;
    let ros = (rsi * be * params.ros_multiplier).max(0.0);

    let sfc = fuel.surface_fuel_consumption(ffmc, weather.bui, &params.modifiers);
    let surface_intensity = INTENSITY_CONSTANT * sfc * ros;

    let crown = calculate_crown_fire_behavior(canopy, surface_intensity, sfc, params.foliar_moisture);
    let crown_fraction_burned = crown.crown_fraction_burned();
    let crown_fuel_load = canopy.map_or(0.0, |c| c.crown_fuel_load);
    let total_fuel_consumption = sfc + crown_fraction_burned * crown_fuel_load;
    let lb = length_to_breadth(effective_wind_speed, fuel.is_grass());

    FireBehaviorResult {
        ros,
        back_ros: back_rate(ros, lb),
        length_to_breadth: lb,
        intensity: INTENSITY_CONSTANT * total_fuel_consumption * ros,
        surface_intensity,
        crown_fraction_burned,
        fire_type: crown.fire_type(),
        total_fuel_consumption,
        effective_wind_speed,
        head_bearing,
        buildup_effect: be,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat() -> Terrain {
        Terrain::default()
    }

    fn evaluate(fuel: FuelType, weather: &WeatherState) -> FireBehaviorResult {
        calculate_fire_behavior(
            fuel,
            weather,
            Wind::from(weather),
            flat(),
            fuel.coefficients().canopy.as_ref(),
            &BehaviorParams::default(),
        )
    }

    #[test]
    fn test_buildup_effect_continuous_at_cap() {
        let c = FuelType::C2.coefficients();
        let (below, capped_below) = buildup_effect(c, BUILDUP_CAP);
        let (above, capped_above) = buildup_effect(c, BUILDUP_CAP + 1e-3);
        assert!(!capped_below);
        assert!(capped_above);
        assert_relative_eq!(below, above, epsilon = 1e-4);
    }

    #[test]
    fn test_buildup_effect_reference_value() {
        // C2 at BUI0 = 64 has BE = 1
        let (be, _) = buildup_effect(FuelType::C2.coefficients(), 64.0);
        assert_relative_eq!(be, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_buildup_extension_is_bounded() {
        let c = FuelType::C2.coefficients();
        let (at_limit, _) = buildup_effect(c, BUILDUP_EXTENSION_LIMIT);
        let (far_beyond, _) = buildup_effect(c, 10_000.0);
        assert_eq!(at_limit, far_beyond);
    }

    #[test]
    fn test_buildup_extension_stays_under_fbp_limit() {
        for fuel in FuelType::ALL {
            let c = fuel.coefficients();
            let limit = (-50.0 * c.q.ln() / c.bui0).exp();
            let mut previous = 0.0;
            for bui in [60.0, 80.0, 120.0, 160.0, 200.0, 300.0, 1000.0] {
                let (be, _) = buildup_effect(c, bui);
                assert!(be <= limit * 1.0001, "{:?}: BE({bui}) = {be} > {limit}", fuel);
                assert!(be >= previous, "{:?}: BE dropped at {bui}", fuel);
                previous = be;
            }
        }
        // C2 saturates well before the extension limit
        let c = FuelType::C2.coefficients();
        let (be, _) = buildup_effect(c, BUILDUP_EXTENSION_LIMIT);
        assert_relative_eq!(be, (-50.0 * c.q.ln() / c.bui0).exp(), epsilon = 1e-4);
    }

    #[test]
    fn test_grass_has_no_buildup_effect() {
        let (be, capped) = buildup_effect(FuelType::O1a.coefficients(), 250.0);
        assert_eq!(be, 1.0);
        assert!(!capped);
    }

    #[test]
    fn test_c2_extreme_buildup_high_wind() {
        // Regression: the uncapped effect once pushed this case toward zero
        let weather = WeatherState::with_buildup(90.0, 160.0, 50.0, 270.0);
        let result = evaluate(FuelType::C2, &weather);
        assert!(result.ros() > 50.0, "ROS was {}", result.ros());
        assert!(result.flags().extreme_buildup);
        assert!(result.flags().buildup_capped);
    }

    #[test]
    fn test_head_fire_runs_downwind_on_flat_ground() {
        let weather = WeatherState::with_buildup(90.0, 60.0, 20.0, 270.0);
        let result = evaluate(FuelType::C2, &weather);
        assert_relative_eq!(result.head_bearing(), 90.0, epsilon = 1e-3);
        assert_relative_eq!(result.effective_wind_speed(), 20.0, epsilon = 1e-3);
        assert!(result.length_to_breadth() > 1.0);
        assert!(result.back_ros() < result.ros());
    }

    #[test]
    fn test_upslope_spread_is_faster() {
        let weather = WeatherState::with_buildup(90.0, 60.0, 10.0, 180.0);
        let params = BehaviorParams::default();
        let flat_result = calculate_fire_behavior(
            FuelType::C2,
            &weather,
            Wind::from(&weather),
            flat(),
            None,
            &params,
        );
        // Wind blows toward north; the slope faces south so upslope is north
        let slope_result = calculate_fire_behavior(
            FuelType::C2,
            &weather,
            Wind::from(&weather),
            Terrain {
                slope: 30.0,
                aspect: 180.0,
            },
            None,
            &params,
        );
        assert!(slope_result.ros() > flat_result.ros());
        assert_relative_eq!(slope_result.head_bearing(), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_missing_canopy_gives_surface_fire() {
        let weather = WeatherState::with_buildup(94.0, 120.0, 40.0, 0.0);
        let result = calculate_fire_behavior(
            FuelType::C2,
            &weather,
            Wind::from(&weather),
            flat(),
            None,
            &BehaviorParams::default(),
        );
        assert_eq!(result.fire_type(), CrownFireType::Surface);
        assert_eq!(result.crown_fraction_burned(), 0.0);
        assert_relative_eq!(result.intensity(), result.surface_intensity());
    }

    #[test]
    fn test_severe_c2_conditions_crown() {
        let weather = WeatherState::with_buildup(94.0, 120.0, 40.0, 0.0);
        let result = evaluate(FuelType::C2, &weather);
        assert_eq!(result.fire_type(), CrownFireType::Active);
        assert!(result.intensity() > result.surface_intensity());
    }

    #[test]
    fn test_ffmc_above_scale_is_flagged_not_fatal() {
        let weather = WeatherState::with_buildup(105.0, 60.0, 20.0, 0.0);
        let result = evaluate(FuelType::C2, &weather);
        assert!(result.flags().ffmc_out_of_range);
        assert!(result.is_finite());
    }

    #[test]
    fn test_ros_multiplier_scales_spread() {
        let weather = WeatherState::with_buildup(90.0, 60.0, 20.0, 0.0);
        let base = evaluate(FuelType::C3, &weather);
        let params = BehaviorParams {
            ros_multiplier: 2.0,
            ..BehaviorParams::default()
        };
        let boosted = calculate_fire_behavior(
            FuelType::C3,
            &weather,
            Wind::from(&weather),
            flat(),
            FuelType::C3.coefficients().canopy.as_ref(),
            &params,
        );
        assert_relative_eq!(boosted.ros(), 2.0 * base.ros(), max_relative = 1e-5);
    }
}
