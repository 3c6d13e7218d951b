//! Albini Spotting Distance Model (1979, 1983)
//!
//! Crown fires loft burning firebrands into the convection column; the wind
//! carries them downrange until they fall out at their terminal velocity.
//! Each ember is drawn from the realization's own random source, so a spot
//! fire pattern is reproducible from the realization seed alone.
//!
//! # Scientific References
//!
//! - Albini, F.A. (1979). "Spot fire distance from burning trees: a predictive model"
//!   USDA Forest Service Research Paper INT-56
//! - Albini, F.A. (1983). "Transport of firebrands by line thermals"
//!   Combustion Science and Technology, 32(5-6), 277-288
//! - Tarifa, C.S., del Notario, P.P., Moreno, F.G. (1965). "Transport and combustion of firebrands"
//!
//! # Model Overview
//!
//! 1. Lofting height from fireline intensity
//! 2. Wind speed at lofting height (power-law profile)
//! 3. Ember terminal velocity from a drag balance
//! 4. Transport distance and flight time from the three above
//! 5. Landing cell receptivity, fine fuel moisture and ember burnout decide
//!    the ignition probability

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::crown_fire::CrownFireType;
use super::fire_behavior::FireBehaviorResult;
use super::terrain_physics::bearing_vector;
use crate::core_types::weather::{fine_fuel_moisture, WeatherState};
use crate::grid::Landscape;

const AIR_DENSITY: f32 = 1.225; // kg/m³ at sea level
const DRAG_COEFFICIENT: f32 = 0.4; // Sphere approximation
const GRAVITY: f32 = 9.81; // m/s²

/// Ember mass range (kg)
const EMBER_MASS_RANGE: (f32, f32) = (0.0005, 0.003);
/// Ember characteristic diameter range (m)
const EMBER_DIAMETER_RANGE: (f32, f32) = (0.01, 0.04);
/// Fraction of the Albini distance an ember actually travels
const TRANSPORT_FRACTION_RANGE: (f32, f32) = (0.1, 1.0);

/// Fine fuel moisture (%) at which half of landed embers take hold
const HALF_IGNITION_MOISTURE: f32 = 20.0;
const IGNITION_MOISTURE_STEEPNESS: f32 = 0.25;

/// Spotting parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpottingParams {
    pub enabled: bool,
    /// Embers released per active-crown cell per step at CFB = 1
    pub embers_per_cell: f32,
    /// Longest transport distance (m)
    pub max_distance: f32,
    /// Half-width of the bearing jitter around the head direction (degrees)
    pub direction_jitter: f32,
    /// Ember burnout time constant τ (minutes)
    pub ember_burnout_time: f32,
}

impl Default for SpottingParams {
    fn default() -> Self {
        Self {
            enabled: true,
            embers_per_cell: 2.0,
            max_distance: 2000.0,
            direction_jitter: 15.0,
            ember_burnout_time: 5.0,
        }
    }
}

/// An ember in flight from a burning cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmberParticle {
    /// Index of the cell that released the ember
    pub origin: usize,
    /// Lofting height (m)
    pub loft_height: f32,
    /// Travel bearing (degrees)
    pub bearing: f32,
    /// Transport distance (m)
    pub distance: f32,
    /// Time aloft (minutes)
    pub flight_time: f32,
    /// Landing point (east, north) in metres
    pub landing_position: (f32, f32),
}

/// An ember that came down on burnable fuel inside the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmberLanding {
    pub cell: usize,
    /// Minutes after release
    pub flight_time: f32,
    pub ignition_probability: f32,
}

/// Calculate ember lofting height based on fireline intensity
///
/// Albini (1979): H = 12.2 × I^0.4
///
/// # Arguments
/// * `fireline_intensity` - Byram's fireline intensity (kW/m)
///
/// # Returns
/// Lofting height in meters
pub fn calculate_lofting_height(fireline_intensity: f32) -> f32 {
    if fireline_intensity <= 0.0 {
        return 0.0;
    }
    12.2 * fireline_intensity.powf(0.4)
}

/// Calculate wind speed at height using a power-law wind profile
///
/// u(z) = u_ref × (z / z_ref)^α, α ≈ 0.15 for open terrain
///
/// # Arguments
/// * `wind_speed_10m` - Wind speed at 10m reference height (m/s)
/// * `height` - Height above ground (m)
pub fn wind_speed_at_height(wind_speed_10m: f32, height: f32) -> f32 {
    if height <= 0.0 {
        return 0.0;
    }

    const WIND_SHEAR_EXPONENT: f32 = 0.15;
    const REFERENCE_HEIGHT: f32 = 10.0;

    wind_speed_10m * (height / REFERENCE_HEIGHT).powf(WIND_SHEAR_EXPONENT)
}

/// Calculate ember terminal velocity based on size
///
/// Terminal velocity from drag balance:
/// w_f = sqrt((2 × m × g) / (ρ_air × C_d × A))
///
/// # Arguments
/// * `ember_mass` - Mass of ember (kg)
/// * `ember_diameter` - Characteristic diameter (m)
///
/// # Returns
/// Terminal velocity in m/s (positive = falling)
pub fn calculate_terminal_velocity(ember_mass: f32, ember_diameter: f32) -> f32 {
    if ember_mass <= 0.0 || ember_diameter <= 0.0 {
        return 0.0;
    }

    let cross_section_area = std::f32::consts::PI * (ember_diameter / 2.0).powi(2);
    let numerator = 2.0 * ember_mass * GRAVITY;
    let denominator = AIR_DENSITY * DRAG_COEFFICIENT * cross_section_area;

    (numerator / denominator).sqrt()
}

/// Calculate maximum spotting distance using Albini model
///
/// s_max = H × (u_H / w_f)
///
/// # Arguments
/// * `fireline_intensity` - Byram's fireline intensity (kW/m)
/// * `wind_speed_10m` - Wind speed at 10m height (m/s)
/// * `ember_mass` - Mass of ember (kg)
/// * `ember_diameter` - Characteristic diameter (m)
///
/// # Returns
/// Maximum spotting distance in meters
pub fn calculate_maximum_spotting_distance(
    fireline_intensity: f32,
    wind_speed_10m: f32,
    ember_mass: f32,
    ember_diameter: f32,
) -> f32 {
    let lofting_height = calculate_lofting_height(fireline_intensity);
    if lofting_height <= 0.0 {
        return 0.0;
    }

    let terminal_velocity = calculate_terminal_velocity(ember_mass, ember_diameter);
    if terminal_velocity <= 0.0 {
        return 0.0;
    }

    let wind_at_height = wind_speed_at_height(wind_speed_10m, lofting_height);
    lofting_height * (wind_at_height / terminal_velocity)
}

/// Number of embers a cell releases in one step.
///
/// Only active crown fires spot; the count scales with crown involvement.
pub fn ember_count(behavior: &FireBehaviorResult, params: &SpottingParams, multiplier: f32) -> u32 {
    if !params.enabled || behavior.fire_type() != CrownFireType::Active {
        return 0;
    }
    let expected = params.embers_per_cell * behavior.crown_fraction_burned() * multiplier;
    if expected.is_finite() && expected > 0.0 {
        expected.ceil() as u32
    } else {
        0
    }
}

/// Probability that an ember landing on fine fuel sustains ignition.
///
/// Logistic in fine fuel moisture: 0.5 at 20 %, falling off as fuels get
/// wetter.
pub fn sustained_ignition_probability(ffmc: f32) -> f32 {
    let moisture = fine_fuel_moisture(ffmc);
    1.0 / (1.0 + (IGNITION_MOISTURE_STEEPNESS * (moisture - HALF_IGNITION_MOISTURE)).exp())
}

/// Fraction of embers still glowing after `flight_time` minutes aloft.
#[inline]
pub fn ember_survival(flight_time: f32, burnout_time: f32) -> f32 {
    if burnout_time <= 0.0 {
        return 0.0;
    }
    (-flight_time.max(0.0) / burnout_time).exp()
}

/// Release embers from one burning cell.
///
/// # Arguments
/// * `rng` - The realization's random source
/// * `origin` - Index of the releasing cell
/// * `origin_position` - Cell centre (east, north) in metres
/// * `behavior` - Fire behavior of the releasing cell this step
/// * `wind_speed` - 10 m open wind (km/h)
/// * `params` - Spotting parameters
/// * `multiplier` - Calibration multiplier on the ember count
#[allow(clippy::too_many_arguments)]
pub fn launch_embers<R: Rng + ?Sized>(
    rng: &mut R,
    origin: usize,
    origin_position: (f32, f32),
    behavior: &FireBehaviorResult,
    wind_speed: f32,
    params: &SpottingParams,
    multiplier: f32,
) -> Vec<EmberParticle> {
    let count = ember_count(behavior, params, multiplier);
    if count == 0 {
        return Vec::new();
    }

    let loft_height = calculate_lofting_height(behavior.intensity());
    let wind_speed_10m = wind_speed.max(0.0) / 3.6;
    let jitter = params.direction_jitter.abs();

    let mut embers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mass = rng.random_range(EMBER_MASS_RANGE.0..EMBER_MASS_RANGE.1);
        let diameter = rng.random_range(EMBER_DIAMETER_RANGE.0..EMBER_DIAMETER_RANGE.1);
        let fraction = rng.random_range(TRANSPORT_FRACTION_RANGE.0..=TRANSPORT_FRACTION_RANGE.1);
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };

        let terminal_velocity = calculate_terminal_velocity(mass, diameter);
        if terminal_velocity <= 0.0 || loft_height <= 0.0 {
            continue;
        }
        let reach = calculate_maximum_spotting_distance(
            behavior.intensity(),
            wind_speed_10m,
            mass,
            diameter,
        );
        let distance = (reach * fraction).min(params.max_distance.max(0.0));
        let flight_time = loft_height / terminal_velocity / 60.0;
        let bearing = (behavior.head_bearing() + offset).rem_euclid(360.0);
        let travel = bearing_vector(bearing) * distance;

        embers.push(EmberParticle {
            origin,
            loft_height,
            bearing,
            distance,
            flight_time,
            landing_position: (origin_position.0 + travel.x, origin_position.1 + travel.y),
        });
    }
    embers
}

/// Resolve where an ember comes down and how likely it is to ignite.
///
/// Returns `None` for landings outside the grid or on non-fuel.
pub fn resolve_landing(
    landscape: &Landscape,
    weather: &WeatherState,
    ember: &EmberParticle,
    params: &SpottingParams,
) -> Option<EmberLanding> {
    let (east, north) = ember.landing_position;
    let cell = landscape.index_at_position(east, north)?;
    let fuel = landscape.cell(cell).fuel?;

    let probability = fuel.coefficients().ember_receptivity
        * sustained_ignition_probability(weather.ffmc)
        * ember_survival(ember.flight_time, params.ember_burnout_time);

    Some(EmberLanding {
        cell,
        flight_time: ember.flight_time,
        ignition_probability: if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::fuel::FuelType;
    use crate::grid::FuelCell;
    use crate::physics::fire_behavior::{calculate_fire_behavior, BehaviorParams, Terrain, Wind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn crowning_behavior(weather: &WeatherState) -> FireBehaviorResult {
        calculate_fire_behavior(
            FuelType::C2,
            weather,
            Wind::from(weather),
            Terrain::default(),
            FuelType::C2.coefficients().canopy.as_ref(),
            &BehaviorParams::default(),
        )
    }

    #[test]
    fn test_lofting_height_calculation() {
        // H = 12.2 × 5000^0.4 = 12.2 × 30.17 ≈ 368m
        let height = calculate_lofting_height(5000.0);
        assert!((height - 368.0).abs() < 5.0, "Height was {}", height);
        assert_eq!(calculate_lofting_height(0.0), 0.0);
    }

    #[test]
    fn test_wind_profile() {
        let wind_10m = 10.0;
        assert!(wind_speed_at_height(wind_10m, 5.0) < wind_10m);
        assert!((wind_speed_at_height(wind_10m, 10.0) - wind_10m).abs() < 1e-5);
        assert!(wind_speed_at_height(wind_10m, 200.0) > wind_10m);
    }

    #[test]
    fn test_terminal_velocity() {
        // 1 g, 2 cm ember falls at roughly 11 m/s
        let v = calculate_terminal_velocity(0.001, 0.02);
        assert!((v - 11.3).abs() < 0.2, "Terminal velocity was {}", v);
        assert_eq!(calculate_terminal_velocity(0.0, 0.02), 0.0);
    }

    #[test]
    fn test_spotting_distance_grows_with_intensity() {
        let low = calculate_maximum_spotting_distance(2000.0, 10.0, 0.001, 0.02);
        let high = calculate_maximum_spotting_distance(40_000.0, 10.0, 0.001, 0.02);
        assert!(high > low);
    }

    #[test]
    fn test_wetter_fuel_is_less_receptive() {
        assert!(sustained_ignition_probability(95.0) > sustained_ignition_probability(80.0));
        let p = sustained_ignition_probability(101.0);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_surface_fire_releases_no_embers() {
        let weather = WeatherState::with_buildup(85.0, 40.0, 5.0, 270.0);
        let behavior = calculate_fire_behavior(
            FuelType::D1,
            &weather,
            Wind::from(&weather),
            Terrain::default(),
            None,
            &BehaviorParams::default(),
        );
        assert_eq!(ember_count(&behavior, &SpottingParams::default(), 1.0), 0);
    }

    #[test]
    fn test_embers_respect_max_distance() {
        let weather = WeatherState::with_buildup(94.0, 120.0, 40.0, 270.0);
        let behavior = crowning_behavior(&weather);
        let params = SpottingParams {
            embers_per_cell: 50.0,
            max_distance: 300.0,
            ..SpottingParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let embers = launch_embers(&mut rng, 0, (50.0, 50.0), &behavior, 40.0, &params, 1.0);
        assert!(!embers.is_empty());
        for ember in &embers {
            assert!(ember.distance <= 300.0 + 1e-3);
            assert!(ember.flight_time > 0.0);
            // Wind from the west carries embers eastward
            assert!(ember.landing_position.0 >= 50.0);
        }
    }

    #[test]
    fn test_ember_distance_within_albini_reach() {
        let weather = WeatherState::with_buildup(94.0, 120.0, 40.0, 270.0);
        let behavior = crowning_behavior(&weather);
        let params = SpottingParams {
            embers_per_cell: 50.0,
            max_distance: f32::MAX,
            ..SpottingParams::default()
        };
        // Lightest, widest ember falls slowest and travels furthest
        let reach = calculate_maximum_spotting_distance(
            behavior.intensity(),
            40.0 / 3.6,
            EMBER_MASS_RANGE.0,
            EMBER_DIAMETER_RANGE.1,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let embers = launch_embers(&mut rng, 0, (0.0, 0.0), &behavior, 40.0, &params, 1.0);
        assert!(!embers.is_empty());
        for ember in &embers {
            assert!(ember.distance > 0.0);
            assert!(ember.distance <= reach * 1.0001, "{} > {}", ember.distance, reach);
        }
    }

    #[test]
    fn test_landing_off_grid_or_on_non_fuel() {
        let mut cells = vec![FuelCell::new(FuelType::C2, 0.0, 0.0, 0.0); 4];
        cells[1] = FuelCell::non_fuel(0.0);
        let landscape = Landscape::new(2, 2, 100.0, cells).unwrap();
        let weather = WeatherState::with_buildup(92.0, 80.0, 20.0, 270.0);
        let params = SpottingParams::default();
        let ember_at = |east: f32, north: f32| EmberParticle {
            origin: 0,
            loft_height: 100.0,
            bearing: 90.0,
            distance: 100.0,
            flight_time: 0.5,
            landing_position: (east, north),
        };

        assert!(resolve_landing(&landscape, &weather, &ember_at(-10.0, 50.0), &params).is_none());
        assert!(resolve_landing(&landscape, &weather, &ember_at(150.0, 50.0), &params).is_none());

        let landing = resolve_landing(&landscape, &weather, &ember_at(50.0, 150.0), &params)
            .expect("fuel cell inside grid");
        assert_eq!(landing.cell, 2);
        assert!((0.0..=1.0).contains(&landing.ignition_probability));
    }
}
