//! Van Wagner Crown Fire Initiation Model (1977) as used by the FBP System
//!
//! Implements crown fire involvement for the behavior calculator:
//! - Critical surface intensity from canopy base height and foliar moisture
//! - Critical surface spread rate for crowning
//! - Crown fraction burned as a saturating function of I / I_critical
//! - Surface / passive / active classification
//!
//! # Scientific References
//! - Van Wagner, C.E. (1977). "Conditions for the start and spread of crown fire"
//!   Canadian Journal of Forest Research, 7(1), 23-34
//! - Forestry Canada Fire Danger Group (1992). ST-X-3, equations 56-58
//! - Van Wagner, C.E. (1993). "Prediction of crown fire behavior in two stands of jack pine"
//!   Canadian Journal of Forest Research, 23(3), 442-449

use serde::{Deserialize, Serialize};

use crate::core_types::fuel::CanopyProperties;

/// CFB below which the fire is classified as a surface fire
pub const PASSIVE_CROWN_THRESHOLD: f32 = 0.1;
/// CFB at or above which the fire is classified as an active crown fire
pub const ACTIVE_CROWN_THRESHOLD: f32 = 0.9;

/// Crown fire type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrownFireType {
    /// No crown fire - surface fire only
    Surface,
    /// Passive crown fire - intermittent torching of individual trees
    Passive,
    /// Active crown fire - continuous crown fire spread
    Active,
}

/// Crown fire behavior for one cell and step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrownFireBehavior {
    fire_type: CrownFireType,
    /// Critical surface fire intensity for crown fire initiation (kW/m)
    critical_surface_intensity: f32,
    /// Critical surface spread rate for crowning (m/min)
    critical_spread_rate: f32,
    crown_fraction_burned: f32,
}

impl CrownFireBehavior {
    /// Behavior for a cell with no canopy or no surface fuel
    pub fn surface_only() -> Self {
        Self {
            fire_type: CrownFireType::Surface,
            critical_surface_intensity: f32::INFINITY,
            critical_spread_rate: f32::INFINITY,
            crown_fraction_burned: 0.0,
        }
    }

    pub fn fire_type(&self) -> CrownFireType {
        self.fire_type
    }

    pub fn critical_surface_intensity(&self) -> f32 {
        self.critical_surface_intensity
    }

    pub fn critical_spread_rate(&self) -> f32 {
        self.critical_spread_rate
    }

    pub fn crown_fraction_burned(&self) -> f32 {
        self.crown_fraction_burned
    }
}

/// Calculate critical surface fire intensity for crown fire initiation
///
/// Van Wagner (1977) in FBP form:
/// CSI = 0.001 × CBH^1.5 × (460 + 25.9 × FMC)^1.5
///
/// # Arguments
/// * `crown_base_height` - Height to base of crown (m), typical 2-18
/// * `foliar_moisture_content` - Foliar moisture content (%), typical 85-120
///
/// # Returns
/// Critical surface fire intensity in kW/m
///
/// # References
/// ST-X-3, equation 56
pub fn calculate_critical_surface_intensity(
    crown_base_height: f32,
    foliar_moisture_content: f32,
) -> f32 {
    let cbh = crown_base_height.max(0.0);
    let heat_of_ignition = 460.0 + 25.9 * foliar_moisture_content.max(0.0);
    0.001 * cbh.powf(1.5) * heat_of_ignition.powf(1.5)
}

/// Calculate critical surface spread rate for crowning
///
/// RSO = CSI / (300 × SFC)
///
/// # Returns
/// Critical spread rate in m/min (infinite when there is no surface fuel)
///
/// # References
/// ST-X-3, equation 57
pub fn calculate_critical_spread_rate(
    critical_surface_intensity: f32,
    surface_fuel_consumption: f32,
) -> f32 {
    if surface_fuel_consumption <= 0.0 {
        return f32::INFINITY;
    }
    critical_surface_intensity / (300.0 * surface_fuel_consumption)
}

/// Calculate crown fraction burned (CFB)
///
/// ST-X-3 eq. 58, CFB = 1 − exp(−0.23 × (ROS − RSO)), written in terms of the
/// intensity ratio I/CSI (surface intensity is proportional to ROS at fixed
/// fuel consumption, so ROS − RSO = RSO × (I/CSI − 1)).
///
/// # Returns
/// Crown fraction burned (0-1), non-decreasing in `surface_intensity`
pub fn calculate_crown_fraction_burned(
    surface_intensity: f32,
    critical_surface_intensity: f32,
    critical_spread_rate: f32,
) -> f32 {
    if critical_surface_intensity.is_nan()
        || critical_surface_intensity <= 0.0
        || !critical_spread_rate.is_finite()
        || surface_intensity <= critical_surface_intensity
    {
        return 0.0;
    }

    let excess_ratio = surface_intensity / critical_surface_intensity - 1.0;
    let cfb = 1.0 - (-0.23 * critical_spread_rate * excess_ratio).exp();

    cfb.clamp(0.0, 1.0)
}

/// Classify fire type from crown fraction burned
pub fn classify_crown_fire(crown_fraction_burned: f32) -> CrownFireType {
    if crown_fraction_burned < PASSIVE_CROWN_THRESHOLD {
        CrownFireType::Surface
    } else if crown_fraction_burned < ACTIVE_CROWN_THRESHOLD {
        CrownFireType::Passive
    } else {
        CrownFireType::Active
    }
}

/// Calculate complete crown fire behavior
///
/// A cell without canopy data degrades to a surface fire rather than failing.
pub fn calculate_crown_fire_behavior(
    canopy: Option<&CanopyProperties>,
    surface_intensity: f32,
    surface_fuel_consumption: f32,
    foliar_moisture_content: f32,
) -> CrownFireBehavior {
    let Some(canopy) = canopy else {
        return CrownFireBehavior::surface_only();
    };
    if surface_fuel_consumption <= 0.0 {
        return CrownFireBehavior::surface_only();
    }

    let critical_surface_intensity =
        calculate_critical_surface_intensity(canopy.base_height, foliar_moisture_content);
    let critical_spread_rate =
        calculate_critical_spread_rate(critical_surface_intensity, surface_fuel_consumption);
    let crown_fraction_burned = calculate_crown_fraction_burned(
        surface_intensity,
        critical_surface_intensity,
        critical_spread_rate,
    );

    CrownFireBehavior {
        fire_type: classify_crown_fire(crown_fraction_burned),
        critical_surface_intensity,
        critical_spread_rate,
        crown_fraction_burned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_surface_intensity_calculation() {
        // CBH 7 m, FMC 97%:
        // 0.001 × 7^1.5 × (460 + 25.9 × 97)^1.5 = 0.001 × 18.52 × 2972.3^1.5 ≈ 3001 kW/m
        let csi = calculate_critical_surface_intensity(7.0, 97.0);
        assert!((csi - 3001.0).abs() < 15.0, "CSI was {}", csi);
    }

    #[test]
    fn test_critical_spread_rate() {
        // 3000 kW/m over 300 × 2 kg/m² = 5 m/min
        let rso = calculate_critical_spread_rate(3000.0, 2.0);
        assert!((rso - 5.0).abs() < 1e-4, "RSO was {}", rso);
        assert!(calculate_critical_spread_rate(3000.0, 0.0).is_infinite());
    }

    #[test]
    fn test_crown_fraction_burned() {
        // I = 3 × CSI with RSO = 5: 1 − exp(−0.23 × 5 × 2) = 1 − e^(−2.3) ≈ 0.90
        let cfb = calculate_crown_fraction_burned(9000.0, 3000.0, 5.0);
        assert!((cfb - 0.9).abs() < 0.01, "CFB was {}", cfb);

        assert_eq!(calculate_crown_fraction_burned(2000.0, 3000.0, 5.0), 0.0);
        assert!(calculate_crown_fraction_burned(1.0e9, 3000.0, 5.0) <= 1.0);
    }

    #[test]
    fn test_crown_fire_type_classification() {
        assert_eq!(classify_crown_fire(0.0), CrownFireType::Surface);
        assert_eq!(classify_crown_fire(0.5), CrownFireType::Passive);
        assert_eq!(classify_crown_fire(0.95), CrownFireType::Active);
    }

    #[test]
    fn test_missing_canopy_forces_surface_fire() {
        let behavior = calculate_crown_fire_behavior(None, 50_000.0, 3.0, 97.0);
        assert_eq!(behavior.fire_type(), CrownFireType::Surface);
        assert_eq!(behavior.crown_fraction_burned(), 0.0);
    }

    #[test]
    fn test_low_canopy_crowns_more_readily() {
        let low = CanopyProperties {
            base_height: 2.0,
            crown_fuel_load: 0.8,
        };
        let high = CanopyProperties {
            base_height: 12.0,
            crown_fuel_load: 0.8,
        };
        let low_cfb = calculate_crown_fire_behavior(Some(&low), 4000.0, 2.0, 97.0);
        let high_cfb = calculate_crown_fire_behavior(Some(&high), 4000.0, 2.0, 97.0);
        assert!(
            low_cfb.crown_fraction_burned() > high_cfb.crown_fraction_burned(),
            "low {:?} high {:?}",
            low_cfb,
            high_cfb
        );
    }
}
