//! Canadian FBP System fuel-type catalogue
//!
//! The eighteen benchmark fuel types of the Fire Behavior Prediction System,
//! each carrying its spread, buildup and crown coefficients as a `const`
//! record. Dispatch is a closed `match`; an unknown code or name can only
//! appear at parse time and is rejected there.
//!
//! # Scientific References
//! - Forestry Canada Fire Danger Group (1992). "Development and Structure of the
//!   Canadian Forest Fire Behavior Prediction System". Information Report ST-X-3.
//! - Wotton, B.M., Alexander, M.E., Taylor, S.W. (2009). "Updates and revisions to
//!   the 1992 Canadian Forest Fire Behavior Prediction System". GLC-X-10.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Canopy attributes that drive crown fire initiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanopyProperties {
    /// Height to the live crown base (m)
    pub base_height: f32,
    /// Crown fuel load available to an active crown fire (kg/m²)
    pub crown_fuel_load: f32,
}

/// Per-fuel-type coefficients (ST-X-3 Table 6 and crown tables).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelCoefficients {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    /// Proportion of maximum ROS at BUI = 50
    pub q: f32,
    /// Average BUI for the fuel type
    pub bui0: f32,
    /// Default canopy for crowning fuel types
    pub canopy: Option<CanopyProperties>,
    /// Relative receptivity of the fuel bed to landing embers (0-1)
    pub ember_receptivity: f32,
}

const fn canopy(base_height: f32, crown_fuel_load: f32) -> CanopyProperties {
    CanopyProperties {
        base_height,
        crown_fuel_load,
    }
}

/// Stand modifiers used by the mixedwood and grass fuel types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelModifiers {
    /// Percent conifer for M1/M2 (0-100)
    pub percent_conifer: f32,
    /// Percent dead balsam fir for M3/M4 (0-100)
    pub percent_dead_fir: f32,
    /// Degree of grass curing for O1a/O1b (0-100)
    pub curing: f32,
    /// Grass fuel load for O1a/O1b (kg/m²)
    pub grass_fuel_load: f32,
}

impl Default for FuelModifiers {
    fn default() -> Self {
        Self {
            percent_conifer: 50.0,
            percent_dead_fir: 50.0,
            curing: 80.0,
            grass_fuel_load: 0.35,
        }
    }
}

/// FBP benchmark fuel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    /// Spruce-lichen woodland
    C1,
    /// Boreal spruce
    C2,
    /// Mature jack or lodgepole pine
    C3,
    /// Immature jack or lodgepole pine
    C4,
    /// Red and white pine
    C5,
    /// Conifer plantation
    C6,
    /// Ponderosa pine / Douglas-fir
    C7,
    /// Leafless aspen
    D1,
    /// Green aspen
    D2,
    /// Boreal mixedwood, leafless
    M1,
    /// Boreal mixedwood, green
    M2,
    /// Dead balsam fir mixedwood, leafless
    M3,
    /// Dead balsam fir mixedwood, green
    M4,
    /// Jack or lodgepole pine slash
    S1,
    /// White spruce / balsam slash
    S2,
    /// Coastal cedar / hemlock / Douglas-fir slash
    S3,
    /// Matted grass
    O1a,
    /// Standing grass
    O1b,
}

impl FuelType {
    /// Every fuel type, in code order.
    pub const ALL: [FuelType; 18] = [
        FuelType::C1,
        FuelType::C2,
        FuelType::C3,
        FuelType::C4,
        FuelType::C5,
        FuelType::C6,
        FuelType::C7,
        FuelType::D1,
        FuelType::D2,
        FuelType::M1,
        FuelType::M2,
        FuelType::M3,
        FuelType::M4,
        FuelType::S1,
        FuelType::S2,
        FuelType::S3,
        FuelType::O1a,
        FuelType::O1b,
    ];

    /// Parse a raster fuel code (1-18, in [`FuelType::ALL`] order).
    pub fn from_code(code: u8) -> Result<Self, SimError> {
        match code {
            1..=18 => Ok(Self::ALL[usize::from(code - 1)]),
            _ => Err(SimError::InvalidFuelType(code.to_string())),
        }
    }

    /// Raster fuel code (1-18).
    pub fn code(self) -> u8 {
        // ALL is in declaration order, so the discriminant is the index
        self as u8 + 1
    }

    /// FBP designation, e.g. "C2".
    pub fn name(self) -> &'static str {
        match self {
            FuelType::C1 => "C1",
            FuelType::C2 => "C2",
            FuelType::C3 => "C3",
            FuelType::C4 => "C4",
            FuelType::C5 => "C5",
            FuelType::C6 => "C6",
            FuelType::C7 => "C7",
            FuelType::D1 => "D1",
            FuelType::D2 => "D2",
            FuelType::M1 => "M1",
            FuelType::M2 => "M2",
            FuelType::M3 => "M3",
            FuelType::M4 => "M4",
            FuelType::S1 => "S1",
            FuelType::S2 => "S2",
            FuelType::S3 => "S3",
            FuelType::O1a => "O1a",
            FuelType::O1b => "O1b",
        }
    }

    pub fn is_grass(self) -> bool {
        matches!(self, FuelType::O1a | FuelType::O1b)
    }

    /// Coefficient record for this fuel type.
    pub fn coefficients(self) -> &'static FuelCoefficients {
        match self {
            FuelType::C1 => &C1,
            FuelType::C2 => &C2,
            FuelType::C3 => &C3,
            FuelType::C4 => &C4,
            FuelType::C5 => &C5,
            FuelType::C6 => &C6,
            FuelType::C7 => &C7,
            FuelType::D1 => &D1,
            FuelType::D2 => &D2,
            FuelType::M1 => &M1,
            FuelType::M2 => &M2,
            FuelType::M3 => &M3,
            FuelType::M4 => &M4,
            FuelType::S1 => &S1,
            FuelType::S2 => &S2,
            FuelType::S3 => &S3,
            FuelType::O1a => &O1A,
            FuelType::O1b => &O1B,
        }
    }

    /// Initial rate of spread (m/min) for a given initial spread index,
    /// before the buildup effect.
    ///
    /// Mixedwoods blend their conifer/fir component with D1; green variants
    /// take 20% of the D1 contribution. Grasses scale by the curing factor.
    pub fn initial_rate_of_spread(self, isi: f32, modifiers: &FuelModifiers) -> f32 {
        let isi = isi.max(0.0);
        match self {
            FuelType::M1 | FuelType::M2 => {
                let pc = (modifiers.percent_conifer / 100.0).clamp(0.0, 1.0);
                let green = if self == FuelType::M2 { 0.2 } else { 1.0 };
                pc * spread_curve(&C2, isi) + green * (1.0 - pc) * spread_curve(&D1, isi)
            }
            FuelType::M3 | FuelType::M4 => {
                let pdf = (modifiers.percent_dead_fir / 100.0).clamp(0.0, 1.0);
                let green = if self == FuelType::M4 { 0.2 } else { 1.0 };
                pdf * spread_curve(self.coefficients(), isi)
                    + green * (1.0 - pdf) * spread_curve(&D1, isi)
            }
            FuelType::O1a | FuelType::O1b => {
                spread_curve(self.coefficients(), isi) * curing_factor(modifiers.curing)
            }
            _ => spread_curve(self.coefficients(), isi),
        }
    }

    /// Surface fuel consumption (kg/m²).
    ///
    /// ST-X-3 equations 9-25. Every branch saturates in BUI so the raw
    /// buildup code can be used directly here.
    pub fn surface_fuel_consumption(self, ffmc: f32, bui: f32, modifiers: &FuelModifiers) -> f32 {
        let bui = bui.max(0.0);
        let sfc = match self {
            FuelType::C1 => {
                let d = ffmc - 84.0;
                if d > 0.0 {
                    0.75 + 0.75 * (1.0 - (-0.23 * d).exp()).sqrt()
                } else {
                    0.75 - 0.75 * (1.0 - (0.23 * d).exp()).sqrt()
                }
            }
            FuelType::C2 | FuelType::M3 | FuelType::M4 => 5.0 * (1.0 - (-0.0115 * bui).exp()),
            FuelType::C3 | FuelType::C4 => 5.0 * (1.0 - (-0.0164 * bui).exp()).powf(2.24),
            FuelType::C5 | FuelType::C6 => 5.0 * (1.0 - (-0.0149 * bui).exp()).powf(2.48),
            FuelType::C7 => {
                let forest_floor = (2.0 * (1.0 - (-0.104 * (ffmc - 70.0)).exp())).max(0.0);
                let woody = 1.5 * (1.0 - (-0.0201 * bui).exp());
                forest_floor + woody
            }
            FuelType::D1 | FuelType::D2 => 1.5 * (1.0 - (-0.0183 * bui).exp()),
            FuelType::M1 | FuelType::M2 => {
                let pc = (modifiers.percent_conifer / 100.0).clamp(0.0, 1.0);
                let conifer = FuelType::C2.surface_fuel_consumption(ffmc, bui, modifiers);
                let deciduous = FuelType::D1.surface_fuel_consumption(ffmc, bui, modifiers);
                pc * conifer + (1.0 - pc) * deciduous
            }
            FuelType::S1 => {
                4.0 * (1.0 - (-0.025 * bui).exp()) + 4.0 * (1.0 - (-0.034 * bui).exp())
            }
            FuelType::S2 => {
                10.0 * (1.0 - (-0.013 * bui).exp()) + 6.0 * (1.0 - (-0.060 * bui).exp())
            }
            FuelType::S3 => {
                12.0 * (1.0 - (-0.0166 * bui).exp()) + 20.0 * (1.0 - (-0.0210 * bui).exp())
            }
            FuelType::O1a | FuelType::O1b => modifiers.grass_fuel_load,
        };
        sfc.max(0.0)
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FuelType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|fuel| fuel.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SimError::InvalidFuelType(trimmed.to_string()))
    }
}

/// RSI = a × (1 − e^(−b × ISI))^c  (ST-X-3 eq. 26)
#[inline]
fn spread_curve(coefficients: &FuelCoefficients, isi: f32) -> f32 {
    coefficients.a * (1.0 - (-coefficients.b * isi).exp()).powf(coefficients.c)
}

/// Grass curing factor (Wotton et al. 2009, eq. 35a/35b)
pub fn curing_factor(curing: f32) -> f32 {
    let curing = curing.clamp(0.0, 100.0);
    if curing < 58.8 {
        0.005 * ((0.061 * curing).exp() - 1.0)
    } else {
        0.176 + 0.02 * (curing - 58.8)
    }
}

const C1: FuelCoefficients = FuelCoefficients {
    a: 90.0,
    b: 0.0649,
    c: 4.5,
    q: 0.90,
    bui0: 72.0,
    canopy: Some(canopy(2.0, 0.75)),
    ember_receptivity: 0.70,
};

const C2: FuelCoefficients = FuelCoefficients {
    a: 110.0,
    b: 0.0282,
    c: 1.5,
    q: 0.70,
    bui0: 64.0,
    canopy: Some(canopy(3.0, 0.80)),
    ember_receptivity: 0.75,
};

const C3: FuelCoefficients = FuelCoefficients {
    a: 110.0,
    b: 0.0444,
    c: 3.0,
    q: 0.75,
    bui0: 62.0,
    canopy: Some(canopy(8.0, 1.15)),
    ember_receptivity: 0.60,
};

const C4: FuelCoefficients = FuelCoefficients {
    a: 110.0,
    b: 0.0293,
    c: 1.5,
    q: 0.80,
    bui0: 66.0,
    canopy: Some(canopy(4.0, 1.20)),
    ember_receptivity: 0.65,
};

const C5: FuelCoefficients = FuelCoefficients {
    a: 30.0,
    b: 0.0697,
    c: 4.0,
    q: 0.80,
    bui0: 56.0,
    canopy: Some(canopy(18.0, 1.20)),
    ember_receptivity: 0.40,
};

const C6: FuelCoefficients = FuelCoefficients {
    a: 30.0,
    b: 0.0800,
    c: 3.0,
    q: 0.80,
    bui0: 62.0,
    canopy: Some(canopy(7.0, 1.80)),
    ember_receptivity: 0.50,
};

const C7: FuelCoefficients = FuelCoefficients {
    a: 45.0,
    b: 0.0305,
    c: 2.0,
    q: 0.85,
    bui0: 106.0,
    canopy: Some(canopy(10.0, 0.50)),
    ember_receptivity: 0.50,
};

const D1: FuelCoefficients = FuelCoefficients {
    a: 30.0,
    b: 0.0232,
    c: 1.6,
    q: 0.90,
    bui0: 32.0,
    canopy: None,
    ember_receptivity: 0.40,
};

const D2: FuelCoefficients = FuelCoefficients {
    a: 6.0,
    b: 0.0232,
    c: 1.6,
    q: 0.90,
    bui0: 32.0,
    canopy: None,
    ember_receptivity: 0.15,
};

// M1/M2 spread through the C2 and D1 curves; a/b/c here are the conifer part
const M1: FuelCoefficients = FuelCoefficients {
    a: 110.0,
    b: 0.0282,
    c: 1.5,
    q: 0.80,
    bui0: 50.0,
    canopy: Some(canopy(6.0, 0.80)),
    ember_receptivity: 0.60,
};

const M2: FuelCoefficients = FuelCoefficients {
    a: 110.0,
    b: 0.0282,
    c: 1.5,
    q: 0.80,
    bui0: 50.0,
    canopy: Some(canopy(6.0, 0.80)),
    ember_receptivity: 0.40,
};

const M3: FuelCoefficients = FuelCoefficients {
    a: 120.0,
    b: 0.0572,
    c: 1.4,
    q: 0.80,
    bui0: 50.0,
    canopy: Some(canopy(6.0, 0.80)),
    ember_receptivity: 0.70,
};

const M4: FuelCoefficients = FuelCoefficients {
    a: 100.0,
    b: 0.0404,
    c: 1.48,
    q: 0.80,
    bui0: 50.0,
    canopy: Some(canopy(6.0, 0.80)),
    ember_receptivity: 0.50,
};

const S1: FuelCoefficients = FuelCoefficients {
    a: 75.0,
    b: 0.0297,
    c: 1.3,
    q: 0.75,
    bui0: 38.0,
    canopy: None,
    ember_receptivity: 0.80,
};

const S2: FuelCoefficients = FuelCoefficients {
    a: 40.0,
    b: 0.0438,
    c: 1.7,
    q: 0.75,
    bui0: 63.0,
    canopy: None,
    ember_receptivity: 0.80,
};

const S3: FuelCoefficients = FuelCoefficients {
    a: 55.0,
    b: 0.0829,
    c: 3.2,
    q: 0.75,
    bui0: 31.0,
    canopy: None,
    ember_receptivity: 0.80,
};

// Grass has no buildup effect: q = 1 makes BE identically 1
const O1A: FuelCoefficients = FuelCoefficients {
    a: 190.0,
    b: 0.0310,
    c: 1.4,
    q: 1.0,
    bui0: 1.0,
    canopy: None,
    ember_receptivity: 0.90,
};

const O1B: FuelCoefficients = FuelCoefficients {
    a: 250.0,
    b: 0.0350,
    c: 1.7,
    q: 1.0,
    bui0: 1.0,
    canopy: None,
    ember_receptivity: 0.85,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip_covers_catalogue() {
        for (i, fuel) in FuelType::ALL.iter().enumerate() {
            assert_eq!(usize::from(fuel.code()), i + 1);
            assert_eq!(FuelType::from_code(fuel.code()).unwrap(), *fuel);
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert!(matches!(
            FuelType::from_code(0),
            Err(SimError::InvalidFuelType(_))
        ));
        assert!(matches!(
            FuelType::from_code(19),
            Err(SimError::InvalidFuelType(_))
        ));
        assert!("C8".parse::<FuelType>().is_err());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("c2".parse::<FuelType>().unwrap(), FuelType::C2);
        assert_eq!(" O1A ".parse::<FuelType>().unwrap(), FuelType::O1a);
    }

    #[test]
    fn test_c2_initial_spread_known_value() {
        // ISI 10: 110 × (1 − e^(−0.282))^1.5 = 110 × 0.2457^1.5 ≈ 13.4 m/min
        let rsi = FuelType::C2.initial_rate_of_spread(10.0, &FuelModifiers::default());
        assert!((rsi - 13.4).abs() < 0.3, "RSI was {}", rsi);
    }

    #[test]
    fn test_green_variants_spread_slower() {
        let m = FuelModifiers::default();
        assert!(
            FuelType::M2.initial_rate_of_spread(20.0, &m)
                < FuelType::M1.initial_rate_of_spread(20.0, &m)
        );
        assert!(
            FuelType::D2.initial_rate_of_spread(20.0, &m)
                < FuelType::D1.initial_rate_of_spread(20.0, &m)
        );
    }

    #[test]
    fn test_curing_factor_is_continuous_at_breakpoint() {
        let below = curing_factor(58.8 - 1e-3);
        let above = curing_factor(58.8);
        assert!((below - above).abs() < 1e-3, "{} vs {}", below, above);
    }

    #[test]
    fn test_surface_consumption_non_negative() {
        let m = FuelModifiers::default();
        for fuel in FuelType::ALL {
            for bui in [0.0, 20.0, 80.0, 300.0] {
                let sfc = fuel.surface_fuel_consumption(60.0, bui, &m);
                assert!(sfc >= 0.0 && sfc.is_finite(), "{} sfc {}", fuel, sfc);
            }
        }
    }

    #[test]
    fn test_only_forest_types_carry_canopy() {
        assert!(FuelType::C2.coefficients().canopy.is_some());
        assert!(FuelType::M1.coefficients().canopy.is_some());
        assert!(FuelType::D1.coefficients().canopy.is_none());
        assert!(FuelType::S1.coefficients().canopy.is_none());
        assert!(FuelType::O1b.coefficients().canopy.is_none());
    }
}
