//! Fuel and terrain landscape
//!
//! The read-only input grid shared by every realization of a run. Cells are
//! stored row-major (`y * width + x`); `x` grows eastward and `y` grows
//! northward, so row 0 is the southern edge. Cell centres sit at
//! `((x + 0.5) × cell_size, (y + 0.5) × cell_size)` metres.

use serde::{Deserialize, Serialize};

use crate::core_types::fuel::{CanopyProperties, FuelType};
use crate::error::{Result, SimError};
use crate::physics::terrain_physics::horn_slope_aspect;

/// Immutable attributes of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelCell {
    /// FBP fuel type; `None` marks a non-fuel cell (water, rock, road)
    pub fuel: Option<FuelType>,
    /// Ground slope (percent)
    pub slope: f32,
    /// Downslope direction (degrees clockwise from north)
    pub aspect: f32,
    /// Elevation (m)
    pub elevation: f32,
    /// Canopy override; falls back to the fuel type's default
    pub canopy: Option<CanopyProperties>,
}

impl FuelCell {
    pub fn new(fuel: FuelType, slope: f32, aspect: f32, elevation: f32) -> Self {
        Self {
            fuel: Some(fuel),
            slope,
            aspect,
            elevation,
            canopy: None,
        }
    }

    pub fn non_fuel(elevation: f32) -> Self {
        Self {
            fuel: None,
            slope: 0.0,
            aspect: 0.0,
            elevation,
            canopy: None,
        }
    }

    pub fn with_canopy(mut self, canopy: CanopyProperties) -> Self {
        self.canopy = Some(canopy);
        self
    }

    #[inline]
    pub fn is_burnable(&self) -> bool {
        self.fuel.is_some()
    }

    /// Canopy used by the crown model: the cell override, then the fuel default.
    pub fn effective_canopy(&self) -> Option<CanopyProperties> {
        self.canopy
            .or_else(|| self.fuel.and_then(|fuel| fuel.coefficients().canopy))
    }

    fn validate(&self, index: usize) -> Result<()> {
        let checks = [
            ("slope", self.slope, self.slope >= 0.0),
            ("aspect", self.aspect, true),
            ("elevation", self.elevation, true),
        ];
        for (name, value, in_range) in checks {
            if !value.is_finite() || !in_range {
                return Err(SimError::invalid_input(format!(
                    "cell {index}: {name} must be finite{}, got {value}",
                    if name == "slope" { " and non-negative" } else { "" }
                )));
            }
        }
        if let Some(canopy) = self.canopy {
            if !canopy.base_height.is_finite()
                || canopy.base_height < 0.0
                || !canopy.crown_fuel_load.is_finite()
                || canopy.crown_fuel_load < 0.0
            {
                return Err(SimError::invalid_input(format!(
                    "cell {index}: canopy attributes must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}

/// Fuel/terrain grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landscape {
    width: usize,
    height: usize,
    /// Cell edge length (m)
    cell_size: f32,
    cells: Vec<FuelCell>,
}

impl Landscape {
    /// Build and validate a landscape.
    pub fn new(width: usize, height: usize, cell_size: f32, cells: Vec<FuelCell>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::invalid_input(format!(
                "grid dimensions must be positive, got {width}x{height}"
            )));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SimError::invalid_input(format!(
                "cell size must be finite and positive, got {cell_size}"
            )));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| SimError::invalid_input("grid dimensions overflow"))?;
        if cells.len() != expected {
            return Err(SimError::invalid_input(format!(
                "fuel layer has {} cells, grid {}x{} needs {}",
                cells.len(),
                width,
                height,
                expected
            )));
        }
        for (i, cell) in cells.iter().enumerate() {
            cell.validate(i)?;
        }
        Ok(Self {
            width,
            height,
            cell_size,
            cells,
        })
    }

    /// Flat landscape of a single fuel type.
    pub fn uniform(width: usize, height: usize, cell_size: f32, fuel: FuelType) -> Result<Self> {
        let cells = vec![FuelCell::new(fuel, 0.0, 0.0, 0.0); width.saturating_mul(height)];
        Self::new(width, height, cell_size, cells)
    }

    /// Assemble from separate raster layers.
    ///
    /// Fuel code 0 marks non-fuel; 1-18 map through [`FuelType::from_code`].
    /// Every layer must hold exactly `width × height` values.
    pub fn from_layers(
        width: usize,
        height: usize,
        cell_size: f32,
        fuel_codes: &[u8],
        slope: &[f32],
        aspect: &[f32],
        elevation: &[f32],
    ) -> Result<Self> {
        let expected = width.saturating_mul(height);
        for (name, len) in [
            ("fuel", fuel_codes.len()),
            ("slope", slope.len()),
            ("aspect", aspect.len()),
            ("elevation", elevation.len()),
        ] {
            if len != expected {
                return Err(SimError::invalid_input(format!(
                    "{name} layer has {len} cells, grid {width}x{height} needs {expected}"
                )));
            }
        }

        let cells = (0..expected)
            .map(|i| {
                if fuel_codes[i] == 0 {
                    Ok(FuelCell {
                        slope: slope[i],
                        aspect: aspect[i],
                        ..FuelCell::non_fuel(elevation[i])
                    })
                } else {
                    FuelType::from_code(fuel_codes[i])
                        .map(|fuel| FuelCell::new(fuel, slope[i], aspect[i], elevation[i]))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(width, height, cell_size, cells)
    }

    /// Assemble from fuel codes and a DEM, deriving slope and aspect with
    /// Horn's method (edges reuse the nearest interior sample).
    pub fn from_elevation(
        width: usize,
        height: usize,
        cell_size: f32,
        fuel_codes: &[u8],
        elevation: &[f32],
    ) -> Result<Self> {
        let expected = width.saturating_mul(height);
        if elevation.len() != expected {
            return Err(SimError::invalid_input(format!(
                "elevation layer has {} cells, grid {}x{} needs {}",
                elevation.len(),
                width,
                height,
                expected
            )));
        }

        let mut slope = vec![0.0; expected];
        let mut aspect = vec![0.0; expected];
        let at = |x: isize, y: isize| -> f32 {
            let cx = x.clamp(0, width as isize - 1) as usize;
            let cy = y.clamp(0, height as isize - 1) as usize;
            elevation[cy * width + cx]
        };
        for y in 0..height {
            for x in 0..width {
                let (xi, yi) = (x as isize, y as isize);
                let window = [
                    at(xi - 1, yi + 1),
                    at(xi, yi + 1),
                    at(xi + 1, yi + 1),
                    at(xi - 1, yi),
                    at(xi, yi),
                    at(xi + 1, yi),
                    at(xi - 1, yi - 1),
                    at(xi, yi - 1),
                    at(xi + 1, yi - 1),
                ];
                let (s, a) = horn_slope_aspect(&window, cell_size);
                slope[y * width + x] = s;
                aspect[y * width + x] = a;
            }
        }

        Self::from_layers(
            width, height, cell_size, fuel_codes, &slope, &aspect, elevation,
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Index of a signed coordinate, or `None` outside the grid.
    #[inline]
    pub fn checked_index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            None
        } else {
            Some(y as usize * self.width + x as usize)
        }
    }

    #[inline]
    pub fn cell(&self, index: usize) -> &FuelCell {
        &self.cells[index]
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Option<&FuelCell> {
        if x < self.width && y < self.height {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[FuelCell] {
        &self.cells
    }

    /// Cell centre in metres (east, north).
    #[inline]
    pub fn cell_center(&self, index: usize) -> (f32, f32) {
        let (x, y) = self.coords(index);
        (
            (x as f32 + 0.5) * self.cell_size,
            (y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Cell containing a position in metres, or `None` outside the grid.
    pub fn index_at_position(&self, east: f32, north: f32) -> Option<usize> {
        if !east.is_finite() || !north.is_finite() || east < 0.0 || north < 0.0 {
            return None;
        }
        let x = (east / self.cell_size).floor() as i64;
        let y = (north / self.cell_size).floor() as i64;
        self.checked_index(x, y)
    }

    pub fn burnable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_burnable()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_landscape_dimensions() {
        let land = Landscape::uniform(10, 5, 30.0, FuelType::C2).unwrap();
        assert_eq!(land.len(), 50);
        assert_eq!(land.coords(land.index(3, 4)), (3, 4));
        assert_eq!(land.burnable_count(), 50);
    }

    #[test]
    fn test_mismatched_layers_rejected() {
        let err = Landscape::from_layers(2, 2, 30.0, &[2, 2, 2], &[0.0; 4], &[0.0; 4], &[0.0; 4])
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn test_unknown_fuel_code_rejected() {
        let err = Landscape::from_layers(2, 1, 30.0, &[2, 42], &[0.0; 2], &[0.0; 2], &[0.0; 2])
            .unwrap_err();
        assert_eq!(err, SimError::InvalidFuelType("42".to_string()));
    }

    #[test]
    fn test_zero_code_is_non_fuel() {
        let land =
            Landscape::from_layers(2, 1, 30.0, &[0, 8], &[0.0; 2], &[0.0; 2], &[0.0; 2]).unwrap();
        assert!(!land.cell(0).is_burnable());
        assert_eq!(land.cell(1).fuel, Some(FuelType::D1));
    }

    #[test]
    fn test_non_finite_slope_rejected() {
        let mut cells = vec![FuelCell::new(FuelType::C2, 0.0, 0.0, 0.0); 4];
        cells[2].slope = f32::NAN;
        assert!(Landscape::new(2, 2, 30.0, cells).is_err());
    }

    #[test]
    fn test_position_lookup() {
        let land = Landscape::uniform(4, 4, 10.0, FuelType::O1a).unwrap();
        assert_eq!(land.index_at_position(15.0, 35.0), Some(land.index(1, 3)));
        assert_eq!(land.index_at_position(-1.0, 5.0), None);
        assert_eq!(land.index_at_position(5.0, 40.0), None);
    }

    #[test]
    fn test_from_elevation_derives_slope() {
        // Ramp rising 5 m per 50 m cell toward the north: 10% slope facing south
        let width = 4;
        let height = 4;
        let elevation: Vec<f32> = (0..width * height)
            .map(|i| (i / width) as f32 * 5.0)
            .collect();
        let land =
            Landscape::from_elevation(width, height, 50.0, &[1; 16], &elevation).unwrap();
        let cell = land.cell_at(1, 1).unwrap();
        assert!((cell.slope - 10.0).abs() < 1e-3, "slope {}", cell.slope);
        assert!((cell.aspect - 180.0).abs() < 1e-3, "aspect {}", cell.aspect);
    }

    #[test]
    fn test_canopy_falls_back_to_fuel_default() {
        let cell = FuelCell::new(FuelType::C2, 0.0, 0.0, 0.0);
        assert_eq!(cell.effective_canopy().unwrap().base_height, 3.0);
        let override_canopy = CanopyProperties {
            base_height: 9.0,
            crown_fuel_load: 1.0,
        };
        let cell = cell.with_canopy(override_canopy);
        assert_eq!(cell.effective_canopy(), Some(override_canopy));
        assert!(FuelCell::new(FuelType::D1, 0.0, 0.0, 0.0)
            .effective_canopy()
            .is_none());
    }
}
