//! Per-realization burn state
//!
//! Every Monte Carlo realization owns exactly one [`GridState`]. Besides the
//! cell status it keeps the peak fire behavior seen while a cell burned; those
//! peaks are the realization's local accumulator and are handed to the
//! reduction step once the realization ends, so no per-step history is kept.

use serde::{Deserialize, Serialize};

/// Burn status of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    Unburned,
    Burning,
    BurnedOut,
}

/// How a cell caught fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnitionSource {
    /// Seeded by the ignition policy
    Initial,
    /// Reached by an expanding fire front
    Front,
    /// Spot fire from a landed ember
    Ember,
}

/// A cell that burned during a realization, with its peak behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub index: u32,
    /// Peak fireline intensity while burning (kW/m)
    pub peak_intensity: f32,
    /// Peak head rate of spread while burning (m/min)
    pub peak_ros: f32,
    pub source: IgnitionSource,
}

/// Mutable cell states for one realization.
#[derive(Debug, Clone)]
pub struct GridState {
    width: usize,
    height: usize,
    status: Vec<CellStatus>,
    /// Simulated minute of ignition
    ignition_time: Vec<f32>,
    /// Simulated minute at which the cell burns out
    burnout_time: Vec<f32>,
    source: Vec<Option<IgnitionSource>>,
    peak_intensity: Vec<f32>,
    peak_ros: Vec<f32>,
    /// Cells currently burning, unordered
    burning: Vec<usize>,
    ignited: usize,
}

impl GridState {
    pub fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            status: vec![CellStatus::Unburned; n],
            ignition_time: vec![f32::INFINITY; n],
            burnout_time: vec![f32::INFINITY; n],
            source: vec![None; n],
            peak_intensity: vec![0.0; n],
            peak_ros: vec![0.0; n],
            burning: Vec::new(),
            ignited: 0,
        }
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
    pub fn status(&self, index: usize) -> CellStatus {
        self.status[index]
    }

    #[inline]
    pub fn is_unburned(&self, index: usize) -> bool {
        self.status[index] == CellStatus::Unburned
    }

    #[inline]
    pub fn ignition_time(&self, index: usize) -> f32 {
        self.ignition_time[index]
    }

    #[inline]
    pub fn burnout_time(&self, index: usize) -> f32 {
        self.burnout_time[index]
    }

    pub fn ignition_source(&self, index: usize) -> Option<IgnitionSource> {
        self.source[index]
    }

    /// Minutes a cell has been burning at `now` (0 if not yet ignited).
    pub fn elapsed_burn_time(&self, index: usize, now: f32) -> f32 {
        match self.status[index] {
            CellStatus::Unburned => 0.0,
            CellStatus::Burning => (now - self.ignition_time[index]).max(0.0),
            CellStatus::BurnedOut => self.burnout_time[index] - self.ignition_time[index],
        }
    }

    /// Ignite an unburned cell. Returns `false` (and changes nothing) when the
    /// cell already caught fire, so the first source to arrive wins.
    pub fn ignite(
        &mut self,
        index: usize,
        time: f32,
        burnout_at: f32,
        source: IgnitionSource,
    ) -> bool {
        if self.status[index] != CellStatus::Unburned {
            return false;
        }
        self.status[index] = CellStatus::Burning;
        self.ignition_time[index] = time;
        self.burnout_time[index] = burnout_at.max(time);
        self.source[index] = Some(source);
        self.burning.push(index);
        self.ignited += 1;
        true
    }

    /// Fold one behavior evaluation into the cell's peaks.
    pub fn record_behavior(&mut self, index: usize, intensity: f32, ros: f32) {
        self.peak_intensity[index] = self.peak_intensity[index].max(intensity);
        self.peak_ros[index] = self.peak_ros[index].max(ros);
    }

    /// Burning cells in ascending index order.
    pub fn burning_cells(&self) -> Vec<usize> {
        let mut cells = self.burning.clone();
        cells.sort_unstable();
        cells
    }

    pub fn burning_count(&self) -> usize {
        self.burning.len()
    }

    /// Cells that ever ignited.
    pub fn ignited_count(&self) -> usize {
        self.ignited
    }

    /// Move every burning cell whose burnout time has passed to burned-out.
    /// Returns how many cells burned out.
    pub fn burn_out_until(&mut self, now: f32) -> usize {
        let before = self.burning.len();
        let status = &mut self.status;
        let burnout_time = &self.burnout_time;
        self.burning.retain(|&index| {
            if burnout_time[index] <= now {
                status[index] = CellStatus::BurnedOut;
                false
            } else {
                true
            }
        });
        before - self.burning.len()
    }

    /// Every cell that ignited, in index order.
    pub fn burn_records(&self) -> Vec<BurnRecord> {
        self.source
            .iter()
            .enumerate()
            .filter_map(|(index, source)| {
                source.map(|source| BurnRecord {
                    index: index as u32,
                    peak_intensity: self.peak_intensity[index],
                    peak_ros: self.peak_ros[index],
                    source,
                })
            })
            .collect()
    }
}
