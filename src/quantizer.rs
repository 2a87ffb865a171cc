use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Beat subdivision for grid snapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridSnap {
    Quarter,   // 1 subdivision per beat
    Eighth,    // 2
    Sixteenth, // 4
}

impl GridSnap {
    pub fn divisions(self) -> u32 {
        match self {
            GridSnap::Quarter => 1,
            GridSnap::Eighth => 2,
            GridSnap::Sixteenth => 4,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown grid snap: {0} (expected 1/4, 1/8 or 1/16)")]
pub struct ParseGridSnapError(String);

impl FromStr for GridSnap {
    type Err = ParseGridSnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1/4" => Ok(GridSnap::Quarter),
            "1/8" => Ok(GridSnap::Eighth),
            "1/16" => Ok(GridSnap::Sixteenth),
            other => Err(ParseGridSnapError(other.to_string())),
        }
    }
}

/// Snaps onset times to a subdivision grid built from detected beats.
#[derive(Clone, Debug)]
pub struct BeatGridQuantizer {
    grid: Vec<f32>,
}

impl BeatGridQuantizer {
    /// Build the grid from beat timestamps. For each adjacent beat pair the
    /// span is split into `divisions()` points; the final beat itself is not
    /// a grid point. Fewer than 2 beats yields an empty grid and quantization
    /// becomes a pass-through.
    pub fn new(beats: &[f32], snap: GridSnap) -> Self {
        let divs = snap.divisions();
        let mut grid = Vec::new();
        for pair in beats.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let span = end - start;
            if span <= 0.0 {
                continue;
            }
            for d in 0..divs {
                grid.push(start + span * (d as f32 / divs as f32));
            }
        }
        BeatGridQuantizer { grid }
    }

    /// Snap one time to the nearest grid point; identity when no grid exists.
    pub fn snap(&self, time: f32) -> f32 {
        match self.nearest_index(time) {
            Some(idx) => self.grid[idx],
            None => time,
        }
    }

    /// Snap a batch of times, deduplicate (set semantics over grid points)
    /// and return ascending unique times.
    pub fn quantize(&self, times: &[f32]) -> Vec<f32> {
        if self.grid.is_empty() {
            return times.to_vec();
        }

        let mut indices: Vec<usize> = times
            .iter()
            .filter_map(|&t| self.nearest_index(t))
            .collect();
        indices.sort_unstable();
        indices.dedup();

        indices.into_iter().map(|i| self.grid[i]).collect()
    }

    fn nearest_index(&self, time: f32) -> Option<usize> {
        if self.grid.is_empty() {
            return None;
        }
        let pos = self.grid.partition_point(|&g| g < time);
        let mut best = pos.min(self.grid.len() - 1);
        if pos > 0 {
            let before = pos - 1;
            if (time - self.grid[before]).abs() <= (self.grid[best] - time).abs() {
                best = before;
            }
        }
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_construction_eighths() {
        let q = BeatGridQuantizer::new(&[0.0, 0.5, 1.0], GridSnap::Eighth);
        assert_eq!(q.grid, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_snap_to_nearest_point() {
        let q = BeatGridQuantizer::new(&[0.0, 0.5, 1.0], GridSnap::Eighth);
        assert_eq!(q.snap(0.3), 0.25);
        assert_eq!(q.snap(0.4), 0.5);
    }

    #[test]
    fn test_snap_idempotent_on_grid() {
        let q = BeatGridQuantizer::new(&[0.0, 0.5, 1.0], GridSnap::Sixteenth);
        for &g in &[0.0, 0.125, 0.25, 0.375, 0.5] {
            assert_eq!(q.snap(g), g);
        }
    }

    #[test]
    fn test_quantize_dedupes() {
        let q = BeatGridQuantizer::new(&[0.0, 0.5, 1.0], GridSnap::Quarter);
        // 0.1 and 0.2 both snap to 0.0; one survives.
        let out = q.quantize(&[0.1, 0.2, 0.6]);
        assert_eq!(out, vec![0.0, 0.5]);
    }

    #[test]
    fn test_too_few_beats_passes_through() {
        let q = BeatGridQuantizer::new(&[1.0], GridSnap::Sixteenth);
        let times = vec![0.13, 0.77, 2.4];
        assert_eq!(q.quantize(&times), times);
    }

    #[test]
    fn test_times_outside_grid_clamp_to_edges() {
        let q = BeatGridQuantizer::new(&[1.0, 1.5], GridSnap::Quarter);
        // Only grid point is 1.0.
        assert_eq!(q.snap(0.0), 1.0);
        assert_eq!(q.snap(9.0), 1.0);
    }

    #[test]
    fn test_grid_snap_parsing() {
        assert_eq!("1/4".parse::<GridSnap>().unwrap(), GridSnap::Quarter);
        assert_eq!("1/8".parse::<GridSnap>().unwrap(), GridSnap::Eighth);
        assert_eq!("1/16".parse::<GridSnap>().unwrap(), GridSnap::Sixteenth);
        assert!("1/32".parse::<GridSnap>().is_err());
    }
}
