use crate::types::Onset;

/// Width of the fixed admission windows, in seconds.
const WINDOW_LEN: f32 = 4.0;

/// Hard floor for the inter-onset spacing check, in seconds.
const MIN_GAP_FLOOR: f32 = 0.05;

/// Thins a raw onset candidate list down to a notes-per-second budget.
///
/// The timeline is cut into fixed 4 s windows. Within each window candidates
/// are ranked by strength (stable, so equal strengths keep first-seen order)
/// and admitted up to `floor(max_nps * 4)`. The spacing check runs against
/// every already-admitted onset, across window boundaries, so earlier
/// windows constrain later ones.
#[derive(Clone, Debug)]
pub struct OnsetDensityFilter {
    pub max_notes_per_second: f32,
    pub min_gap: f32, // seconds
}

impl OnsetDensityFilter {
    pub fn new(max_notes_per_second: f32, min_gap_ms: f32) -> Self {
        OnsetDensityFilter {
            max_notes_per_second: max_notes_per_second.max(0.0),
            min_gap: (min_gap_ms / 1000.0).max(MIN_GAP_FLOOR),
        }
    }

    /// Filter onsets and return admitted times, sorted ascending.
    pub fn filter(&self, onsets: &[Onset]) -> Vec<f32> {
        if onsets.is_empty() {
            return Vec::new();
        }

        let quota = (self.max_notes_per_second * WINDOW_LEN).floor() as usize;
        if quota == 0 {
            return Vec::new();
        }

        // Bucket candidates by window index; input order inside a bucket is
        // the tie-break order.
        let mut windows: std::collections::BTreeMap<i64, Vec<Onset>> =
            std::collections::BTreeMap::new();
        for onset in onsets {
            if !onset.time.is_finite() {
                continue;
            }
            let idx = (onset.time.max(0.0) / WINDOW_LEN).floor() as i64;
            windows.entry(idx).or_default().push(*onset);
        }

        // Admitted times, kept sorted so the spacing check is a neighbor
        // lookup instead of a full scan.
        let mut admitted: Vec<f32> = Vec::new();

        for (_, mut candidates) in windows {
            candidates.sort_by(|a, b| {
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut taken = 0usize;
            for candidate in candidates {
                if taken >= quota {
                    break;
                }
                if self.too_close(&admitted, candidate.time) {
                    continue;
                }
                let pos = admitted.partition_point(|&t| t < candidate.time);
                admitted.insert(pos, candidate.time);
                taken += 1;
            }
        }

        admitted
    }

    /// True if `time` is closer than the minimum gap to any admitted onset.
    fn too_close(&self, admitted: &[f32], time: f32) -> bool {
        let pos = admitted.partition_point(|&t| t < time);
        if pos > 0 && (time - admitted[pos - 1]) < self.min_gap {
            return true;
        }
        if pos < admitted.len() && (admitted[pos] - time) < self.min_gap {
            return true;
        }
        false
    }
}
