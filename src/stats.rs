use crate::types::{DensityBucket, NoteEvent, Section};
use serde::{Deserialize, Serialize};

/// Tuning for the derived metrics. Callers pick the chord tolerance to match
/// the tier they are inspecting (1-12 ms is the useful range).
#[derive(Clone, Copy, Debug)]
pub struct StatsConfig {
    pub chord_tolerance: f32,
    pub sustain_min_duration: f32,
    pub bucket_width: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            chord_tolerance: 0.005,
            sustain_min_duration: 0.1,
            bucket_width: 15.0,
        }
    }
}

/// Per-section summary, derived and read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectionStats {
    pub name: String,
    pub start: f32,
    pub end: f32,
    pub note_count: usize,
    pub chord_count: usize,
    pub avg_nps: f32,
    pub max_nps_1s: usize,
}

/// Aggregate metrics over one note stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChartStats {
    pub total_notes: usize,
    pub chord_count: usize,
    pub sustain_count: usize,
    pub max_nps_1s: usize,
    pub avg_nps: f32,
    pub lane_counts: [usize; 5],
    pub buckets: Vec<DensityBucket>,
    pub sections: Vec<SectionStats>,
}

/// Windowed and aggregate metrics over any note stream. Pure functions of
/// their inputs; the note list is never mutated.
pub struct StatsEngine {
    pub config: StatsConfig,
}

impl StatsEngine {
    pub fn new(config: StatsConfig) -> Self {
        StatsEngine { config }
    }

    pub fn compute(
        &self,
        notes: &[NoteEvent],
        sections: &[Section],
        duration: f32,
    ) -> ChartStats {
        if notes.is_empty() {
            return ChartStats::default();
        }

        let mut starts: Vec<f32> = notes.iter().map(|n| n.start).collect();
        starts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut lane_counts = [0usize; 5];
        let mut sustain_count = 0usize;
        for note in notes {
            if let Some(slot) = lane_counts.get_mut(note.lane as usize) {
                *slot += 1;
            }
            if note.is_sustain(self.config.sustain_min_duration) {
                sustain_count += 1;
            }
        }

        let first_start = starts[0];
        let last_end = notes
            .iter()
            .map(|n| n.end)
            .fold(f32::NEG_INFINITY, f32::max);
        let span = last_end - first_start;
        let avg_nps = if span > f32::EPSILON {
            notes.len() as f32 / span
        } else {
            0.0
        };

        ChartStats {
            total_notes: notes.len(),
            chord_count: count_chords(&starts, self.config.chord_tolerance),
            sustain_count,
            max_nps_1s: max_window_count(&starts),
            avg_nps,
            lane_counts,
            buckets: self.bucket_counts(&starts, duration),
            sections: self.section_breakdown(&starts, sections, duration),
        }
    }

    fn bucket_counts(&self, starts: &[f32], duration: f32) -> Vec<DensityBucket> {
        let width = self.config.bucket_width.max(0.001);
        let total = duration.max(starts.last().copied().unwrap_or(0.0));
        let count = (total / width).ceil().max(1.0) as usize;

        let mut buckets: Vec<DensityBucket> = (0..count)
            .map(|i| DensityBucket { start: i as f32 * width, value: 0.0 })
            .collect();
        for &t in starts {
            let idx = ((t.max(0.0) / width) as usize).min(count - 1);
            buckets[idx].value += 1.0;
        }
        buckets
    }

    fn section_breakdown(
        &self,
        starts: &[f32],
        sections: &[Section],
        duration: f32,
    ) -> Vec<SectionStats> {
        let mut out = Vec::with_capacity(sections.len());
        for (i, section) in sections.iter().enumerate() {
            let end = sections
                .get(i + 1)
                .map(|next| next.start)
                .unwrap_or_else(|| duration.max(section.start));

            let lo = starts.partition_point(|&t| t < section.start);
            let hi = starts.partition_point(|&t| t < end);
            let slice = &starts[lo..hi];

            let span = end - section.start;
            out.push(SectionStats {
                name: section.name.clone(),
                start: section.start,
                end,
                note_count: slice.len(),
                chord_count: count_chords(slice, self.config.chord_tolerance),
                avg_nps: if span > f32::EPSILON {
                    slice.len() as f32 / span
                } else {
                    0.0
                },
                max_nps_1s: max_window_count(slice),
            });
        }
        out
    }
}

/// Number of simultaneous-start groups of size >= 2 (sorted starts).
fn count_chords(starts: &[f32], tolerance: f32) -> usize {
    let mut chords = 0usize;
    let mut i = 0usize;
    while i < starts.len() {
        let mut j = i + 1;
        while j < starts.len() && (starts[j] - starts[i]) <= tolerance {
            j += 1;
        }
        if j - i >= 2 {
            chords += 1;
        }
        i = j;
    }
    chords
}

/// Max notes in any 1 s window via a two-pointer sweep over sorted starts.
fn max_window_count(starts: &[f32]) -> usize {
    let mut best = 0usize;
    let mut j = 0usize;
    for i in 0..starts.len() {
        if j < i {
            j = i;
        }
        while j < starts.len() && starts[j] < starts[i] + 1.0 {
            j += 1;
        }
        best = best.max(j - i);
    }
    best
}
