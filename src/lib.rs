pub mod density_filter;
pub mod energy;
pub mod exporter;
pub mod lane_assigner;
pub mod quantizer;
pub mod reducer;
pub mod sections;
pub mod stats;
pub mod synthesizer;
pub mod types;

use density_filter::OnsetDensityFilter;
use energy::EnergyPhrasePlacer;
use lane_assigner::LaneAssigner;
use quantizer::BeatGridQuantizer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reducer::DifficultyReducer;
use sections::SectionSegmenter;
use serde::{Deserialize, Serialize};
use stats::{ChartStats, StatsConfig, StatsEngine};
use synthesizer::NoteSynthesizer;

pub use quantizer::GridSnap;
pub use reducer::TierGaps;
pub use types::{DensityBucket, EnergyPhrase, NoteEvent, Onset, Section, SectionOverride, Tier};

/// Width of the density-profile buckets fed to the section segmenter.
const PROFILE_STEP: f32 = 1.0;

/// Generation parameters. Probabilities are clamped to [0, 1] on entry;
/// `seed` fixes every stochastic decision for the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartConfig {
    pub max_notes_per_second: f32,
    pub min_gap_ms: f32,
    pub seed: u64,
    pub allow_top_lane: bool,
    pub chord_probability: f32,
    pub sustain_bias: f32,
    pub grid_snap: GridSnap,
    pub movement_bias: f32,
    pub tier_min_gap_ms: TierGapConfig,
}

/// Per-tier minimum gaps used by the reduction cascade, in milliseconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TierGapConfig {
    pub hard: f32,
    pub medium: f32,
    pub easy: f32,
}

impl Default for TierGapConfig {
    fn default() -> Self {
        let gaps = TierGaps::default();
        TierGapConfig { hard: gaps.hard_ms, medium: gaps.medium_ms, easy: gaps.easy_ms }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            max_notes_per_second: 6.0,
            min_gap_ms: 80.0,
            seed: 0,
            allow_top_lane: true,
            chord_probability: 0.12,
            sustain_bias: 0.35,
            grid_snap: GridSnap::Sixteenth,
            movement_bias: 0.35,
            tier_min_gap_ms: TierGapConfig::default(),
        }
    }
}

impl ChartConfig {
    fn normalized(mut self) -> Self {
        self.max_notes_per_second = self.max_notes_per_second.max(0.0);
        self.min_gap_ms = self.min_gap_ms.max(0.0);
        self.chord_probability = self.chord_probability.clamp(0.0, 1.0);
        self.sustain_bias = self.sustain_bias.clamp(0.0, 1.0);
        self.movement_bias = self.movement_bias.clamp(0.0, 1.0);
        self
    }

    fn tier_gaps(&self) -> TierGaps {
        TierGaps {
            hard_ms: self.tier_min_gap_ms.hard,
            medium_ms: self.tier_min_gap_ms.medium,
            easy_ms: self.tier_min_gap_ms.easy,
        }
    }
}

/// Extracted audio features handed in by the upstream collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChartInput {
    pub onsets: Vec<Onset>,
    pub beats: Vec<f32>,
    /// Song length in seconds; derived from the features when non-positive.
    pub duration: f32,
}

impl ChartInput {
    fn effective_duration(&self) -> f32 {
        if self.duration > 0.0 {
            return self.duration;
        }
        let last_onset = self.onsets.iter().map(|o| o.time).fold(0.0f32, f32::max);
        let last_beat = self.beats.iter().copied().fold(0.0f32, f32::max);
        last_onset.max(last_beat)
    }
}

/// Machine-readable review payload produced by the analyze phase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Analysis {
    pub sections: Vec<Section>,
    pub density: Vec<DensityBucket>,
    pub phrases: Vec<EnergyPhrase>,
}

/// A complete multi-tier chart. Every tier owns its notes; lower tiers are
/// never views into higher ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chart {
    pub expert: Vec<NoteEvent>,
    pub hard: Vec<NoteEvent>,
    pub medium: Vec<NoteEvent>,
    pub easy: Vec<NoteEvent>,
    pub sections: Vec<Section>,
    pub phrases: Vec<EnergyPhrase>,
    pub stats: ChartStats,
}

struct FrontHalf {
    expert: Vec<NoteEvent>,
    sections: Vec<Section>,
    density: Vec<f32>,
    phrases: Vec<EnergyPhrase>,
}

/// The single-pass batch generator. One seeded `StdRng` per run drives every
/// stochastic stage, so equal input and config yield identical charts; the
/// generator itself holds no per-run state between calls.
pub struct ChartGenerator {
    config: ChartConfig,
}

impl ChartGenerator {
    pub fn new(config: ChartConfig) -> Self {
        ChartGenerator { config: config.normalized() }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Phase 1: run the front half of the pipeline (density filter through
    /// energy phrases) and expose the review payload. The caller persists
    /// this between phases; nothing is retained in memory here.
    pub fn analyze(&self, input: &ChartInput) -> Analysis {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let front = self.front_half(input, &mut rng);

        Analysis {
            sections: front.sections,
            density: front
                .density
                .iter()
                .enumerate()
                .map(|(i, &value)| DensityBucket { start: i as f32 * PROFILE_STEP, value })
                .collect(),
            phrases: front.phrases,
        }
    }

    /// Phase 2 with no edits: full pipeline, auto-detected sections.
    pub fn generate(&self, input: &ChartInput) -> Chart {
        self.generate_with_overrides(input, &[])
    }

    /// Phase 2: re-runs the front half deterministically (same seed, same
    /// result as `analyze`), merges section overrides, then runs the
    /// difficulty cascade and stats.
    pub fn generate_with_overrides(
        &self,
        input: &ChartInput,
        overrides: &[SectionOverride],
    ) -> Chart {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut front = self.front_half(input, &mut rng);

        sections::apply_overrides(&mut front.sections, overrides);

        let reducer = DifficultyReducer::new(self.config.tier_gaps());
        let (hard, medium, easy) = reducer.reduce_all(&front.expert, &mut rng);

        log::info!(
            "generated chart: {} expert / {} hard / {} medium / {} easy notes, {} sections, {} phrases",
            front.expert.len(),
            hard.len(),
            medium.len(),
            easy.len(),
            front.sections.len(),
            front.phrases.len()
        );

        let stats = StatsEngine::new(StatsConfig::default()).compute(
            &front.expert,
            &front.sections,
            input.effective_duration(),
        );

        Chart {
            expert: front.expert,
            hard,
            medium,
            easy,
            sections: front.sections,
            phrases: front.phrases,
            stats,
        }
    }

    /// Stages 1-6: filter, quantize, assign lanes, synthesize the Expert
    /// stream, then derive sections and energy phrases from its density.
    fn front_half(&self, input: &ChartInput, rng: &mut StdRng) -> FrontHalf {
        let duration = input.effective_duration();

        let filter =
            OnsetDensityFilter::new(self.config.max_notes_per_second, self.config.min_gap_ms);
        let filtered = filter.filter(&input.onsets);
        log::debug!("density filter admitted {} of {} onsets", filtered.len(), input.onsets.len());

        let quantizer = BeatGridQuantizer::new(&input.beats, self.config.grid_snap);
        let times = quantizer.quantize(&filtered);

        let mut assigner =
            LaneAssigner::new(self.config.movement_bias, self.config.allow_top_lane);
        let lanes = assigner.assign(&times, rng);

        let synth = NoteSynthesizer::new(
            self.config.sustain_bias,
            self.config.chord_probability,
            self.config.allow_top_lane,
        );
        let expert = synth.synthesize(&times, &lanes, rng);

        let density = note_density_profile(&expert, duration);
        let sections = SectionSegmenter::new(PROFILE_STEP).segment(&density, duration);

        let starts = unique_starts(&expert);
        let phrases = EnergyPhrasePlacer::place(&starts, duration, rng);

        FrontHalf { expert, sections, density, phrases }
    }
}

/// Note-start counts per fixed profile step over [0, duration]. Empty input
/// yields an empty profile so segmentation degrades to a single section.
fn note_density_profile(notes: &[NoteEvent], duration: f32) -> Vec<f32> {
    if notes.is_empty() || duration <= 0.0 {
        return Vec::new();
    }
    let count = (duration / PROFILE_STEP).ceil() as usize;
    let mut profile = vec![0.0f32; count];
    for note in notes {
        let idx = ((note.start.max(0.0) / PROFILE_STEP) as usize).min(count - 1);
        profile[idx] += 1.0;
    }
    profile
}

/// Distinct chord start times, ascending.
fn unique_starts(notes: &[NoteEvent]) -> Vec<f32> {
    let mut starts: Vec<f32> = notes.iter().map(|n| n.start).collect();
    starts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    starts.dedup();
    starts
}
