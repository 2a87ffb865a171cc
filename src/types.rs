use serde::{Deserialize, Serialize};

/// A detected musical attack, produced by the external feature extractor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Onset {
    pub time: f32,     // seconds
    pub strength: f32, // >= 0, relative onset energy
}

/// Difficulty tier, hardest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Expert,
    Hard,
    Medium,
    Easy,
}

impl Tier {
    /// Number of playable lanes for this tier. Each lower tier's lane set is
    /// a subset of the previous tier's.
    pub fn lane_count(self) -> u8 {
        match self {
            Tier::Expert | Tier::Hard => 5,
            Tier::Medium => 4,
            Tier::Easy => 3,
        }
    }

    pub fn max_lane(self) -> u8 {
        self.lane_count() - 1
    }

    /// Base MIDI pitch of lane 0 for this tier. Lane n maps to pitch
    /// `base + n`; the reducer converts back with `pitch - base`.
    pub fn pitch_base(self) -> u8 {
        match self {
            Tier::Expert => 96,
            Tier::Hard => 84,
            Tier::Medium => 72,
            Tier::Easy => 60,
        }
    }

    /// Start-time tolerance under which two notes count as one chord.
    pub fn chord_tolerance(self) -> f32 {
        match self {
            Tier::Expert | Tier::Hard => 0.010,
            Tier::Medium => 0.030,
            Tier::Easy => 0.050,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Expert => "Expert",
            Tier::Hard => "Hard",
            Tier::Medium => "Medium",
            Tier::Easy => "Easy",
        }
    }
}

/// A single chart note. Notes sharing an identical start time form a chord.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NoteEvent {
    pub start: f32,
    pub end: f32, // >= start; end - start == 0 for taps
    pub lane: u8,
    pub tier: Tier,
}

impl NoteEvent {
    pub fn duration(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Sustains are held inputs; anything shorter reads as a tap.
    pub fn is_sustain(&self, min_duration: f32) -> bool {
        self.duration() >= min_duration
    }
}

/// A named structural region of the song.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub start: f32,
}

/// A bounded span flagged as a bonus-scoring opportunity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyPhrase {
    pub start: f32,
    pub end: f32, // > start
}

/// Caller-supplied rename for an auto-detected section. Malformed entries
/// are logged and skipped, never fatal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectionOverride {
    pub start: f32,
    pub name: String,
}

/// One fixed-width window of a density profile. `value` is a note count or
/// NPS figure depending on the producer; derived data, not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityBucket {
    pub start: f32,
    pub value: f32,
}
