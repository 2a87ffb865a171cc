use crate::types::{NoteEvent, Tier};
use rand::rngs::StdRng;
use rand::Rng;

/// Chance of shifting a clamped max-lane note down by one on the two
/// lowest tiers.
const DOWNSHIFT_PROBABILITY: f32 = 0.4;

/// Hard keeps at most this many simultaneous notes.
const HARD_CHORD_CAP: usize = 2;

/// When a Hard reduction keeps at least this share of the source notes,
/// every 8th note is dropped to force a perceptible tier delta.
const ANTI_DUP_RATIO: f32 = 0.95;
const ANTI_DUP_STRIDE: usize = 8;

/// Per-stage minimum gaps between accepted chord anchors, in ms.
#[derive(Clone, Copy, Debug)]
pub struct TierGaps {
    pub hard_ms: f32,
    pub medium_ms: f32,
    pub easy_ms: f32,
}

impl Default for TierGaps {
    fn default() -> Self {
        TierGaps { hard_ms: 120.0, medium_ms: 220.0, easy_ms: 450.0 }
    }
}

impl TierGaps {
    fn for_tier(&self, tier: Tier) -> f32 {
        let ms = match tier {
            Tier::Hard => self.hard_ms,
            Tier::Medium => self.medium_ms,
            Tier::Easy => self.easy_ms,
            Tier::Expert => 0.0,
        };
        (ms / 1000.0).max(0.0)
    }
}

/// Derives the three easier tiers from the Expert stream via a cascade.
/// Each stage consumes the previous stage's already-reduced output and
/// builds a new owned list; no stage aliases or mutates its input.
pub struct DifficultyReducer {
    pub gaps: TierGaps,
}

impl DifficultyReducer {
    pub fn new(gaps: TierGaps) -> Self {
        DifficultyReducer { gaps }
    }

    /// Run the full Expert -> Hard -> Medium -> Easy cascade.
    pub fn reduce_all(
        &self,
        expert: &[NoteEvent],
        rng: &mut StdRng,
    ) -> (Vec<NoteEvent>, Vec<NoteEvent>, Vec<NoteEvent>) {
        let hard = self.reduce_stage(expert, Tier::Expert, Tier::Hard, rng);
        let medium = self.reduce_stage(&hard, Tier::Hard, Tier::Medium, rng);
        let easy = self.reduce_stage(&medium, Tier::Medium, Tier::Easy, rng);
        (hard, medium, easy)
    }

    /// One cascade stage: lane remap, min-gap filter, chord policy, then
    /// the Hard-only anti-duplication pass.
    pub fn reduce_stage(
        &self,
        source: &[NoteEvent],
        source_tier: Tier,
        target: Tier,
        rng: &mut StdRng,
    ) -> Vec<NoteEvent> {
        let remapped = self.remap_lanes(source, source_tier, target, rng);
        let spaced = self.filter_min_gap(remapped, target);
        let mut reduced = self.apply_chord_policy(spaced, target);

        if target == Tier::Hard && !source.is_empty() {
            let ratio = reduced.len() as f32 / source.len() as f32;
            if ratio >= ANTI_DUP_RATIO {
                log::debug!(
                    "hard reduction kept {:.0}% of expert notes, thinning every {}th",
                    ratio * 100.0,
                    ANTI_DUP_STRIDE
                );
                let mut i = 0usize;
                reduced.retain(|_| {
                    i += 1;
                    i % ANTI_DUP_STRIDE != 0
                });
            }
        }

        reduced
    }

    fn remap_lanes(
        &self,
        source: &[NoteEvent],
        source_tier: Tier,
        target: Tier,
        rng: &mut StdRng,
    ) -> Vec<NoteEvent> {
        let base = source_tier.pitch_base();
        let max_lane = target.max_lane();
        let downshift_tier = matches!(target, Tier::Medium | Tier::Easy);

        source
            .iter()
            .map(|note| {
                let pitch = base + note.lane;
                let mut lane = (pitch - base).min(max_lane);
                if downshift_tier && lane == max_lane && rng.gen::<f32>() < DOWNSHIFT_PROBABILITY {
                    lane -= 1;
                }
                NoteEvent { start: note.start, end: note.end, lane, tier: target }
            })
            .collect()
    }

    fn filter_min_gap(&self, mut notes: Vec<NoteEvent>, target: Tier) -> Vec<NoteEvent> {
        notes.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

        let min_gap = self.gaps.for_tier(target);
        let tolerance = target.chord_tolerance();
        let mut kept: Vec<NoteEvent> = Vec::new();
        // start time of the last accepted singular note (chord anchor)
        let mut anchor = f32::NEG_INFINITY;

        for note in notes {
            if let Some(prev) = kept.last() {
                if (note.start - prev.start).abs() <= tolerance {
                    kept.push(note);
                    continue;
                }
            }
            if note.start - anchor >= min_gap {
                anchor = note.start;
                kept.push(note);
            }
        }

        kept
    }

    fn apply_chord_policy(&self, notes: Vec<NoteEvent>, target: Tier) -> Vec<NoteEvent> {
        let tolerance = target.chord_tolerance();
        let mut out: Vec<NoteEvent> = Vec::with_capacity(notes.len());
        let mut group: Vec<NoteEvent> = Vec::new();

        for note in notes {
            let same_group = group
                .first()
                .map_or(false, |head| (note.start - head.start).abs() <= tolerance);
            if !same_group && !group.is_empty() {
                Self::flush_group(&mut out, &mut group, target);
            }
            group.push(note);
        }
        Self::flush_group(&mut out, &mut group, target);

        out
    }

    fn flush_group(out: &mut Vec<NoteEvent>, group: &mut Vec<NoteEvent>, target: Tier) {
        match target {
            Tier::Hard => {
                // drop duplicate lanes produced by clamping, then cap
                let mut seen: Vec<u8> = Vec::new();
                for note in group.iter() {
                    if seen.contains(&note.lane) {
                        continue;
                    }
                    if seen.len() >= HARD_CHORD_CAP {
                        break;
                    }
                    seen.push(note.lane);
                    out.push(*note);
                }
            }
            Tier::Medium | Tier::Easy => {
                if let Some(first) = group.first() {
                    out.push(*first);
                }
            }
            Tier::Expert => out.extend(group.iter().copied()),
        }
        group.clear();
    }
}
