use crate::types::{NoteEvent, Tier};
use rand::rngs::StdRng;
use rand::Rng;

/// Gap assumed after the final onset, in seconds.
const TAIL_GAP: f32 = 2.0;

/// Minimum gap before a note is eligible to become a sustain.
const SUSTAIN_MIN_GAP: f32 = 0.4;

/// Turns quantized (time, lane) pairs into concrete top-tier notes,
/// deciding sustain length and chord formation per onset.
#[derive(Clone, Debug)]
pub struct NoteSynthesizer {
    pub sustain_bias: f32,
    pub chord_probability: f32,
    pub allow_top_lane: bool,
}

impl NoteSynthesizer {
    pub fn new(sustain_bias: f32, chord_probability: f32, allow_top_lane: bool) -> Self {
        NoteSynthesizer {
            sustain_bias: sustain_bias.clamp(0.0, 1.0),
            chord_probability: chord_probability.clamp(0.0, 1.0),
            allow_top_lane,
        }
    }

    /// Synthesize the Expert note stream. `times` and `lanes` are parallel
    /// and time-ascending; all notes for one onset share a start time.
    pub fn synthesize(&self, times: &[f32], lanes: &[u8], rng: &mut StdRng) -> Vec<NoteEvent> {
        let mut notes = Vec::with_capacity(times.len());

        for (i, (&start, &lane)) in times.iter().zip(lanes.iter()).enumerate() {
            let gap = match times.get(i + 1) {
                Some(&next) => next - start,
                None => TAIL_GAP,
            };

            let duration = self.pick_duration(gap, rng);
            let end = start + duration;

            notes.push(NoteEvent { start, end, lane, tier: Tier::Expert });

            if rng.gen::<f32>() < self.chord_probability {
                if let Some(second) = self.pick_chord_lane(lane, rng) {
                    notes.push(NoteEvent { start, end, lane: second, tier: Tier::Expert });
                }
            }
        }

        notes
    }

    fn pick_duration(&self, gap: f32, rng: &mut StdRng) -> f32 {
        if gap > SUSTAIN_MIN_GAP && rng.gen::<f32>() < self.sustain_bias {
            (gap - 0.1).max(0.0)
        } else {
            (gap - 0.05).min(0.15).max(0.0)
        }
    }

    /// Pick an adjacent lane for the chord partner, clipped to the allowed
    /// lane set. Returns None only when no adjacent lane is legal.
    fn pick_chord_lane(&self, primary: u8, rng: &mut StdRng) -> Option<u8> {
        let max = if self.allow_top_lane { 4u8 } else { 3u8 };
        let up = primary + 1;
        let down = primary.checked_sub(1);

        let up_ok = up <= max;
        match (up_ok, down) {
            (true, Some(down)) => Some(if rng.gen_bool(0.5) { up } else { down }),
            (true, None) => Some(up),
            (false, Some(down)) => Some(down),
            (false, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn spread(n: usize, step: f32) -> Vec<f32> {
        (0..n).map(|i| i as f32 * step).collect()
    }

    #[test]
    fn test_ends_never_precede_starts() {
        let mut rng = StdRng::seed_from_u64(5);
        let times = spread(50, 0.11);
        let lanes = vec![2u8; 50];
        let synth = NoteSynthesizer::new(0.8, 0.5, true);
        for note in synth.synthesize(&times, &lanes, &mut rng) {
            assert!(note.end >= note.start);
        }
    }

    #[test]
    fn test_no_sustains_under_gap_threshold() {
        let mut rng = StdRng::seed_from_u64(5);
        // 0.3 s gaps are below the 0.4 s eligibility cutoff.
        let times = spread(20, 0.3);
        let lanes = vec![1u8; 20];
        let synth = NoteSynthesizer::new(1.0, 0.0, true);
        for note in synth.synthesize(&times[..19], &lanes[..19], &mut rng) {
            // skip the last note, whose tail gap of 2 s allows a sustain
            if note.start < 5.3 {
                assert!(note.duration() <= 0.15 + 1e-6);
            }
        }
    }

    #[test]
    fn test_full_sustain_bias_holds_wide_gaps() {
        let mut rng = StdRng::seed_from_u64(5);
        let times = spread(10, 1.0);
        let lanes = vec![0u8; 10];
        let synth = NoteSynthesizer::new(1.0, 0.0, true);
        for note in synth.synthesize(&times, &lanes, &mut rng) {
            // every gap is 1.0 s (2.0 for the tail); sustain = gap - 0.1
            assert!(note.duration() >= 0.9 - 1e-6);
        }
    }

    #[test]
    fn test_chord_notes_share_start_and_end() {
        let mut rng = StdRng::seed_from_u64(11);
        let times = spread(40, 0.5);
        let lanes: Vec<u8> = (0..40).map(|i| (i % 5) as u8).collect();
        let synth = NoteSynthesizer::new(0.3, 1.0, true);
        let notes = synth.synthesize(&times, &lanes, &mut rng);

        // chord probability 1.0: every onset yields exactly two notes
        assert_eq!(notes.len(), 80);
        for pair in notes.chunks(2) {
            assert_eq!(pair[0].start, pair[1].start);
            assert_eq!(pair[0].end, pair[1].end);
            assert_eq!(pair[0].lane.abs_diff(pair[1].lane), 1);
        }
    }

    #[test]
    fn test_chord_partner_respects_top_lane_config() {
        let mut rng = StdRng::seed_from_u64(3);
        let times = spread(100, 0.5);
        let lanes = vec![3u8; 100];
        let synth = NoteSynthesizer::new(0.0, 1.0, false);
        for note in synth.synthesize(&times, &lanes, &mut rng) {
            assert!(note.lane <= 3);
        }
    }

    #[test]
    fn test_empty_input_degrades() {
        let mut rng = StdRng::seed_from_u64(0);
        let synth = NoteSynthesizer::new(0.5, 0.5, true);
        assert!(synth.synthesize(&[], &[], &mut rng).is_empty());
    }
}
