use crate::types::EnergyPhrase;
use rand::rngs::StdRng;
use rand::Rng;

/// Trailing buffer reserved after the valid end zone, in seconds.
const TAIL_BUFFER: f32 = 2.5;

/// Width of the candidate density buckets.
const BUCKET_LEN: f32 = 1.0;

/// Buckets at or above this share of the average count are candidates.
const CANDIDATE_RATIO: f32 = 0.8;

/// Drawn phrase length range and the minimum span kept after clamping.
const PHRASE_MIN: f32 = 4.0;
const PHRASE_MAX: f32 = 8.0;
const CLAMPED_MIN: f32 = 2.0;

/// Minimum spacing between the end of one phrase and the start of the next.
const COOLDOWN: f32 = 15.0;

/// Periodic fallback parameters.
const FALLBACK_OFFSET: f32 = 15.0;
const FALLBACK_PERIOD: f32 = 30.0;
const FALLBACK_LEN: f32 = 6.0;
const FALLBACK_MARGIN: f32 = 5.0;

/// Selects non-overlapping high-density windows as bonus-energy phrases.
///
/// Greedy over 1 s density buckets; when the song is long enough but the
/// greedy pass yields fewer than two phrases, falls back to periodic
/// placement so every long song carries some bonus opportunity.
pub struct EnergyPhrasePlacer;

impl EnergyPhrasePlacer {
    /// `times` must be ascending note-start times of the top tier.
    pub fn place(times: &[f32], duration: f32, rng: &mut StdRng) -> Vec<EnergyPhrase> {
        let (first, last) = match (times.first(), times.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Vec::new(),
        };

        let valid_end = last - TAIL_BUFFER;
        if valid_end <= first {
            return Vec::new();
        }

        let bucket_count = ((valid_end - first) / BUCKET_LEN).ceil() as usize;
        let mut counts = vec![0u32; bucket_count];
        for &t in times {
            if t < first || t >= valid_end {
                continue;
            }
            let idx = ((t - first) / BUCKET_LEN) as usize;
            if idx < bucket_count {
                counts[idx] += 1;
            }
        }

        let avg = counts.iter().sum::<u32>() as f32 / bucket_count as f32;
        let threshold = avg * CANDIDATE_RATIO;

        let mut phrases = Vec::new();
        let mut cooldown_until = f32::NEG_INFINITY;

        for (i, &count) in counts.iter().enumerate() {
            if (count as f32) < threshold {
                continue;
            }
            let start = first + i as f32 * BUCKET_LEN;
            if start < cooldown_until {
                continue;
            }

            let length = rng.gen_range(PHRASE_MIN..=PHRASE_MAX);
            let end = (start + length).min(valid_end);
            if end - start < CLAMPED_MIN {
                continue;
            }

            phrases.push(EnergyPhrase { start, end });
            cooldown_until = end + COOLDOWN;
        }

        if phrases.len() < 2 && duration > 60.0 {
            log::debug!(
                "greedy pass placed {} phrase(s), falling back to periodic placement",
                phrases.len()
            );
            phrases = Self::periodic(first, valid_end);
        }

        phrases
    }

    fn periodic(first: f32, valid_end: f32) -> Vec<EnergyPhrase> {
        let mut phrases = Vec::new();
        let mut start = first + FALLBACK_OFFSET;
        while start + FALLBACK_LEN <= valid_end - FALLBACK_MARGIN {
            phrases.push(EnergyPhrase { start, end: start + FALLBACK_LEN });
            start += FALLBACK_PERIOD;
        }
        phrases
    }
}
