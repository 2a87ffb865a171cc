use crate::types::{Section, SectionOverride};

/// Seconds that must elapse after a transition before the next one.
const DEBOUNCE: f32 = 15.0;

/// Everything after `duration - OUTRO_WINDOW` classifies as outro.
const OUTRO_WINDOW: f32 = 20.0;

/// High/low density thresholds relative to the profile average.
const HIGH_RATIO: f32 = 1.5;
const LOW_RATIO: f32 = 0.8;

/// Solo classification: position window within the song and the share of
/// the peak density a bucket must reach.
const SOLO_POS_MIN: f32 = 0.40;
const SOLO_POS_MAX: f32 = 0.90;
const SOLO_PEAK_RATIO: f32 = 0.65;

/// Overrides are matched to the nearest auto section within this many
/// seconds.
const OVERRIDE_MATCH_TOLERANCE: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Label {
    Intro,
    Verse,
    Bridge,
    Chorus,
    GuitarSolo,
    Outro,
}

impl Label {
    fn name(self) -> &'static str {
        match self {
            Label::Intro => "Intro",
            Label::Verse => "Verse",
            Label::Bridge => "Bridge",
            Label::Chorus => "Chorus",
            Label::GuitarSolo => "Guitar Solo",
            Label::Outro => "Outro",
        }
    }
}

/// Classifies a density profile into labeled structural regions.
///
/// A label-smoothing heuristic over relative density thresholds: the walk
/// starts in Intro at t=0 and a new section is appended only when the
/// classified label changes and the debounce window has elapsed.
pub struct SectionSegmenter {
    pub step: f32, // seconds per profile bucket
}

impl SectionSegmenter {
    pub fn new(step: f32) -> Self {
        SectionSegmenter { step: step.max(0.001) }
    }

    pub fn segment(&self, profile: &[f32], duration: f32) -> Vec<Section> {
        if profile.is_empty() {
            return vec![Section { name: "Song".to_string(), start: 0.0 }];
        }

        let avg = profile.iter().sum::<f32>() / profile.len() as f32;
        let peak = profile.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let high = avg * HIGH_RATIO;
        let low = avg * LOW_RATIO;

        let mut sections = vec![Section { name: Label::Intro.name().to_string(), start: 0.0 }];
        let mut current = Label::Intro;
        let mut last_transition = 0.0f32;

        for (i, &density) in profile.iter().enumerate() {
            let t = i as f32 * self.step;
            if t - last_transition < DEBOUNCE {
                continue;
            }

            let label = classify(t, density, duration, high, low, peak);
            if label != current {
                current = label;
                last_transition = t;
                sections.push(Section { name: label.name().to_string(), start: t });
            }
        }

        sections
    }
}

fn classify(t: f32, density: f32, duration: f32, high: f32, low: f32, peak: f32) -> Label {
    if t > duration - OUTRO_WINDOW {
        Label::Outro
    } else if density > high {
        let pos = if duration > 0.0 { t / duration } else { 0.0 };
        if pos > SOLO_POS_MIN && pos < SOLO_POS_MAX && density > peak * SOLO_PEAK_RATIO {
            Label::GuitarSolo
        } else {
            Label::Chorus
        }
    } else if density < low {
        Label::Verse
    } else {
        Label::Bridge
    }
}

/// Merge caller-supplied renames into the auto-detected section list.
/// Malformed or unmatched entries are logged and skipped, never fatal.
pub fn apply_overrides(sections: &mut [Section], overrides: &[SectionOverride]) {
    for ov in overrides {
        if !ov.start.is_finite() || ov.start < 0.0 || ov.name.trim().is_empty() {
            log::warn!("ignoring malformed section override: {:?}", ov);
            continue;
        }

        let nearest = sections.iter_mut().min_by(|a, b| {
            let da = (a.start - ov.start).abs();
            let db = (b.start - ov.start).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });

        match nearest {
            Some(section) if (section.start - ov.start).abs() <= OVERRIDE_MATCH_TOLERANCE => {
                log::debug!(
                    "section at {:.2}s renamed {:?} -> {:?}",
                    section.start,
                    section.name,
                    ov.name
                );
                section.name = ov.name.trim().to_string();
            }
            _ => {
                log::warn!("section override at {:.2}s matches no section, ignored", ov.start);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile_yields_song_section() {
        let segmenter = SectionSegmenter::new(1.0);
        let sections = segmenter.segment(&[], 120.0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Song");
        assert_eq!(sections[0].start, 0.0);
    }

    #[test]
    fn test_high_density_middle_classifies_chorus_or_solo() {
        // Step 10 s, duration 90 s: the dense triple sits at t = 30..50,
        // position ratio 0.33..0.56 — straddles the solo window boundary.
        let profile = vec![1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0];
        let segmenter = SectionSegmenter::new(10.0);
        let sections = segmenter.segment(&profile, 90.0);

        assert!(sections
            .iter()
            .any(|s| s.name == "Chorus" || s.name == "Guitar Solo"));
    }

    #[test]
    fn test_sections_sorted_and_non_overlapping() {
        let profile: Vec<f32> = (0..240).map(|i| if (i / 40) % 2 == 0 { 0.5 } else { 6.0 }).collect();
        let segmenter = SectionSegmenter::new(1.0);
        let sections = segmenter.segment(&profile, 240.0);

        assert_eq!(sections[0].start, 0.0);
        for pair in sections.windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn test_debounce_spaces_transitions() {
        // Alternating buckets would flip every second without the debounce.
        let profile: Vec<f32> = (0..200)
            .map(|i| if i % 2 == 0 { 0.1 } else { 9.0 })
            .collect();
        let segmenter = SectionSegmenter::new(1.0);
        let sections = segmenter.segment(&profile, 200.0);

        for pair in sections.windows(2) {
            assert!(pair[1].start - pair[0].start >= DEBOUNCE);
        }
    }

    #[test]
    fn test_tail_classifies_outro() {
        let mut profile = vec![2.0f32; 120];
        // dense tail would otherwise read as chorus
        for v in profile.iter_mut().skip(110) {
            *v = 9.0;
        }
        let segmenter = SectionSegmenter::new(1.0);
        let sections = segmenter.segment(&profile, 120.0);
        assert_eq!(sections.last().unwrap().name, "Outro");
    }

    #[test]
    fn test_override_renames_nearest_section() {
        let mut sections = vec![
            Section { name: "Intro".to_string(), start: 0.0 },
            Section { name: "Verse".to_string(), start: 20.0 },
        ];
        let overrides = vec![SectionOverride { start: 20.4, name: "Drop".to_string() }];
        apply_overrides(&mut sections, &overrides);
        assert_eq!(sections[1].name, "Drop");
        assert_eq!(sections[0].name, "Intro");
    }

    #[test]
    fn test_malformed_overrides_ignored() {
        let mut sections = vec![Section { name: "Intro".to_string(), start: 0.0 }];
        let overrides = vec![
            SectionOverride { start: f32::NAN, name: "X".to_string() },
            SectionOverride { start: -3.0, name: "Y".to_string() },
            SectionOverride { start: 0.0, name: "   ".to_string() },
            SectionOverride { start: 500.0, name: "Z".to_string() },
        ];
        apply_overrides(&mut sections, &overrides);
        assert_eq!(sections[0].name, "Intro");
    }
}
