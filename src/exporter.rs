use crate::types::{EnergyPhrase, NoteEvent, Section, Tier};
use crate::Chart;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Pulses per quarter note shared by both export conventions.
pub const RESOLUTION: u32 = 192;

/// Convert seconds to tempo-mapped ticks. Negative inputs clamp to zero.
pub fn seconds_to_ticks(seconds: f32, bpm: f32) -> u32 {
    let ticks = (seconds * bpm * RESOLUTION as f32 / 60.0).round();
    if ticks.is_finite() && ticks > 0.0 {
        ticks as u32
    } else {
        0
    }
}

/// Estimate a tempo from beat timestamps via the mean inter-beat interval,
/// clamped to a playable range. Defaults to 120 with fewer than 2 beats.
pub fn estimate_bpm(beats: &[f32]) -> f32 {
    if beats.len() < 2 {
        return 120.0;
    }

    let mut intervals = Vec::new();
    for pair in beats.windows(2).take(40) {
        let interval = pair[1] - pair[0];
        if interval > 0.0 {
            intervals.push(interval);
        }
    }
    if intervals.is_empty() {
        return 120.0;
    }

    let avg = intervals.iter().sum::<f32>() / intervals.len() as f32;
    (60.0 / avg).clamp(60.0, 240.0)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TierExport {
    pub tier: Tier,
    pub lanes: u8,
    pub notes: Vec<NoteTickExport>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NoteTickExport {
    pub tick: u32,
    pub lane: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub length: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// The full serializable chart package handed to downstream consumers.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChartExport {
    pub song_id: String,
    pub bpm: f32,
    pub resolution: u32,
    pub generated_at: i64,
    pub tiers: Vec<TierExport>,
    pub sections: Vec<SectionTickExport>,
    pub phrases: Vec<PhraseTickExport>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SectionTickExport {
    pub tick: u32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PhraseTickExport {
    pub tick: u32,
    pub length: u32,
}

impl ChartExport {
    pub fn new(song_id: String, bpm: f32, chart: &Chart) -> Self {
        let generated_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let tiers = [
            (Tier::Expert, &chart.expert),
            (Tier::Hard, &chart.hard),
            (Tier::Medium, &chart.medium),
            (Tier::Easy, &chart.easy),
        ]
        .into_iter()
        .map(|(tier, notes)| TierExport {
            tier,
            lanes: tier.lane_count(),
            notes: notes.iter().map(|n| note_ticks(n, bpm)).collect(),
        })
        .collect();

        ChartExport {
            song_id,
            bpm,
            resolution: RESOLUTION,
            generated_at,
            tiers,
            sections: chart
                .sections
                .iter()
                .map(|s| section_ticks(s, bpm))
                .collect(),
            phrases: chart.phrases.iter().map(|p| phrase_ticks(p, bpm)).collect(),
        }
    }

    /// Export as a JSON payload.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize chart export")
    }

    /// Export as the tick-based text chart format: one tempo marker in
    /// `[SyncTrack]`, section markers in `[Events]`, one `[<Tier>Single]`
    /// block per tier with energy-phrase spans.
    pub fn to_chart(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "[Song]\n{{");
        let _ = writeln!(out, "  Name = \"{}\"", self.song_id);
        let _ = writeln!(out, "  Resolution = {}", self.resolution);
        let _ = writeln!(out, "}}");

        let _ = writeln!(out, "[SyncTrack]\n{{");
        let _ = writeln!(out, "  0 = TS 4");
        let _ = writeln!(out, "  0 = B {}", (self.bpm * 1000.0).round() as u32);
        let _ = writeln!(out, "}}");

        let _ = writeln!(out, "[Events]\n{{");
        for section in &self.sections {
            let _ = writeln!(out, "  {} = E \"section {}\"", section.tick, section.name);
        }
        let _ = writeln!(out, "}}");

        for tier in &self.tiers {
            let _ = writeln!(out, "[{}Single]\n{{", tier.tier.name());
            let mut lines: Vec<(u32, String)> = tier
                .notes
                .iter()
                .map(|n| (n.tick, format!("  {} = N {} {}", n.tick, n.lane, n.length)))
                .collect();
            for phrase in &self.phrases {
                lines.push((
                    phrase.tick,
                    format!("  {} = S 2 {}", phrase.tick, phrase.length),
                ));
            }
            lines.sort_by_key(|(tick, _)| *tick);
            for (_, line) in lines {
                let _ = writeln!(out, "{}", line);
            }
            let _ = writeln!(out, "}}");
        }

        out
    }

    pub fn save(&self, path: &Path, format: ChartFormat) -> Result<()> {
        let content = match format {
            ChartFormat::Json => self.to_json()?,
            ChartFormat::Chart => self.to_chart(),
        };
        std::fs::write(path, content)
            .with_context(|| format!("write chart to {}", path.display()))?;
        Ok(())
    }
}

fn note_ticks(note: &NoteEvent, bpm: f32) -> NoteTickExport {
    let tick = seconds_to_ticks(note.start, bpm);
    let end = seconds_to_ticks(note.end, bpm);
    NoteTickExport { tick, lane: note.lane, length: end.saturating_sub(tick) }
}

fn section_ticks(section: &Section, bpm: f32) -> SectionTickExport {
    SectionTickExport {
        tick: seconds_to_ticks(section.start, bpm),
        name: section.name.clone(),
    }
}

fn phrase_ticks(phrase: &EnergyPhrase, bpm: f32) -> PhraseTickExport {
    let tick = seconds_to_ticks(phrase.start, bpm);
    let end = seconds_to_ticks(phrase.end, bpm);
    PhraseTickExport { tick, length: end.saturating_sub(tick) }
}

#[derive(Clone, Copy, Debug)]
pub enum ChartFormat {
    Json,
    Chart,
}

impl ChartFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ChartFormat::Json),
            "chart" => Some(ChartFormat::Chart),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Json => "json",
            ChartFormat::Chart => "chart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ChartStats;

    fn sample_chart() -> Chart {
        let note = |start: f32, lane: u8, tier: Tier| NoteEvent {
            start,
            end: start,
            lane,
            tier,
        };
        Chart {
            expert: vec![note(0.5, 2, Tier::Expert), note(1.0, 3, Tier::Expert)],
            hard: vec![note(0.5, 2, Tier::Hard)],
            medium: vec![note(0.5, 2, Tier::Medium)],
            easy: vec![note(0.5, 2, Tier::Easy)],
            sections: vec![Section { name: "Intro".to_string(), start: 0.0 }],
            phrases: vec![EnergyPhrase { start: 0.5, end: 4.5 }],
            stats: ChartStats::default(),
        }
    }

    #[test]
    fn test_tick_conversion() {
        // 1 beat at 120 BPM = 0.5 s = 192 ticks
        assert_eq!(seconds_to_ticks(0.5, 120.0), 192);
        assert_eq!(seconds_to_ticks(0.0, 120.0), 0);
    }

    #[test]
    fn test_negative_ticks_clamp_to_zero() {
        assert_eq!(seconds_to_ticks(-1.0, 120.0), 0);
    }

    #[test]
    fn test_estimate_bpm() {
        assert!((estimate_bpm(&[0.0, 0.5, 1.0, 1.5]) - 120.0).abs() < 1.0);
        assert_eq!(estimate_bpm(&[0.0]), 120.0);
        // out-of-range tempos clamp
        assert_eq!(estimate_bpm(&[0.0, 2.0, 4.0]), 60.0);
    }

    #[test]
    fn test_json_export_round_trips() {
        let export = ChartExport::new("demo".to_string(), 120.0, &sample_chart());
        let json = export.to_json().unwrap();
        let back: ChartExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.song_id, "demo");
        assert_eq!(back.resolution, RESOLUTION);
        assert_eq!(back.tiers.len(), 4);
        assert_eq!(back.tiers[0].notes[0].tick, 192);
    }

    #[test]
    fn test_chart_text_has_markers() {
        let export = ChartExport::new("demo".to_string(), 120.0, &sample_chart());
        let text = export.to_chart();
        assert!(text.contains("Resolution = 192"));
        assert!(text.contains("0 = B 120000"));
        assert!(text.contains("E \"section Intro\""));
        assert!(text.contains("[ExpertSingle]"));
        assert!(text.contains("[EasySingle]"));
        assert!(text.contains("S 2"));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.chart");
        let export = ChartExport::new("demo".to_string(), 120.0, &sample_chart());
        export.save(&path, ChartFormat::Chart).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[Song]"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ChartFormat::from_str("json").unwrap().extension(), "json");
        assert_eq!(ChartFormat::from_str("chart").unwrap().extension(), "chart");
        assert!(ChartFormat::from_str("midi").is_none());
    }
}
