use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub decisions: DecisionTelemetrySummary,
    pub gestures: GestureTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct DecisionTelemetrySummary {
    pub count: usize,
    pub acted: usize,
    pub joker_taunts: usize,
    pub avg_act_chance: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub phase_counts: BTreeMap<String, usize>,
    pub action_counts: BTreeMap<String, usize>,
    pub reason_counts: BTreeMap<String, usize>,
}

impl DecisionTelemetrySummary {
    pub fn acted_rate(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.acted as f64 / self.count as f64)
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct GestureTelemetrySummary {
    pub classified: usize,
    pub dropped: usize,
    pub action_counts: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate the decision and gesture events written by the JSON subscriber.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut decisions = DecisionTelemetrySummary::default();
    let mut chance_avg = Average::new();
    let mut pressure_avg = Average::new();
    let mut gestures = GestureTelemetrySummary::default();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            // weight dumps are not decisions
            "bluff_bot::decision" if fields.contains_key("stage") => {}
            "bluff_bot::decision" => {
                decisions.count += 1;
                if fields.get("acted").and_then(Value::as_bool) == Some(true) {
                    decisions.acted += 1;
                    bump(&mut decisions.action_counts, label(&fields, "action"));
                }
                if fields.get("joker_taunt").and_then(Value::as_bool) == Some(true) {
                    decisions.joker_taunts += 1;
                }
                if let Some(chance) = fields.get("act_chance").and_then(Value::as_f64) {
                    chance_avg.add(chance);
                }
                if let Some(pressure) = fields.get("pressure").and_then(Value::as_f64) {
                    pressure_avg.add(pressure);
                }
                bump(&mut decisions.phase_counts, label(&fields, "phase"));
                bump(&mut decisions.reason_counts, label(&fields, "reason"));
            }
            "bluff_bot::gesture" => {
                if let Some(dropped) = fields.get("dropped").and_then(Value::as_u64) {
                    gestures.dropped += dropped as usize;
                } else if fields.contains_key("action") {
                    gestures.classified += 1;
                    bump(&mut gestures.action_counts, label(&fields, "action"));
                }
            }
            _ => {}
        }
    }

    decisions.avg_act_chance = chance_avg.mean();
    decisions.avg_pressure = pressure_avg.mean();

    Ok(TelemetrySummary {
        decisions,
        gestures,
    })
}

fn label<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a str {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let decisions = &outputs.summary.decisions;
    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&format!("- Decisions logged: {}\n", decisions.count));
    if let Some(rate) = decisions.acted_rate() {
        section.push_str(&format!("- Acted rate: {:.1}%\n", rate * 100.0));
    }
    if let Some(value) = decisions.avg_act_chance {
        section.push_str(&format!("- Avg act chance: {:.3}\n", value));
    }
    section.push_str(&format!("- Joker taunts: {}\n", decisions.joker_taunts));
    if !decisions.phase_counts.is_empty() {
        section.push_str("- Phases:\n");
        for (label, count) in &decisions.phase_counts {
            section.push_str(&format!("  - {}: {}\n", label, count));
        }
    }

    let gestures = &outputs.summary.gestures;
    section.push_str("\n### Player Gestures\n");
    if gestures.action_counts.is_empty() {
        section.push_str("- <none>\n");
    } else {
        for (label, count) in &gestures.action_counts {
            section.push_str(&format!("- {}: {}\n", label, count));
        }
    }
    if gestures.dropped > 0 {
        section.push_str(&format!("- dropped outside bluff window: {}\n", gestures.dropped));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let decisions = &summary.decisions;
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## AI Decisions\n");
    output.push_str(&format!("- Events: {}\n", decisions.count));
    output.push_str(&format!("- Acted: {}\n", decisions.acted));
    if let Some(value) = decisions.avg_act_chance {
        output.push_str(&format!("- Avg act chance: {:.3}\n", value));
    }
    if let Some(value) = decisions.avg_pressure {
        output.push_str(&format!("- Avg pressure: {:.2}\n", value));
    }
    output.push_str(&format!("- Joker taunts: {}\n", decisions.joker_taunts));
    for (title, counts) in [
        ("Phases", &decisions.phase_counts),
        ("Actions", &decisions.action_counts),
        ("Outcomes", &decisions.reason_counts),
    ] {
        if counts.is_empty() {
            continue;
        }
        output.push_str(&format!("- {title}:\n"));
        for (label, count) in counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output.push('\n');

    output.push_str("## Player Gestures\n");
    output.push_str(&format!("- Classified: {}\n", summary.gestures.classified));
    output.push_str(&format!("- Dropped: {}\n", summary.gestures.dropped));
    for (label, count) in &summary.gestures.action_counts {
        output.push_str(&format!("- {}: {}\n", label, count));
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn write_temp_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file
    }

    #[test]
    fn summarises_decision_and_gesture_events() {
        let lines = vec![
            r#"{"target":"bluff_bot::decision","fields":{"phase":"Early","act_chance":0.95,"acted":true,"action":"Shuffle","joker_taunt":false,"pressure":0.0,"reason":"acted"}}"#,
            r#"{"target":"bluff_bot::decision","fields":{"phase":"Late","act_chance":0.85,"acted":true,"action":"Push","joker_taunt":true,"pressure":1.0,"reason":"acted"}}"#,
            r#"{"target":"bluff_bot::decision","fields":{"phase":"Late","act_chance":0.85,"acted":false,"action":"-","joker_taunt":false,"reason":"skipped"}}"#,
            r#"{"target":"bluff_bot::weights","fields":{"phase":"Late","weights":"Shuffle=1.0","chosen":"Shuffle"}}"#,
            r#"{"target":"bluff_bot::decision","fields":{"stage":"weights","phase":"Late","weights":"Shuffle=1.0","chosen":"Shuffle"}}"#,
            r#"{"target":"bluff_bot::gesture","fields":{"message":"classified","card":3,"action":"Wiggle"}}"#,
            r#"{"target":"bluff_bot::gesture","fields":{"message":"gesture outside bluff window","card":3,"dropped":2}}"#,
            r#"{"target":"bluff_bot::dispatch","fields":{"message":"committed","action":"Push"}}"#,
        ];
        let file = write_temp_file(&lines);
        let summary = summarise_telemetry(file.path()).expect("summarise");

        let decisions = &summary.decisions;
        assert_eq!(decisions.count, 3);
        assert_eq!(decisions.acted, 2);
        assert_eq!(decisions.joker_taunts, 1);
        assert!((decisions.avg_act_chance.unwrap() - 0.8833).abs() < 1e-3);
        assert!((decisions.avg_pressure.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(decisions.phase_counts.get("Late"), Some(&2));
        assert_eq!(decisions.action_counts.get("Push"), Some(&1));
        assert_eq!(decisions.action_counts.get("-"), None);
        assert_eq!(decisions.reason_counts.get("skipped"), Some(&1));
        assert_eq!(decisions.reason_counts.get("<unset>"), None);

        assert_eq!(summary.gestures.classified, 1);
        assert_eq!(summary.gestures.dropped, 2);
        assert_eq!(summary.gestures.action_counts.get("Wiggle"), Some(&1));
    }

    #[test]
    fn handles_missing_file() {
        let path = Path::new("tests/does/not/exist.jsonl");
        let summary = summarise_telemetry(path).expect("summarise missing file");
        assert_eq!(summary.decisions.count, 0);
        assert!(summary.decisions.acted_rate().is_none());
        assert!(summary.gestures.action_counts.is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        let file = write_temp_file(&["{not json"]);
        let err = summarise_telemetry(file.path()).expect_err("malformed");
        assert!(matches!(err, TelemetryError::Json(_)));
    }

    #[test]
    fn writes_summary_files_next_to_telemetry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let telemetry = dir.path().join("telemetry.jsonl");
        std::fs::write(
            &telemetry,
            r#"{"target":"bluff_bot::decision","fields":{"phase":"Mid","act_chance":0.5,"acted":false,"reason":"skipped"}}"#,
        )
        .expect("seed telemetry");

        let outputs = write_summary_outputs(&telemetry, dir.path())
            .expect("write outputs")
            .expect("telemetry present");
        let markdown = std::fs::read_to_string(&outputs.markdown_path).expect("read md");
        assert!(markdown.contains("## AI Decisions"));
        assert!(markdown.contains("Mid: 1"));
        let json = std::fs::read_to_string(&outputs.json_path).expect("read json");
        assert!(json.contains("\"avg_act_chance\": 0.5"));

        let absent = dir.path().join("missing.jsonl");
        assert!(write_summary_outputs(&absent, dir.path()).expect("ok").is_none());
    }

    #[test]
    fn appends_highlights_to_summary_markdown() {
        let mut summary_file = tempfile::NamedTempFile::new().expect("summary temp file");
        write!(summary_file, "# Bluff Bench Summary\n").expect("seed summary content");

        let mut phase_counts = BTreeMap::new();
        phase_counts.insert("Early".to_string(), 12);
        phase_counts.insert("Late".to_string(), 4);
        let mut gesture_counts = BTreeMap::new();
        gesture_counts.insert("Push".to_string(), 9);

        let outputs = TelemetryOutputs {
            summary: TelemetrySummary {
                decisions: DecisionTelemetrySummary {
                    count: 16,
                    acted: 12,
                    joker_taunts: 3,
                    avg_act_chance: Some(0.8),
                    phase_counts,
                    ..DecisionTelemetrySummary::default()
                },
                gestures: GestureTelemetrySummary {
                    classified: 9,
                    dropped: 0,
                    action_counts: gesture_counts,
                },
            },
            json_path: PathBuf::from("telemetry_summary.json"),
            markdown_path: PathBuf::from("telemetry_summary.md"),
        };

        append_highlights_to_markdown(summary_file.path(), &outputs).expect("append highlights");

        let contents = std::fs::read_to_string(summary_file.path()).expect("read summary file");
        assert!(contents.contains("## Telemetry Highlights"));
        assert!(contents.contains("Decisions logged: 16"));
        assert!(contents.contains("Acted rate: 75.0%"));
        assert!(contents.contains("Avg act chance: 0.800"));
        assert!(contents.contains("Joker taunts: 3"));
        assert!(contents.contains("Early: 12"));
        assert!(contents.contains("### Player Gestures"));
        assert!(contents.contains("Push: 9"));
    }
}
