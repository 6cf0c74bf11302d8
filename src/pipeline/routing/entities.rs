//! Biomarker derivation from raw OCR text.
//!
//! Lab reports in the wild mostly print one analyte per line:
//! `Hemoglobin: 13.5 g/dL (12.0 - 15.5)` or `Glucose 98 mg/dL ref: 70-100`.
//! The remote service returns structured entities itself; this parser covers
//! the local engine (plain text only) and remote results that arrive without
//! entities.

use std::sync::OnceLock;

use regex::Regex;

use super::types::Biomarker;

/// One analyte line: name, value, unit, optional reference range.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*([A-Za-z][A-Za-z0-9 /()\-]{1,40}?)\s*:?\s+(\d+(?:\.\d+)?)\s+([A-Za-z0-9µ%][A-Za-z0-9µ/%^\.]*)\s*(?:\(?\s*(?:ref(?:erence)?\s*(?:range)?\s*:?\s*)?(\d+(?:\.\d+)?)\s*[-–]\s*(\d+(?:\.\d+)?)\s*\)?)?\s*$",
        )
        .expect("biomarker line pattern is valid")
    })
}

/// Extract structured biomarkers from raw report text.
/// Lines that do not look like an analyte reading are skipped silently.
pub fn parse_biomarkers(text: &str) -> Vec<Biomarker> {
    let mut entities = Vec::new();
    for captures in line_pattern().captures_iter(text) {
        let name = captures[1].trim().to_string();
        let Ok(value) = captures[2].parse::<f64>() else {
            continue;
        };
        let unit = captures[3].to_string();
        let reference_low = captures.get(4).and_then(|m| m.as_str().parse::<f64>().ok());
        let reference_high = captures.get(5).and_then(|m| m.as_str().parse::<f64>().ok());
        let out_of_range = match (reference_low, reference_high) {
            (Some(low), Some(high)) => Some(value < low || value > high),
            _ => None,
        };
        entities.push(Biomarker {
            name,
            value,
            unit,
            reference_low,
            reference_high,
            out_of_range,
        });
    }
    entities
}

/// Quality of an extraction in [0, 1]: an even blend of how much text came
/// out (2000 chars saturates) and how many structured entities were found
/// (10 saturates).
pub fn quality_score(text_length: usize, entity_count: usize) -> f32 {
    let text_part = (text_length as f32 / 2000.0).min(1.0);
    let entity_part = (entity_count as f32 / 10.0).min(1.0);
    0.5 * text_part + 0.5 * entity_part
}
