//! Analysis normalization and prompt construction.
//!
//! The reasoning service is untrusted: even with JSON mode requested it has
//! been observed returning a flat object, a JSON string containing that
//! object, or a single-element array containing it, sometimes wrapped in a
//! markdown code fence. Everything here coerces those shapes into the one
//! canonical [`Analysis`] or rejects the payload outright.

use serde_json::Value;
use tracing::debug;

use crate::models::Analysis;
use crate::{Error, Result};

/// Unwrap depth bound for nested string/array wrapping.
const MAX_UNWRAP_DEPTH: usize = 4;

/// The fixed prompt sent to the reasoning service for one analysis job.
pub fn analysis_prompt(document_url: &str) -> String {
    format!(
        r#"You are a senior solar engineer. Analyze this bill URL: {document_url}

I need a specific "Zero Bill" architecture plan.

Return JSON ONLY with these fields:
1. monthly_avg: (number) Current bill average.
2. daily_kwh: (number) Daily usage.
3. zero_bill_system: (string) Specific hardware to get $0 bill (e.g. "10kW Solar + 13.5kWh Battery").
4. necessity_explanation: (string) short explanation why this specific size is needed.
5. cost_10_years: (number) Total cost if they do nothing for 10 years at current rates.
6. energy_profile: (string) Usage pattern summary.
7. potential_savings: (number) Monthly savings.
8. roi_years: (number) Years to payback.

Return ONLY JSON."#
    )
}

/// Deterministic degraded-mode result used when the reasoning service is
/// unavailable. The orchestrator logs a warning whenever it substitutes this.
pub fn placeholder_analysis() -> Analysis {
    Analysis {
        monthly_avg: 250.0,
        daily_kwh: 28.0,
        zero_bill_system: "10.5kW Solar + Tesla Powerwall 3".into(),
        necessity_explanation: Some(
            "Your high evening consumption requires a large battery to bridge the night gap."
                .into(),
        ),
        cost_10_years: 30000.0,
        energy_profile: Some("Evening Peaking".into()),
        potential_savings: 240.0,
        roi_years: 5.5,
    }
}

/// Coerce raw reasoning-service output into a canonical [`Analysis`].
///
/// Handles the three observed wire shapes (flat object, JSON-encoded string,
/// single-element array) plus markdown fences, unwrapping up to
/// [`MAX_UNWRAP_DEPTH`] layers. Any parse failure or missing required field
/// yields [`Error::MalformedAnalysis`] carrying the raw text.
pub fn normalize_analysis(raw: &str) -> Result<Analysis> {
    let malformed = || Error::MalformedAnalysis { raw: raw.to_string() };

    let text = strip_code_fence(raw.trim());
    let mut value: Value = serde_json::from_str(text).map_err(|_| malformed())?;

    let mut depth = 0;
    loop {
        value = match value {
            Value::String(inner) => {
                debug!("unwrapping JSON-encoded string layer");
                serde_json::from_str(&inner).map_err(|_| malformed())?
            }
            Value::Array(items) => {
                debug!("unwrapping single-element array layer");
                items.into_iter().next().ok_or_else(|| malformed())?
            }
            other => break serde_json::from_value::<Analysis>(other).map_err(|_| malformed()),
        };
        depth += 1;
        if depth > MAX_UNWRAP_DEPTH {
            return Err(malformed());
        }
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: &str = r#"{"monthly_avg":245,"daily_kwh":22.5,"zero_bill_system":"6.6kW Solar + 10kWh Battery","necessity_explanation":"Covers your 15kWh evening peak.","cost_10_years":29400,"energy_profile":"Evening Peaking","potential_savings":185,"roi_years":4.2}"#;

    fn expected() -> Analysis {
        Analysis {
            monthly_avg: 245.0,
            daily_kwh: 22.5,
            zero_bill_system: "6.6kW Solar + 10kWh Battery".into(),
            necessity_explanation: Some("Covers your 15kWh evening peak.".into()),
            cost_10_years: 29400.0,
            energy_profile: Some("Evening Peaking".into()),
            potential_savings: 185.0,
            roi_years: 4.2,
        }
    }

    #[test]
    fn test_flat_object() {
        assert_eq!(normalize_analysis(FLAT).unwrap(), expected());
    }

    #[test]
    fn test_json_encoded_string() {
        let wrapped = serde_json::to_string(FLAT).unwrap();
        assert_eq!(normalize_analysis(&wrapped).unwrap(), expected());
    }

    #[test]
    fn test_single_element_array() {
        let wrapped = format!("[{FLAT}]");
        assert_eq!(normalize_analysis(&wrapped).unwrap(), expected());
    }

    #[test]
    fn test_string_inside_array() {
        // The shape actually observed in production: a one-element array
        // whose element is the object serialized as a string.
        let wrapped = format!("[{}]", serde_json::to_string(FLAT).unwrap());
        let analysis = normalize_analysis(&wrapped).unwrap();
        assert_eq!(analysis.monthly_avg, 245.0);
        assert_eq!(analysis, expected());
    }

    #[test]
    fn test_all_shapes_yield_identical_value() {
        let shapes = [
            FLAT.to_string(),
            serde_json::to_string(FLAT).unwrap(),
            format!("[{FLAT}]"),
        ];
        let first = normalize_analysis(&shapes[0]).unwrap();
        for shape in &shapes[1..] {
            assert_eq!(normalize_analysis(shape).unwrap(), first);
        }
    }

    #[test]
    fn test_markdown_fence() {
        let fenced = format!("```json\n{FLAT}\n```");
        assert_eq!(normalize_analysis(&fenced).unwrap(), expected());
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let minimal = r#"{"monthly_avg":100,"daily_kwh":10,"zero_bill_system":"5kW Solar","cost_10_years":12000,"potential_savings":90,"roi_years":6.0}"#;
        let analysis = normalize_analysis(minimal).unwrap();
        assert_eq!(analysis.necessity_explanation, None);
        assert_eq!(analysis.energy_profile, None);
    }

    #[test]
    fn test_not_json_is_malformed() {
        let raw = "I'm sorry, I cannot read that bill.";
        match normalize_analysis(raw).unwrap_err() {
            Error::MalformedAnalysis { raw: kept } => assert_eq!(kept, raw),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_numeric_field_is_malformed() {
        let raw = r#"{"zero_bill_system":"5kW Solar","energy_profile":"Flat"}"#;
        assert!(matches!(
            normalize_analysis(raw),
            Err(Error::MalformedAnalysis { .. })
        ));
    }

    #[test]
    fn test_empty_array_is_malformed() {
        assert!(matches!(
            normalize_analysis("[]"),
            Err(Error::MalformedAnalysis { .. })
        ));
    }

    #[test]
    fn test_unwrap_depth_is_bounded() {
        // Five string layers around the object exceeds the bound.
        let mut wrapped = FLAT.to_string();
        for _ in 0..5 {
            wrapped = serde_json::to_string(&wrapped).unwrap();
        }
        assert!(matches!(
            normalize_analysis(&wrapped),
            Err(Error::MalformedAnalysis { .. })
        ));
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        assert_eq!(placeholder_analysis(), placeholder_analysis());
        assert_eq!(placeholder_analysis().monthly_avg, 250.0);
    }

    #[test]
    fn test_prompt_embeds_document_url() {
        let prompt = analysis_prompt("https://store/x.pdf");
        assert!(prompt.contains("https://store/x.pdf"));
        assert!(prompt.contains("monthly_avg"));
        assert!(prompt.contains("Return ONLY JSON"));
    }
}
