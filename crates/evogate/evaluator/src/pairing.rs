//! Classification of tail-window events into A/B pairs.

use evogate_types::PairingDiagnostics;
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete pairs extracted from one bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedSamples {
    /// `b - a` per complete pair, ordered by pair id.
    pub differences: Vec<f64>,
    pub diagnostics: PairingDiagnostics,
}

#[derive(Default)]
struct Slot {
    a: Option<f64>,
    b: Option<f64>,
}

enum Variant {
    A,
    B,
}

/// Pair `{"kind":<sample_kind>,"pair_id":..,"variant":"a"|"b","value":..}`
/// events by decision point.
///
/// Every line lands in exactly one counter class except the complete pairs,
/// which count once per pair: `seen = malformed + filtered + pairing_failed
/// + sides recorded`.
pub fn pair_events<S: AsRef<str>>(lines: &[S], sample_kind: &str) -> PairedSamples {
    let mut diag = PairingDiagnostics::default();
    let mut slots: BTreeMap<String, Slot> = BTreeMap::new();

    for line in lines {
        diag.seen += 1;
        let obj = match serde_json::from_str::<Value>(line.as_ref()) {
            Ok(Value::Object(obj)) => obj,
            _ => {
                diag.malformed += 1;
                continue;
            }
        };
        match obj.get("kind").and_then(Value::as_str) {
            Some(kind) if kind == sample_kind => {}
            _ => {
                diag.filtered += 1;
                continue;
            }
        }
        let Some(pair_id) = obj.get("pair_id").and_then(pair_key) else {
            diag.pairing_failed += 1;
            continue;
        };
        let variant = match obj.get("variant").and_then(Value::as_str) {
            Some(v) if v.eq_ignore_ascii_case("a") => Variant::A,
            Some(v) if v.eq_ignore_ascii_case("b") => Variant::B,
            _ => {
                diag.pairing_failed += 1;
                continue;
            }
        };
        let Some(value) = obj.get("value").and_then(Value::as_f64).filter(|v| v.is_finite()) else {
            diag.pairing_failed += 1;
            continue;
        };

        let slot = slots.entry(pair_id).or_default();
        let side = match variant {
            Variant::A => &mut slot.a,
            Variant::B => &mut slot.b,
        };
        if side.is_some() {
            // Second sample for the same side: ambiguous, keep the first.
            diag.pairing_failed += 1;
        } else {
            *side = Some(value);
        }
    }

    let mut differences = Vec::new();
    for slot in slots.values() {
        match (slot.a, slot.b) {
            (Some(a), Some(b)) => differences.push(b - a),
            (Some(_), None) => diag.unpaired_a += 1,
            (None, Some(_)) => diag.unpaired_b += 1,
            (None, None) => {}
        }
    }
    diag.paired = differences.len() as u64;

    PairedSamples {
        differences,
        diagnostics: diag,
    }
}

fn pair_key(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
