//! Line-oriented, label-carrying numeric exposition (Prometheus textfile style).
//!
//! `metric_name{label="value",...} number`, with optional `# HELP` / `# TYPE`
//! comment lines. Label values are escaped (`\\`, `\"`, `\n`).

use crate::error::TypesError;
use std::fmt::Write as _;

/// One exposed series value.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Accumulates exposition text.
#[derive(Default)]
pub struct ExpositionWriter {
    out: String,
}

impl ExpositionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the `# HELP` and `# TYPE` header for a gauge family.
    pub fn gauge(&mut self, name: &str, help: &str) -> &mut Self {
        let _ = writeln!(self.out, "# HELP {} {}", name, help);
        let _ = writeln!(self.out, "# TYPE {} gauge", name);
        self
    }

    pub fn sample(&mut self, name: &str, labels: &[(&str, &str)], value: f64) -> &mut Self {
        self.out.push_str(name);
        self.out.push('{');
        for (i, (k, v)) in labels.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            let _ = write!(self.out, "{}=\"{}\"", k, escape_label(v));
        }
        self.out.push('}');
        self.out.push(' ');
        self.out.push_str(&format_value(value));
        self.out.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".into()
    } else if value == f64::INFINITY {
        "+Inf".into()
    } else if value == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        format!("{}", value)
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "+Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

fn escape_label(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Parse exposition text into samples. Comment and blank lines are skipped.
pub fn parse(text: &str) -> Result<Vec<Sample>, TypesError> {
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let err = |msg: &str| TypesError::Exposition(format!("line {}: {}", lineno + 1, msg));
        let (name, rest) = match line.find('{') {
            Some(idx) => (&line[..idx], &line[idx..]),
            None => return Err(err("series without label set")),
        };
        if name.is_empty() {
            return Err(err("missing metric name"));
        }
        let (labels, tail) = parse_labels(rest).map_err(|m| err(&m))?;
        let value = parse_value(tail.trim()).ok_or_else(|| err("invalid sample value"))?;
        samples.push(Sample {
            name: name.to_string(),
            labels,
            value,
        });
    }
    Ok(samples)
}

/// Parse `{k="v",...}` and return the labels plus the remainder of the line.
fn parse_labels(input: &str) -> Result<(Vec<(String, String)>, &str), String> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '{')) => {}
        _ => return Err("expected '{'".into()),
    }
    let mut labels = Vec::new();
    loop {
        // key
        let mut key = String::new();
        loop {
            match chars.next() {
                Some((idx, '}')) if key.is_empty() => return Ok((labels, &input[idx + 1..])),
                Some((_, '=')) => break,
                Some((_, c)) if c.is_ascii_alphanumeric() || c == '_' => key.push(c),
                _ => return Err("malformed label name".into()),
            }
        }
        if !matches!(chars.next(), Some((_, '"'))) {
            return Err("label value must be quoted".into());
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, c)) => value.push(c),
                    None => return Err("dangling escape".into()),
                },
                Some((_, '"')) => break,
                Some((_, c)) => value.push(c),
                None => return Err("unterminated label value".into()),
            }
        }
        labels.push((key, value));
        match chars.next() {
            Some((_, ',')) => continue,
            Some((idx, '}')) => return Ok((labels, &input[idx + 1..])),
            _ => return Err("expected ',' or '}'".into()),
        }
    }
}
