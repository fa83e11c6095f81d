/// Errors from scorer configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid weight {name}: {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = ConfigError::InvalidThreshold {
            name: "max_hallucination_rate",
            value: 0.0,
        };
        assert!(format!("{}", e).contains("max_hallucination_rate"));
    }
}
