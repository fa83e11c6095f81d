/// Errors from the stability monitor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StabilityError {
    #[error("invalid operational sample: {0}")]
    InvalidSample(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = StabilityError::InvalidSample("uptime_ratio 1.5".into());
        assert!(format!("{}", e).contains("uptime_ratio"));
    }
}
