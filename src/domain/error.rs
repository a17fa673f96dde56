//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for histsim.
#[derive(Debug, thiserror::Error)]
pub enum HistsimError {
    #[error("invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid bar series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("no bar for {symbol} on {date}")]
    DataUnavailable { symbol: String, date: NaiveDate },

    #[error("no fill price for {symbol} on {date}")]
    InsufficientData { symbol: String, date: NaiveDate },

    #[error("quote outside no-arbitrage bounds: {reason}")]
    OutOfBounds { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&HistsimError> for std::process::ExitCode {
    fn from(err: &HistsimError) -> Self {
        let code: u8 = match err {
            HistsimError::Io(_) => 1,
            HistsimError::ConfigParse { .. }
            | HistsimError::ConfigMissing { .. }
            | HistsimError::ConfigInvalid { .. }
            | HistsimError::InvalidRange { .. } => 2,
            HistsimError::InvalidSeries { .. } => 3,
            HistsimError::DataUnavailable { .. } | HistsimError::InsufficientData { .. } => 4,
            HistsimError::OutOfBounds { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = HistsimError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "invalid date range: end 2020-01-01 precedes start 2020-01-02"
        );

        let err = HistsimError::DataUnavailable {
            symbol: "SPX".into(),
            date: NaiveDate::from_ymd_opt(2015, 10, 1).unwrap(),
        };
        assert_eq!(err.to_string(), "no bar for SPX on 2015-10-01");
    }

    #[test]
    fn exit_codes_distinguish_classes() {
        let config = HistsimError::ConfigMissing {
            section: "simulation".into(),
            key: "start_date".into(),
        };
        let data = HistsimError::DataUnavailable {
            symbol: "SPX".into(),
            date: NaiveDate::from_ymd_opt(2015, 10, 1).unwrap(),
        };
        assert_ne!(
            format!("{:?}", std::process::ExitCode::from(&config)),
            format!("{:?}", std::process::ExitCode::from(&data)),
        );
    }
}
