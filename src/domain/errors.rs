use derive_more::{Display, From};

/// Failures of a single indicator computation. Never fatal to a frame.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum IndicatorError {
    #[display(fmt = "insufficient data: need {} candles, have {}", required, available)]
    InsufficientData { required: usize, available: usize },
    #[display(fmt = "invalid parameter {} = {}", name, value)]
    InvalidParam { name: String, value: f64 },
    #[display(fmt = "unknown indicator {}", _0)]
    UnknownIndicator(String),
}

impl std::error::Error for IndicatorError {}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum DrawingError {
    #[display(fmt = "{} needs {} points, got {}", kind, expected, actual)]
    WrongPointCount { kind: String, expected: usize, actual: usize },
    #[display(fmt = "drawing {} not found", _0)]
    NotFound(String),
    #[display(fmt = "drawing {} is locked", _0)]
    Locked(String),
    #[display(fmt = "operation not allowed while {}", _0)]
    InvalidState(String),
    #[display(fmt = "anchor {} out of range for drawing {}", anchor, id)]
    AnchorOutOfRange { id: String, anchor: usize },
    #[display(fmt = "import rejected: {}", _0)]
    Import(String),
}

impl std::error::Error for DrawingError {}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum FeedError {
    #[display(fmt = "network error: {}", _0)]
    Network(String),
    #[display(fmt = "http status {}", _0)]
    Http(u16),
    #[display(fmt = "malformed payload: {}", _0)]
    Parse(String),
}

impl std::error::Error for FeedError {}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum CommitError {
    #[display(fmt = "commit rejected: {}", _0)]
    Rejected(String),
    #[display(fmt = "commit timed out")]
    Timeout,
    #[display(fmt = "no pending commit for {}", _0)]
    NotPending(String),
}

impl std::error::Error for CommitError {}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum ConfigError {
    #[display(fmt = "config parse error: {}", _0)]
    Parse(String),
    #[display(fmt = "invalid config: {}", _0)]
    Invalid(String),
}

impl std::error::Error for ConfigError {}

/// Root error for the public API
#[derive(Debug, Clone, PartialEq, Display, From)]
pub enum ChartError {
    #[display(fmt = "indicator: {}", _0)]
    Indicator(IndicatorError),
    #[display(fmt = "drawing: {}", _0)]
    Drawing(DrawingError),
    #[display(fmt = "feed: {}", _0)]
    Feed(FeedError),
    #[display(fmt = "price line: {}", _0)]
    Commit(CommitError),
    #[display(fmt = "config: {}", _0)]
    Config(ConfigError),
}

impl std::error::Error for ChartError {}

pub type ChartResult<T> = Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_render_with_context() {
        let err: ChartError = DrawingError::Locked("trend-1".into()).into();
        assert_eq!(err.to_string(), "drawing: drawing trend-1 is locked");

        let err: ChartError =
            IndicatorError::InsufficientData { required: 20, available: 5 }.into();
        assert_eq!(err.to_string(), "indicator: insufficient data: need 20 candles, have 5");
    }
}
