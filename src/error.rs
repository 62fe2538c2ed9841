use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalemmaError>;

#[derive(Debug, Error)]
pub enum AnalemmaError {
    /// Rejected input, raised before any computation starts.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// Recoverable: the caller can supply a manual anchor pixel instead.
    #[error("No bright source found (threshold {threshold:.4}, minimum area {min_area} px)")]
    NoBrightSourceFound { threshold: f64, min_area: usize },

    /// Recoverable: the provider degrades to the closed-form approximation.
    #[error("High-precision ephemeris '{backend}' unavailable: {reason}")]
    HighPrecisionUnavailable { backend: String, reason: String },

    #[error("Metadata line {line}: {message}")]
    Metadata { line: usize, message: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalemmaError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn high_precision_unavailable(backend: &str, reason: impl Into<String>) -> Self {
        Self::HighPrecisionUnavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn metadata(line: usize, message: impl Into<String>) -> Self {
        Self::Metadata {
            line,
            message: message.into(),
        }
    }

    /// True for failures the pipeline has a documented fallback for.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoBrightSourceFound { .. } | Self::HighPrecisionUnavailable { .. }
        )
    }
}
