use std::fmt::Display;

use super::error::PipelineError;

/// What a stage produced: its value, a fallback value with the reason, or a
/// page-fatal error.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Completed(T),
    Fallback { value: T, reason: String },
    Failed(PipelineError),
}

impl<T> StageOutcome<T> {
    pub fn fallback(value: T, reason: impl Display) -> Self {
        Self::Fallback {
            value,
            reason: reason.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The reason of a fallback.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Fallback { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// The completed or fallback value; `Err` only for a failed stage.
    pub fn into_value(self) -> Result<T, PipelineError> {
        match self {
            Self::Completed(value) | Self::Fallback { value, .. } => Ok(value),
            Self::Failed(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use std::path::PathBuf;

    #[test]
    fn test_into_value() {
        assert_eq!(StageOutcome::Completed(3).into_value().unwrap(), 3);
        assert_eq!(StageOutcome::fallback(0, "service down").into_value().unwrap(), 0);

        let failed: StageOutcome<u32> =
            StageOutcome::Failed(ProcessError::MissingSource(PathBuf::from("/x.png")).into());
        assert!(failed.is_failed());
        assert!(failed.into_value().is_err());
    }

    #[test]
    fn test_fallback_reason() {
        let outcome = StageOutcome::fallback(String::new(), "timeout");
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reason(), Some("timeout"));
        assert_eq!(StageOutcome::Completed(1).reason(), None);
    }
}
