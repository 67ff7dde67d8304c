use crate::coordinator::RunSummary;

/// One queued book run.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRun {
    pub run_id: String,
    pub book_id: i64,
    pub job_id: i64,
}

impl BookRun {
    pub fn new(book_id: i64, job_id: i64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            book_id,
            job_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: BookRun,
    pub success: bool,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn success(run: BookRun, summary: RunSummary) -> Self {
        Self {
            run,
            success: true,
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failure(run: BookRun, error: impl Into<String>) -> Self {
        Self {
            run,
            success: false,
            summary: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = BookRun::new(1, 1);
        let b = BookRun::new(1, 1);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.run_id.len(), 36);
    }

    #[test]
    fn test_failure_outcome() {
        let outcome = RunOutcome::failure(BookRun::new(3, 7), "No pages found for book 3");
        assert!(!outcome.success);
        assert!(outcome.summary.is_none());
        assert_eq!(outcome.error.as_deref(), Some("No pages found for book 3"));
    }
}
