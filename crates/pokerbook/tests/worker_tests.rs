//! Book runs on the background worker pool.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::TestHarness;
use pokerbook::books;
use pokerbook::db::{job_repo, JobStatus, PageStatus};
use pokerbook::worker::{BookRun, BookWorkerPool};

#[test]
fn test_submit_returns_before_run_finishes() {
    let harness = TestHarness::new();
    harness.ocr.set(1, "Text.");
    harness.ocr.set(2, "More text.");
    let (book_id, _) = harness.image_book("Book", 2);
    let job_id = books::enqueue_processing(&harness.db, book_id).unwrap();

    let pool = BookWorkerPool::new(Arc::new(harness.coordinator()), 1).unwrap();
    pool.submit(BookRun::new(book_id, job_id)).unwrap();

    let outcome = pool.recv_result().unwrap();
    assert!(outcome.success, "Run failed: {:?}", outcome.error);
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.job_id, job_id);
    assert_eq!(summary.pages_processed, 2);

    let job = job_repo::find_by_id(&harness.db, job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    pool.shutdown();
    pool.wait();
}

#[test]
fn test_runs_of_several_books() {
    let harness = TestHarness::new();
    harness.ocr.set(1, "Page one.");

    let mut runs = Vec::new();
    for title in ["First", "Second", "Third"] {
        let images = harness.write_pages(1);
        let book_id = books::create_book_from_images(&harness.db, title, "", &images).unwrap();
        let job_id = books::enqueue_processing(&harness.db, book_id).unwrap();
        runs.push(BookRun::new(book_id, job_id));
    }

    let pool = BookWorkerPool::new(Arc::new(harness.coordinator()), 2).unwrap();
    for run in &runs {
        pool.submit(run.clone()).unwrap();
    }

    let mut finished = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(30);
    while finished.len() < runs.len() && Instant::now() < deadline {
        match pool.try_recv_result() {
            Some(outcome) => finished.push(outcome),
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|o| o.success));
    for run in &runs {
        let job = job_repo::find_by_id(&harness.db, run.job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        let pages = pokerbook::db::page_repo::list_for_book(&harness.db, run.book_id).unwrap();
        assert_eq!(pages[0].status, PageStatus::Processed);
    }

    pool.shutdown();
    pool.wait();
}

#[test]
fn test_failed_run_reported_as_outcome() {
    let harness = TestHarness::new();
    let book_id = pokerbook::db::book_repo::insert(&harness.db, "Empty", "").unwrap();
    let job_id = books::enqueue_processing(&harness.db, book_id).unwrap();

    let pool = BookWorkerPool::new(Arc::new(harness.coordinator()), 1).unwrap();
    pool.submit(BookRun::new(book_id, job_id)).unwrap();

    let outcome = pool.recv_result().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("No pages found for book 1"));

    pool.shutdown();
    pool.wait();
}
