pub mod job;
pub mod pool;

pub use job::{BookRun, RunOutcome};
pub use pool::BookWorkerPool;
