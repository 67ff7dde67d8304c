pub mod layout;

pub use layout::{artifact_basename, artifact_timestamp, BookLayout};
