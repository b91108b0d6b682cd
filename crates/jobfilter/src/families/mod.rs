pub mod dead_letter;
pub mod jobs;

pub use dead_letter::DeadLetterFamily;
pub use jobs::JobsFamily;
