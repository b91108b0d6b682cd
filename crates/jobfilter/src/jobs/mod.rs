pub mod model;
pub mod repo;

pub use model::{JobRecord, JobRow, JobStatus, NewJob};
pub use repo::JobsRepo;
