pub mod context;
pub mod registry;
pub mod tasks;

pub use context::JobContext;
pub use registry::{find_job, job_names, registry, run_job};
pub use tasks::Job;
