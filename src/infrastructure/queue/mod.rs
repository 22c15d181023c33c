mod jobs;

pub use jobs::{keys, queues, BatchRespondJob, JobResult, QueueJobStatus, RespondJob};
