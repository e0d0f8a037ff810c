pub mod job;
pub mod loaders;
pub mod records;
pub mod status;

pub use job::{Job, JobRequest, OutputMode, SearchEngineKind};
pub use loaders::{load_job_file, CourseCatalog};
pub use records::{
    OmittedRecord, ResultRecord, SearchResult, WorkItem, WorkRange, OMITTED_COLUMNS,
    RESULT_COLUMNS,
};
pub use status::{RunHandle, RunStatus, Summary, WorkerState, WorkerStatus};
