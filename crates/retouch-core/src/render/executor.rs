//! Where render jobs run.

use crate::config::EditorConfig;

/// A unit of background work.
pub type RenderJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs render jobs. Implementations decide the thread and the order;
/// no ordering between jobs is guaranteed.
pub trait RenderExecutor: Send + Sync {
    fn spawn(&self, job: RenderJob);
}

/// Runs jobs on a dedicated rayon thread pool.
#[derive(Debug)]
pub struct PoolExecutor {
    pool: rayon::ThreadPool,
}

impl PoolExecutor {
    /// # Arguments
    ///
    /// * `threads` - Worker count, 0 for the rayon default
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("render-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn from_config(config: &EditorConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::new(config.worker_threads)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl RenderExecutor for PoolExecutor {
    fn spawn(&self, job: RenderJob) {
        self.pool.spawn(job);
    }
}

/// Runs each job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl RenderExecutor for InlineExecutor {
    fn spawn(&self, job: RenderJob) {
        job();
    }
}
