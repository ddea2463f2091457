use crate::error::{ArchiveError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Worker pool shared by every archive of one build.
///
/// Cloning is cheap and hands out the same threads. Writers submit work to it but never
/// shut it down; the threads go away when the last clone is dropped.
#[derive(Clone)]
pub struct CompressionPool {
    inner: Arc<ThreadPool>,
}

impl CompressionPool {
    /// `threads == 0` lets rayon pick one thread per logical CPU.
    pub fn new(threads: usize) -> Result<Self> {
        let inner = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("jarforge-zip-{i}"))
            .build()
            .map_err(|e| ArchiveError::Pool(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.spawn(job);
    }
}

impl std::fmt::Debug for CompressionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionPool")
            .field("threads", &self.threads())
            .finish()
    }
}
