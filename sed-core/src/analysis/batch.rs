//! Parallel analysis of many files
//!
//! Files are independent, so a batch is a plain rayon map over a pool sized
//! by the caller. A failure stays attached to its file and never aborts the
//! batch.

use super::Analyzer;
use crate::models::analysis_result::{FileChange, FileOutcome};
use crate::{Error, Result};
use rayon::prelude::*;
use std::num::NonZeroUsize;

impl Analyzer {
    /// Analyze every file, at most `concurrency` at a time (default: the
    /// available parallelism). Outcomes keep the input order.
    pub fn analyze_batch(
        &self,
        files: Vec<FileChange>,
        concurrency: Option<usize>,
    ) -> Result<Vec<FileOutcome>> {
        let threads = concurrency
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
            .max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sed-worker-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        tracing::info!(files = files.len(), threads, "starting batch analysis");
        let outcomes: Vec<FileOutcome> =
            pool.install(|| files.into_par_iter().map(|file| self.analyze_file(file)).collect());

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(files = outcomes.len(), failed, "batch analysis complete");
        Ok(outcomes)
    }

    /// Analyze one file, turning an error into a failed outcome
    pub fn analyze_file(&self, file: FileChange) -> FileOutcome {
        match self.analyze(file.language, &file.before, &file.after) {
            Ok(result) => FileOutcome::success(file.path, result),
            Err(error) => {
                tracing::warn!(path = %file.path.display(), %error, "file analysis failed");
                FileOutcome::failure(file.path, error.to_string())
            }
        }
    }
}
