use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::pipeline::analyze_emotions_use_case::AnalyzeEmotionsUseCase;
use crate::pipeline::batch_executor::{analyze_image, BatchConfig, BatchExecutor, ImageAnalysis};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Fans a batch out over a fixed pool of worker threads.
///
/// Layout: `feeder → [worker × N] → main [reorder/progress]`
///
/// All workers share one pipeline instance. The job channel is bounded so
/// the feeder never runs far ahead of the workers.
pub struct ThreadedBatchExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        use_case: &AnalyzeEmotionsUseCase,
        images: &[PathBuf],
        config: &BatchConfig,
    ) -> Vec<ImageAnalysis> {
        let total = images.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, &Path)>(self.channel_capacity);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, ImageAnalysis)>();
        let mut slots: Vec<Option<ImageAnalysis>> = (0..total).map(|_| None).collect();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancelled = config.cancelled.clone();
                scope.spawn(move || {
                    for (index, path) in job_rx {
                        if cancelled.load(Ordering::Relaxed) {
                            break;
                        }
                        let analysis = analyze_image(use_case, path);
                        if result_tx.send((index, analysis)).is_err() {
                            break;
                        }
                    }
                });
            }
            // Workers hold the only receivers and senders from here on, so
            // both channels disconnect once they exit.
            drop(job_rx);
            drop(result_tx);

            let cancelled = config.cancelled.clone();
            scope.spawn(move || {
                for (index, path) in images.iter().enumerate() {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    if job_tx.send((index, path.as_path())).is_err() {
                        break;
                    }
                }
            });

            let mut done = 0;
            for (index, analysis) in result_rx {
                slots[index] = Some(analysis);
                done += 1;
                if let Some(ref cb) = config.on_progress {
                    if !cb(done, total) {
                        config.cancelled.store(true, Ordering::Relaxed);
                    }
                }
            }
        });

        slots.into_iter().flatten().collect()
    }
}
