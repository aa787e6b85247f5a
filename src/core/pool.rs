use crate::core::job::{Job, JobId, JobStatus};
use crate::core::queue::JobQueue;
use crate::core::resources::CpuResourceManager;
use crate::core::work_item::WorkItem;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Owns the live `WorkItem`s for currently-running jobs and the single
/// background thread that feeds the queue and reaps completions.
///
/// The manager loop is a plain OS thread, not a tokio task: the core
/// scheduling logic has no use for async and stays synchronous end to end,
/// with the HTTP layer bridging in through the shared `Mutex`.
pub struct DynamicProcessPool {
    queue: Arc<Mutex<JobQueue>>,
    cpu: Arc<Mutex<CpuResourceManager>>,
    work_items: Arc<Mutex<HashMap<JobId, WorkItem>>>,
    paused: Arc<AtomicBool>,
    exiting: Arc<AtomicBool>,
    manager_delay: Duration,
}

impl DynamicProcessPool {
    pub fn new(queue: Arc<Mutex<JobQueue>>, cpu: Arc<Mutex<CpuResourceManager>>) -> Self {
        Self {
            queue,
            cpu,
            work_items: Arc::new(Mutex::new(HashMap::new())),
            paused: Arc::new(AtomicBool::new(false)),
            exiting: Arc::new(AtomicBool::new(false)),
            manager_delay: Duration::from_secs(1),
        }
    }

    pub fn with_manager_delay(mut self, delay: Duration) -> Self {
        self.manager_delay = delay;
        self
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn unpause(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn running_count(&self) -> usize {
        self.work_items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Kills the given running jobs (or every running job, if `kill_all`),
    /// freeing their cores. Returns the ids actually killed.
    pub fn kill_jobs(&self, ids: &[JobId], kill_all: bool) -> Vec<JobId> {
        let targets: Vec<JobId> = {
            let items = self.work_items.lock().unwrap_or_else(|e| e.into_inner());
            if kill_all {
                items.keys().copied().collect()
            } else {
                ids.iter().copied().filter(|id| items.contains_key(id)).collect()
            }
        };

        let mut killed = Vec::new();
        for id in targets {
            let item = {
                let mut items = self.work_items.lock().unwrap_or_else(|e| e.into_inner());
                items.remove(&id)
            };
            if let Some(mut item) = item {
                item.kill();
                self.cpu
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .free(item.cores());
                {
                    let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
                    let _ = queue.on_job_finished(id, JobStatus::Deleted);
                }
                if let Some(job) = self.queue.lock().unwrap_or_else(|e| e.into_inner()).find_job(id).cloned() {
                    item_finish_in_background(item, job);
                }
                killed.push(id);
            }
        }
        killed
    }

    /// Spawns the management thread. Returns a handle whose drop does not
    /// stop the loop — call `shutdown` first and join separately if a
    /// graceful stop is needed.
    pub fn spawn_manager(&self) -> std::thread::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let cpu = Arc::clone(&self.cpu);
        let work_items = Arc::clone(&self.work_items);
        let paused = Arc::clone(&self.paused);
        let exiting = Arc::clone(&self.exiting);
        let delay = self.manager_delay;

        std::thread::spawn(move || loop {
            std::thread::sleep(delay);

            if let Err(e) = process_completions(&queue, &cpu, &work_items) {
                error!("error processing job completions: {e}");
            }

            if exiting.load(Ordering::SeqCst) {
                let empty = work_items.lock().unwrap_or_else(|e| e.into_inner()).is_empty();
                if empty {
                    info!("manager loop exiting: all work items drained");
                    return;
                }
                continue;
            }

            if paused.load(Ordering::SeqCst) {
                continue;
            }

            if let Err(e) = feed_queue(&queue, &cpu, &work_items) {
                error!("error feeding job queue: {e}");
            }
        })
    }

    /// Signals the manager loop to stop accepting new work. If `wait` is
    /// false, running jobs are killed immediately instead of left to drain.
    pub fn shutdown(&self, wait: bool) {
        self.exiting.store(true, Ordering::SeqCst);
        if !wait {
            self.kill_jobs(&[], true);
        }
    }
}

fn process_completions(
    queue: &Arc<Mutex<JobQueue>>,
    cpu: &Arc<Mutex<CpuResourceManager>>,
    work_items: &Arc<Mutex<HashMap<JobId, WorkItem>>>,
) -> anyhow::Result<()> {
    let timed_out: Vec<JobId> = {
        let mut items = work_items.lock().unwrap_or_else(|e| e.into_inner());
        items
            .iter_mut()
            .filter(|(_, item)| item.is_running() && item.exceeded_walltime())
            .map(|(id, _)| *id)
            .collect()
    };

    for id in timed_out {
        let mut item = {
            let mut items = work_items.lock().unwrap_or_else(|e| e.into_inner());
            match items.remove(&id) {
                Some(item) => item,
                None => continue,
            }
        };

        item.kill();
        cpu.lock().unwrap_or_else(|e| e.into_inner()).free(item.cores());

        let job = {
            let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
            q.on_job_finished(id, JobStatus::WalltimeExceeded)?;
            q.find_job(id).cloned()
        };

        if let Some(job) = job {
            item_finish_in_background(item, job);
        } else {
            std::mem::drop(item);
        }
    }

    let finished: Vec<JobId> = {
        let mut items = work_items.lock().unwrap_or_else(|e| e.into_inner());
        let mut finished = Vec::new();
        for (id, item) in items.iter_mut() {
            if !item.is_running() {
                item.mark += 1;
                if item.mark > 1 {
                    finished.push(*id);
                }
            }
        }
        finished
    };

    for id in finished {
        let mut item = {
            let mut items = work_items.lock().unwrap_or_else(|e| e.into_inner());
            match items.remove(&id) {
                Some(item) => item,
                None => continue,
            }
        };

        let status = item.exit_status();
        cpu.lock().unwrap_or_else(|e| e.into_inner()).free(item.cores());

        let job = {
            let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
            q.on_job_finished(id, status)?;
            q.find_job(id).cloned()
        };

        if let Some(job) = job {
            item_finish_in_background(item, job);
        } else {
            std::mem::drop(item);
        }
    }

    Ok(())
}

fn item_finish_in_background(item: WorkItem, job: Job) {
    // finish() joins the stdout/stderr reader threads and writes the log
    // footer; done off the manager thread so a slow log flush never
    // delays the next feed_queue tick.
    std::thread::spawn(move || item.finish(&job));
}

fn feed_queue(
    queue: &Arc<Mutex<JobQueue>>,
    cpu: &Arc<Mutex<CpuResourceManager>>,
    work_items: &Arc<Mutex<HashMap<JobId, WorkItem>>>,
) -> anyhow::Result<()> {
    loop {
        let job = {
            let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
            if q.queued_count() == 0 {
                return Ok(());
            }
            match q.next_job() {
                Some(id) => q.find_job(id).cloned(),
                None => return Ok(()),
            }
        };

        let Some(job) = job else { return Ok(()) };

        let cores = {
            let mut mgr = cpu.lock().unwrap_or_else(|e| e.into_inner());
            mgr.reserve(job.job_spec.cores)
        };

        let Some(cores) = cores else {
            // not enough idle cores right now; try again next tick
            return Ok(());
        };

        {
            let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
            q.on_job_started(job.job_id, cores.clone())?;
        }

        let mut started_job = job.clone();
        started_job.cores = Some(cores.clone());

        match WorkItem::start(&started_job) {
            Ok(item) => {
                work_items
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(job.job_id, item);
            }
            Err(e) => {
                warn!("failed to start job {}: {e}", job.job_id);
                cpu.lock().unwrap_or_else(|e| e.into_inner()).free(&cores);
                let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
                q.on_job_finished(job.job_id, JobStatus::Error)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::JobSpec;
    use std::path::PathBuf;

    fn make_pool(cores: u32, limit: usize) -> DynamicProcessPool {
        let queue = Arc::new(Mutex::new(JobQueue::new(limit)));
        let cpu = Arc::new(Mutex::new(CpuResourceManager::new(cores)));
        DynamicProcessPool::new(queue, cpu)
    }

    #[test]
    fn feed_queue_respects_core_budget() {
        let pool = make_pool(1, 10);
        {
            let mut q = pool.queue.lock().unwrap();
            q.submit(vec![
                JobSpec::builder(vec!["sleep".into(), "1".into()], PathBuf::from("/tmp")).build(),
                JobSpec::builder(vec!["sleep".into(), "1".into()], PathBuf::from("/tmp")).build(),
            ]);
        }

        feed_queue(&pool.queue, &pool.cpu, &pool.work_items).unwrap();
        assert_eq!(pool.running_count(), 1);
        assert_eq!(pool.cpu.lock().unwrap().available_count(), 0);

        // second job stays queued: no idle cores left
        assert_eq!(pool.queue.lock().unwrap().queued_count(), 1);
    }

    #[test]
    fn process_completions_frees_cores_after_two_ticks() {
        let pool = make_pool(1, 10);
        {
            let mut q = pool.queue.lock().unwrap();
            q.submit(vec![JobSpec::builder(
                vec!["true".into()],
                PathBuf::from("/tmp"),
            )
            .build()]);
        }
        feed_queue(&pool.queue, &pool.cpu, &pool.work_items).unwrap();

        // give the child a moment to exit
        std::thread::sleep(Duration::from_millis(50));

        process_completions(&pool.queue, &pool.cpu, &pool.work_items).unwrap();
        // still marked, not yet reaped (mark just became 1)
        assert_eq!(pool.running_count(), 1);

        process_completions(&pool.queue, &pool.cpu, &pool.work_items).unwrap();
        assert_eq!(pool.running_count(), 0);
        assert_eq!(pool.cpu.lock().unwrap().available_count(), 1);
        assert_eq!(pool.queue.lock().unwrap().completed_count(), 1);
    }

    #[test]
    fn walltime_exceeded_job_is_killed_and_marked() {
        use std::time::Duration as StdDuration;

        let pool = make_pool(1, 10);
        {
            let mut q = pool.queue.lock().unwrap();
            q.submit(vec![JobSpec::builder(
                vec!["sleep".into(), "5".into()],
                PathBuf::from("/tmp"),
            )
            .walltime(StdDuration::from_millis(50))
            .build()]);
        }
        feed_queue(&pool.queue, &pool.cpu, &pool.work_items).unwrap();
        assert_eq!(pool.running_count(), 1);

        std::thread::sleep(StdDuration::from_millis(100));

        process_completions(&pool.queue, &pool.cpu, &pool.work_items).unwrap();
        assert_eq!(pool.running_count(), 0);
        assert_eq!(pool.cpu.lock().unwrap().available_count(), 1);
        let queue = pool.queue.lock().unwrap();
        assert_eq!(queue.completed_count(), 1);
        assert_eq!(
            queue.completed_jobs().next().unwrap().status,
            JobStatus::WalltimeExceeded
        );
    }
}
