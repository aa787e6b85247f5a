use crate::core::job::Job;
use crate::core::queue::JobQueue;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const RUNNING_HEADER: &str = "[running_jobs]";
const QUEUED_HEADER: &str = "[queued_jobs]";
const COMPLETED_HEADER: &str = "[completed_jobs]";

/// Best-effort line-oriented snapshot: one `job_id: <json>` line per job,
/// grouped under `[running_jobs]` / `[queued_jobs]` / `[completed_jobs]`
/// section headers. A failure to write or parse the file is never fatal —
/// callers log and continue without persistence rather than crash the
/// daemon over it.
pub fn save(queue: &JobQueue, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;

    writeln!(file, "{RUNNING_HEADER}")?;
    for job in queue.running_jobs() {
        writeln!(file, "{}: {}", job.job_id, serde_json::to_string(job)?)?;
    }

    writeln!(file, "{QUEUED_HEADER}")?;
    for job in queue.queued_jobs() {
        writeln!(file, "{}: {}", job.job_id, serde_json::to_string(job)?)?;
    }

    writeln!(file, "{COMPLETED_HEADER}")?;
    for job in queue.completed_jobs() {
        writeln!(file, "{}: {}", job.job_id, serde_json::to_string(job)?)?;
    }

    Ok(())
}

/// Loads a snapshot written by `save` into a fresh `JobQueue`. Jobs that
/// were running when the snapshot was taken come back as queued — a
/// restarted daemon has no process to reattach to.
pub fn load(path: &Path, completed_limit: usize) -> std::io::Result<JobQueue> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut queue = JobQueue::new(completed_limit);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == RUNNING_HEADER || trimmed == QUEUED_HEADER || trimmed == COMPLETED_HEADER {
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        let Some((_, json)) = trimmed.split_once(':') else {
            continue;
        };
        match serde_json::from_str::<Job>(json.trim()) {
            Ok(job) => queue.restore_job(job),
            Err(e) => {
                tracing::warn!("skipping malformed snapshot line: {e}");
            }
        }
    }

    Ok(queue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::{JobId, JobSpec, JobStatus};
    use std::path::PathBuf;

    #[test]
    fn save_and_load_round_trip_preserves_job_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.txt");

        let mut queue = JobQueue::new(10);
        queue.submit(vec![
            JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build(),
            JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build(),
        ]);

        save(&queue, &path).unwrap();
        let loaded = load(&path, 10).unwrap();

        assert_eq!(loaded.queued_count(), 2);
    }

    #[test]
    fn running_jobs_come_back_as_queued() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.txt");

        let mut queue = JobQueue::new(10);
        let ids = queue.submit(vec![JobSpec::builder(
            vec!["sleep".into(), "5".into()],
            PathBuf::from("/tmp"),
        )
        .build()]);
        queue.on_job_started(ids[0], vec![0]).unwrap();

        save(&queue, &path).unwrap();
        let loaded = load(&path, 10).unwrap();

        assert_eq!(loaded.running_count(), 0);
        assert_eq!(loaded.queued_count(), 1);
        let job = loaded.find_job(ids[0]).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn next_group_continues_past_loaded_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.txt");

        let mut queue = JobQueue::new(10);
        queue.submit(vec![JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build()]);
        save(&queue, &path).unwrap();

        let mut loaded = load(&path, 10).unwrap();
        let next_ids = loaded.submit(vec![JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build()]);
        assert_eq!(next_ids[0], JobId::new(2, 0));
    }
}
