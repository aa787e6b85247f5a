use crate::core::job::{Job, JobId, JobSpec, JobStatus};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug)]
pub enum QueueError {
    NotFound(JobId),
    InvalidTransition { from: JobStatus, to: JobStatus },
    GroupNotFound(u32),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::NotFound(id) => write!(f, "job {id} not found"),
            QueueError::InvalidTransition { from, to } => {
                write!(f, "cannot transition job from {from} to {to}")
            }
            QueueError::GroupNotFound(group) => write!(f, "job group {group} not found"),
        }
    }
}

impl std::error::Error for QueueError {}

/// A batch of jobs submitted together under one group number.
#[derive(Debug, Clone)]
pub struct JobGroup {
    pub group: u32,
    pub job_ids: Vec<JobId>,
}

/// The central in-memory scheduling state: one job queue, partitioned by
/// status, plus the group index. All mutation happens through methods on
/// this type so the invariants below always hold:
///
/// - a `JobId` appears in exactly one of `queued`, `running`, `completed`
/// - `queued`/`running` jobs' `job_id.group` always has an entry in `groups`
/// - `completed.len() <= completed_limit` after `prune()`
pub struct JobQueue {
    queued: BTreeMap<JobId, Job>,
    running: BTreeMap<JobId, Job>,
    completed: BTreeMap<JobId, Job>,
    groups: BTreeMap<u32, JobGroup>,
    next_group: u32,
    completed_limit: usize,
}

impl JobQueue {
    pub fn new(completed_limit: usize) -> Self {
        Self {
            queued: BTreeMap::new(),
            running: BTreeMap::new(),
            completed: BTreeMap::new(),
            groups: BTreeMap::new(),
            next_group: 1,
            completed_limit,
        }
    }

    /// Submits a batch of job specs as one new group, returning the
    /// assigned job ids in submission order.
    pub fn submit(&mut self, specs: Vec<JobSpec>) -> Vec<JobId> {
        let group = self.next_group;
        self.next_group += 1;

        let mut job_ids = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let job_id = JobId::new(group, index as u32);
            let job = Job::new(job_id, spec);
            self.queued.insert(job_id, job);
            job_ids.push(job_id);
        }

        self.groups.insert(
            group,
            JobGroup {
                group,
                job_ids: job_ids.clone(),
            },
        );
        job_ids
    }

    /// A job is runnable when every dependency is absent from both
    /// `queued` and `running`. A dependency still in flight blocks the job;
    /// a dependency in any terminal state (including Deleted/Error/
    /// WalltimeExceeded) or missing entirely (pruned from `completed`, or
    /// never a real job) counts as satisfied.
    fn is_runnable(&self, job: &Job) -> bool {
        job.job_spec
            .depends
            .iter()
            .all(|dep| !self.queued.contains_key(dep) && !self.running.contains_key(dep))
    }

    /// Selects the next job to dispatch, ordered by `(-priority, group,
    /// index)` — higher `priority` values run first, ties broken by
    /// submission order. Jobs still blocked on an in-flight dependency are
    /// skipped.
    pub fn next_job(&mut self) -> Option<JobId> {
        let mut candidates: Vec<&Job> = self
            .queued
            .values()
            .filter(|j| self.is_runnable(j))
            .collect();
        candidates.sort_by_key(|j| (-j.job_spec.priority, j.job_id.group, j.job_id.index));
        candidates.first().map(|j| j.job_id)
    }

    pub fn on_job_started(&mut self, job_id: JobId, cores: Vec<u32>) -> Result<(), QueueError> {
        let mut job = self.queued.remove(&job_id).ok_or(QueueError::NotFound(job_id))?;
        job.status = JobStatus::Running;
        job.started = Some(std::time::SystemTime::now());
        job.cores = Some(cores);
        self.running.insert(job_id, job);
        Ok(())
    }

    pub fn on_job_finished(&mut self, job_id: JobId, status: JobStatus) -> Result<(), QueueError> {
        let mut job = self.running.remove(&job_id).ok_or(QueueError::NotFound(job_id))?;
        job.status = status;
        job.completed = Some(std::time::SystemTime::now());
        self.completed.insert(job_id, job);
        self.prune();
        Ok(())
    }

    pub fn find_job(&self, job_id: JobId) -> Option<&Job> {
        self.queued
            .get(&job_id)
            .or_else(|| self.running.get(&job_id))
            .or_else(|| self.completed.get(&job_id))
    }

    pub fn get_job_group(&self, group: u32) -> Result<Vec<&Job>, QueueError> {
        let group_entry = self.groups.get(&group).ok_or(QueueError::GroupNotFound(group))?;
        Ok(group_entry
            .job_ids
            .iter()
            .filter_map(|id| self.find_job(*id))
            .collect())
    }

    /// Deletes jobs matching `group` (and `index`, if given). Queued jobs
    /// are removed outright; running jobs are marked for the caller to
    /// kill out-of-band (the pool owns the actual process). Returns the
    /// ids that were queued (and thus removed here without external help).
    pub fn qdel(&mut self, group: u32, index: Option<u32>) -> Vec<JobId> {
        let matches = |id: &JobId| id.group == group && index.map(|i| i == id.index).unwrap_or(true);

        let to_remove: Vec<JobId> = self.queued.keys().copied().filter(matches).collect();
        for id in &to_remove {
            if let Some(mut job) = self.queued.remove(id) {
                job.status = JobStatus::Deleted;
                job.completed = Some(std::time::SystemTime::now());
                self.completed.insert(*id, job);
            }
        }
        to_remove
    }

    pub fn running_job_ids_in(&self, group: u32, index: Option<u32>) -> Vec<JobId> {
        let matches = |id: &JobId| id.group == group && index.map(|i| i == id.index).unwrap_or(true);
        self.running.keys().copied().filter(matches).collect()
    }

    pub fn qpriority(&mut self, ids: &HashSet<JobId>, priority: i32) -> usize {
        let mut updated = 0;
        for (id, job) in self.queued.iter_mut() {
            if ids.contains(id) {
                job.job_spec.priority = priority;
                updated += 1;
            }
        }
        updated
    }

    /// Evicts the oldest completed jobs once `completed.len()` exceeds
    /// `completed_limit`, down to exactly the limit.
    pub fn prune(&mut self) {
        if self.completed.len() <= self.completed_limit {
            return;
        }
        let overflow = self.completed.len() - self.completed_limit;
        let oldest: Vec<JobId> = self.completed.keys().take(overflow).copied().collect();
        for id in oldest {
            self.completed.remove(&id);
        }
    }

    /// Removes all completed jobs, or only a specific group's if given.
    pub fn clear_completed(&mut self, group: Option<u32>) -> usize {
        match group {
            None => {
                let n = self.completed.len();
                self.completed.clear();
                n
            }
            Some(g) => {
                let ids: Vec<JobId> = self
                    .completed
                    .keys()
                    .copied()
                    .filter(|id| id.group == g)
                    .collect();
                let n = ids.len();
                for id in ids {
                    self.completed.remove(&id);
                }
                n
            }
        }
    }

    /// Clears the entire queue state (queued, running records, completed,
    /// and group index). Does not touch any live process — callers must
    /// kill running work items themselves before calling this.
    pub fn clear(&mut self) {
        self.queued.clear();
        self.running.clear();
        self.completed.clear();
        self.groups.clear();
        self.next_group = 1;
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn queued_jobs(&self) -> impl Iterator<Item = &Job> {
        self.queued.values()
    }

    pub fn running_jobs(&self) -> impl Iterator<Item = &Job> {
        self.running.values()
    }

    pub fn completed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.completed.values()
    }

    /// Used by the persistence layer to restore state; bypasses the
    /// normal submit path since job ids are already assigned.
    pub fn restore_job(&mut self, mut job: Job) {
        self.next_group = self.next_group.max(job.job_id.group + 1);
        self.groups
            .entry(job.job_id.group)
            .or_insert_with(|| JobGroup {
                group: job.job_id.group,
                job_ids: Vec::new(),
            })
            .job_ids
            .push(job.job_id);

        match job.status {
            JobStatus::Running => {
                // A daemon restart means no process is actually alive; a
                // previously running job always comes back as queued.
                job.status = JobStatus::Queued;
                job.started = None;
                job.cores = None;
                self.queued.insert(job.job_id, job);
            }
            JobStatus::Queued | JobStatus::Initialized | JobStatus::Paused => {
                self.queued.insert(job.job_id, job);
            }
            JobStatus::Completed | JobStatus::Deleted | JobStatus::Error | JobStatus::WalltimeExceeded => {
                self.completed.insert(job.job_id, job);
            }
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn spec_with_priority(priority: i32) -> JobSpec {
        let mut spec = JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build();
        spec.priority = priority;
        spec
    }

    proptest! {
        /// Submitting N specs always yields N consecutive indices within a
        /// single fresh group, and every id assigned across the queue's
        /// lifetime is unique.
        #[test]
        fn submit_yields_unique_consecutive_ids(batch_sizes in prop::collection::vec(1usize..10, 1..10)) {
            let mut q = JobQueue::new(10_000);
            let mut all_ids = std::collections::HashSet::new();

            for size in batch_sizes {
                let specs: Vec<JobSpec> = (0..size).map(|_| spec_with_priority(10)).collect();
                let ids = q.submit(specs);
                prop_assert_eq!(ids.len(), size);

                let group = ids[0].group;
                for (i, id) in ids.iter().enumerate() {
                    prop_assert_eq!(id.group, group);
                    prop_assert_eq!(id.index, i as u32);
                    prop_assert!(all_ids.insert(*id), "duplicate job id {id}");
                }
            }
        }

        /// next_job always returns the highest-priority runnable job; no
        /// queued job with strictly higher priority is ever skipped over.
        #[test]
        fn next_job_never_skips_a_higher_priority_candidate(
            priorities in prop::collection::vec(-50i32..50, 1..20),
        ) {
            let mut q = JobQueue::new(10_000);
            for p in &priorities {
                q.submit(vec![spec_with_priority(*p)]);
            }

            let picked = q.next_job().expect("non-empty queue has a runnable job");
            let picked_priority = q.find_job(picked).unwrap().job_spec.priority;
            let max_priority = priorities.iter().copied().max().unwrap();
            prop_assert_eq!(picked_priority, max_priority);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec() -> JobSpec {
        JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build()
    }

    #[test]
    fn submit_assigns_sequential_group_and_index() {
        let mut q = JobQueue::new(10);
        let ids = q.submit(vec![spec(), spec()]);
        assert_eq!(ids, vec![JobId::new(1, 0), JobId::new(1, 1)]);
        let ids2 = q.submit(vec![spec()]);
        assert_eq!(ids2, vec![JobId::new(2, 0)]);
    }

    #[test]
    fn next_job_prefers_higher_priority() {
        let mut q = JobQueue::new(10);
        let mut low = spec();
        low.priority = 1;
        let mut high = spec();
        high.priority = 100;
        q.submit(vec![low]);
        q.submit(vec![high]);
        let next = q.next_job().unwrap();
        assert_eq!(next, JobId::new(2, 0));
    }

    #[test]
    fn next_job_ties_broken_by_submission_order() {
        let mut q = JobQueue::new(10);
        q.submit(vec![spec()]);
        q.submit(vec![spec()]);
        let next = q.next_job().unwrap();
        assert_eq!(next, JobId::new(1, 0));
    }

    #[test]
    fn dependency_gates_runnability() {
        let mut q = JobQueue::new(10);
        let ids = q.submit(vec![spec()]);
        let dep = ids[0];
        let mut dependent = spec();
        dependent.depends.push(dep);
        q.submit(vec![dependent]);

        // dep still queued, dependent isn't runnable yet
        let next = q.next_job().unwrap();
        assert_eq!(next, dep);

        q.on_job_started(dep, vec![0]).unwrap();
        q.on_job_finished(dep, JobStatus::Completed).unwrap();

        let next = q.next_job().unwrap();
        assert_eq!(next.group, 2);
    }

    #[test]
    fn terminally_failed_dependency_still_satisfies() {
        // A dependency that ends in any terminal state — not just
        // Completed — unblocks its dependent, per the glossary's
        // "termination in any terminal state" wording.
        let mut q = JobQueue::new(10);
        let ids = q.submit(vec![spec()]);
        let dep = ids[0];
        let mut dependent = spec();
        dependent.depends.push(dep);
        let dependent_ids = q.submit(vec![dependent]);

        q.on_job_started(dep, vec![0]).unwrap();
        q.on_job_finished(dep, JobStatus::Error).unwrap();

        let next = q.next_job().unwrap();
        assert_eq!(next, dependent_ids[0]);
    }

    #[test]
    fn dependency_on_unknown_or_pruned_job_is_satisfied() {
        // Neither queued nor running: treated as already satisfied, whether
        // it was never a real job or was evicted from `completed` by prune.
        let mut q = JobQueue::new(10);
        let mut dependent = spec();
        dependent.depends.push(JobId::new(999, 0));
        let ids = q.submit(vec![dependent]);

        let next = q.next_job().unwrap();
        assert_eq!(next, ids[0]);
    }

    #[test]
    fn prune_evicts_oldest_completed_down_to_limit() {
        let mut q = JobQueue::new(1);
        let ids = q.submit(vec![spec(), spec()]);
        for id in &ids {
            q.on_job_started(*id, vec![0]).unwrap();
            q.on_job_finished(*id, JobStatus::Completed).unwrap();
        }
        assert_eq!(q.completed_count(), 1);
        assert!(q.find_job(ids[0]).is_none());
        assert!(q.find_job(ids[1]).is_some());
    }

    #[test]
    fn qdel_removes_queued_and_marks_deleted() {
        let mut q = JobQueue::new(10);
        let ids = q.submit(vec![spec(), spec()]);
        let removed = q.qdel(ids[0].group, Some(ids[0].index));
        assert_eq!(removed, vec![ids[0]]);
        assert_eq!(q.find_job(ids[0]).unwrap().status, JobStatus::Deleted);
        assert!(q.queued_jobs().any(|j| j.job_id == ids[1]));
    }

    #[test]
    fn qpriority_updates_only_queued_jobs() {
        let mut q = JobQueue::new(10);
        let ids = q.submit(vec![spec()]);
        let set: HashSet<JobId> = ids.iter().copied().collect();
        let updated = q.qpriority(&set, 99);
        assert_eq!(updated, 1);
        assert_eq!(q.find_job(ids[0]).unwrap().job_spec.priority, 99);
    }
}
