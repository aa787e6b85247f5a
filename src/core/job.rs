use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use strum::{Display, EnumString};

/// `(group, index)` pair identifying a job uniquely within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId {
    pub group: u32,
    pub index: u32,
}

impl JobId {
    pub fn new(group: u32, index: u32) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.group, self.index)
    }
}

#[derive(Debug)]
pub enum JobIdParseError {
    Empty,
    InvalidGroup(String),
    InvalidIndex(String),
}

impl fmt::Display for JobIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobIdParseError::Empty => write!(f, "job id string is empty"),
            JobIdParseError::InvalidGroup(s) => write!(f, "invalid group number: {s}"),
            JobIdParseError::InvalidIndex(s) => write!(f, "invalid index: {s}"),
        }
    }
}

impl std::error::Error for JobIdParseError {}

/// The result of parsing a job id string. `"G"` and `"G.*"` both mean "the
/// whole group" and carry no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobIdSelector {
    pub group: u32,
    pub index: Option<u32>,
}

impl std::str::FromStr for JobIdSelector {
    type Err = JobIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(JobIdParseError::Empty);
        }
        match value.split_once('.') {
            None => {
                let group = value
                    .parse::<u32>()
                    .map_err(|_| JobIdParseError::InvalidGroup(value.to_string()))?;
                Ok(JobIdSelector { group, index: None })
            }
            Some((g, i)) => {
                let group = g
                    .parse::<u32>()
                    .map_err(|_| JobIdParseError::InvalidGroup(g.to_string()))?;
                if i.is_empty() || i == "*" {
                    Ok(JobIdSelector { group, index: None })
                } else {
                    let index = i
                        .parse::<u32>()
                        .map_err(|_| JobIdParseError::InvalidIndex(i.to_string()))?;
                    Ok(JobIdSelector {
                        group,
                        index: Some(index),
                    })
                }
            }
        }
    }
}

/// Single-letter wire form mirrors the original LQTS status codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum JobStatus {
    #[strum(to_string = "I", serialize = "I", serialize = "i")]
    Initialized,
    #[strum(to_string = "Q", serialize = "Q", serialize = "q")]
    Queued,
    #[strum(to_string = "R", serialize = "R", serialize = "r")]
    Running,
    #[strum(to_string = "C", serialize = "C", serialize = "c")]
    Completed,
    #[strum(to_string = "D", serialize = "D", serialize = "d")]
    Deleted,
    #[strum(to_string = "E", serialize = "E", serialize = "e")]
    Error,
    #[strum(to_string = "P", serialize = "P", serialize = "p")]
    Paused,
    #[strum(to_string = "X", serialize = "X", serialize = "x")]
    WalltimeExceeded,
}

impl JobStatus {
    pub const TERMINAL: &'static [JobStatus] = &[
        JobStatus::Completed,
        JobStatus::Deleted,
        JobStatus::Error,
        JobStatus::WalltimeExceeded,
    ];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

pub type DependencyIds = SmallVec<[JobId; 2]>;

/// The immutable request a client submits. `command` is already tokenized
/// (no shell is ever invoked on it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub command: Vec<CompactString>,
    pub working_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_cores")]
    pub cores: u32,
    #[serde(default)]
    pub depends: DependencyIds,
    #[serde(default)]
    pub walltime: Option<Duration>,
    #[serde(default)]
    pub alternate_runner: bool,
}

fn default_priority() -> i32 {
    10
}

fn default_cores() -> u32 {
    1
}

impl JobSpec {
    pub fn builder(command: Vec<CompactString>, working_dir: PathBuf) -> JobSpecBuilder {
        JobSpecBuilder {
            command,
            working_dir,
            log_file: None,
            priority: default_priority(),
            cores: default_cores(),
            depends: DependencyIds::new(),
            walltime: None,
            alternate_runner: false,
        }
    }
}

#[derive(Default)]
pub struct JobSpecBuilder {
    command: Vec<CompactString>,
    working_dir: PathBuf,
    log_file: Option<PathBuf>,
    priority: i32,
    cores: u32,
    depends: DependencyIds,
    walltime: Option<Duration>,
    alternate_runner: bool,
}

impl JobSpecBuilder {
    pub fn log_file(mut self, log_file: impl Into<Option<PathBuf>>) -> Self {
        self.log_file = log_file.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn cores(mut self, cores: u32) -> Self {
        self.cores = cores.max(1);
        self
    }

    pub fn depends(mut self, depends: impl Into<DependencyIds>) -> Self {
        self.depends = depends.into();
        self
    }

    pub fn walltime(mut self, walltime: impl Into<Option<Duration>>) -> Self {
        self.walltime = walltime.into();
        self
    }

    pub fn alternate_runner(mut self, alternate_runner: bool) -> Self {
        self.alternate_runner = alternate_runner;
        self
    }

    pub fn build(self) -> JobSpec {
        JobSpec {
            command: self.command,
            working_dir: self.working_dir,
            log_file: self.log_file,
            priority: self.priority,
            cores: self.cores,
            depends: self.depends,
            walltime: self.walltime,
            alternate_runner: self.alternate_runner,
        }
    }
}

/// Scheduling record wrapping an immutable `JobSpec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub job_spec: JobSpec,
    pub status: JobStatus,
    pub submitted: Option<SystemTime>,
    pub started: Option<SystemTime>,
    pub completed: Option<SystemTime>,
    pub cores: Option<Vec<u32>>,
}

impl Job {
    pub fn new(job_id: JobId, job_spec: JobSpec) -> Self {
        Self {
            job_id,
            job_spec,
            status: JobStatus::Queued,
            submitted: Some(SystemTime::now()),
            started: None,
            completed: None,
            cores: None,
        }
    }

    /// Wall-clock duration: `completed - started` if done, `now - started`
    /// if running, zero otherwise.
    pub fn walltime(&self) -> Duration {
        match (self.started, self.completed) {
            (Some(start), Some(end)) => end.duration_since(start).unwrap_or_default(),
            (Some(start), None) => SystemTime::now().duration_since(start).unwrap_or_default(),
            (None, _) => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn job_id_display_is_zero_padded() {
        assert_eq!(JobId::new(3, 7).to_string(), "3.007");
        assert_eq!(JobId::new(12, 123).to_string(), "12.123");
    }

    #[test]
    fn job_id_selector_parses_group_only() {
        let sel = JobIdSelector::from_str("5").unwrap();
        assert_eq!(sel, JobIdSelector { group: 5, index: None });
    }

    #[test]
    fn job_id_selector_parses_group_star() {
        let sel = JobIdSelector::from_str("5.*").unwrap();
        assert_eq!(sel, JobIdSelector { group: 5, index: None });
    }

    #[test]
    fn job_id_selector_parses_group_and_index() {
        let sel = JobIdSelector::from_str("5.2").unwrap();
        assert_eq!(
            sel,
            JobIdSelector {
                group: 5,
                index: Some(2)
            }
        );
    }

    #[test]
    fn job_id_selector_rejects_garbage() {
        assert!(JobIdSelector::from_str("").is_err());
        assert!(JobIdSelector::from_str("abc").is_err());
        assert!(JobIdSelector::from_str("1.abc").is_err());
    }

    #[test]
    fn job_ordering_is_group_then_index() {
        let a = JobId::new(1, 5);
        let b = JobId::new(2, 0);
        assert!(a < b);
        assert!(JobId::new(1, 0) < JobId::new(1, 1));
    }

    #[test]
    fn job_walltime_zero_before_start() {
        let spec = JobSpec::builder(vec!["echo".into()], PathBuf::from("/tmp")).build();
        let job = Job::new(JobId::new(1, 0), spec);
        assert_eq!(job.walltime(), Duration::ZERO);
    }

    #[test]
    fn status_round_trips_through_single_letter() {
        for (s, letter) in [
            (JobStatus::Initialized, "I"),
            (JobStatus::Queued, "Q"),
            (JobStatus::Running, "R"),
            (JobStatus::Completed, "C"),
            (JobStatus::Deleted, "D"),
            (JobStatus::Error, "E"),
            (JobStatus::Paused, "P"),
            (JobStatus::WalltimeExceeded, "X"),
        ] {
            assert_eq!(s.to_string(), letter);
        }
    }
}
