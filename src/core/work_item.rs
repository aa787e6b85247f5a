use crate::core::job::{Job, JobStatus};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

#[derive(Debug)]
pub enum SpawnError {
    EmptyCommand,
    Io(std::io::Error),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::EmptyCommand => write!(f, "job command is empty"),
            SpawnError::Io(e) => write!(f, "failed to spawn job: {e}"),
        }
    }
}

impl std::error::Error for SpawnError {}

impl From<std::io::Error> for SpawnError {
    fn from(e: std::io::Error) -> Self {
        SpawnError::Io(e)
    }
}

/// Owns one spawned child process end to end: process lifetime, log file
/// header/footer, walltime enforcement, and the cores it was granted.
pub struct WorkItem {
    child: Child,
    cores: Vec<u32>,
    started: Instant,
    started_at: SystemTime,
    walltime: Option<Duration>,
    log_readers: Vec<JoinHandle<()>>,
    /// Number of consecutive `process_completions` ticks this item has been
    /// observed not-running. The pool waits for this to cross 1 before
    /// tearing the item down, so a process that exits between two checks on
    /// the same tick is never missed.
    pub mark: u32,
}

impl WorkItem {
    pub fn start(job: &Job) -> Result<Self, SpawnError> {
        let cores = job.cores.clone().unwrap_or_default();
        let argv = &job.job_spec.command;
        let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;

        let log_file = job
            .job_spec
            .log_file
            .as_ref()
            .map(|path| File::create(path))
            .transpose()?;

        let started_at = SystemTime::now();
        if let Some(mut file) = log_file.as_ref().map(|f| f.try_clone()).transpose()? {
            write_header(&mut file, job, started_at)?;
        }

        let mut command = Command::new(program.as_str());
        command
            .args(args.iter().map(|a| a.as_str()))
            .current_dir(&job.job_spec.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;

        apply_priority_and_affinity(child.id(), &cores);

        let log_file = log_file.map(Mutex::new).map(Arc::new);
        let mut log_readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            log_readers.push(spawn_stream_reader(stdout, log_file.clone(), "STDOUT"));
        }
        if let Some(stderr) = child.stderr.take() {
            log_readers.push(spawn_stream_reader(stderr, log_file.clone(), "STDERR"));
        }

        Ok(Self {
            child,
            cores,
            started: Instant::now(),
            started_at,
            walltime: job.job_spec.walltime,
            log_readers,
            mark: 0,
        })
    }

    pub fn cores(&self) -> &[u32] {
        &self.cores
    }

    /// Polls the child without blocking. Returns `true` while it is still
    /// alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exceeded_walltime(&self) -> bool {
        self.walltime.map(|w| self.elapsed() > w).unwrap_or(false)
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Final status for a child that has actually exited on its own.
    /// LQTS does not interpret exit codes: any natural exit — zero or
    /// nonzero, signal or not — is `Completed`. `Error` is reserved for
    /// spawn failure, which never reaches this point.
    pub fn exit_status(&mut self) -> JobStatus {
        let _ = self.child.try_wait();
        JobStatus::Completed
    }

    /// Flushes log readers and writes the performance footer. Consumes
    /// `self` since the process is expected to already be dead.
    pub fn finish(mut self, job: &Job) {
        for handle in self.log_readers.drain(..) {
            let _ = handle.join();
        }
        if let Some(log_path) = &job.job_spec.log_file {
            if let Ok(mut file) = File::options().append(true).open(log_path) {
                let _ = write_footer(&mut file, self.started_at, SystemTime::now(), self.elapsed());
            }
        }
    }
}

fn spawn_stream_reader(
    stream: impl std::io::Read + Send + 'static,
    log_file: Option<Arc<Mutex<File>>>,
    banner: &'static str,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        let Some(log_file) = log_file else {
            for line in reader.lines().map_while(Result::ok) {
                let _ = line;
            }
            return;
        };
        let mut guard = log_file.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(guard, "{banner}\n-----------------------------------------------");
        drop(guard);
        for line in reader.lines().map_while(Result::ok) {
            let mut guard = log_file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = writeln!(guard, "{line}");
        }
    })
}

fn write_header(file: &mut File, job: &Job, started: SystemTime) -> std::io::Result<()> {
    let started: chrono::DateTime<chrono::Local> = started.into();
    writeln!(
        file,
        "Executed with LQTS (the Lightweight Queueing System)\n\
         LQTS Version {}\n\
         -----------------------------------------------\n\
         Job ID:  {}\n\
         WorkDir: {}\n\
         Command: {}\n\
         Started: {}\n\
         -----------------------------------------------\n",
        crate::core::version(),
        job.job_id,
        job.job_spec.working_dir.display(),
        job.job_spec
            .command
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        started.to_rfc3339(),
    )
}

fn write_footer(
    file: &mut File,
    started: SystemTime,
    ended: SystemTime,
    elapsed: Duration,
) -> std::io::Result<()> {
    let started: chrono::DateTime<chrono::Local> = started.into();
    let ended: chrono::DateTime<chrono::Local> = ended.into();
    writeln!(
        file,
        "\n-----------------------------------------------\n\
         Job Performance\n\
         -----------------------------------------------\n\
         Started: {}\n\
         Ended:   {}\n\
         Elapsed: {}\n\
         -----------------------------------------------",
        started.to_rfc3339(),
        ended.to_rfc3339(),
        crate::utils::format_duration(elapsed),
    )
}

#[cfg(target_os = "linux")]
fn apply_priority_and_affinity(pid: u32, cores: &[u32]) {
    unsafe {
        libc::setpriority(libc::PRIO_PROCESS, pid, 10);

        if !cores.is_empty() {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            for core in cores {
                libc::CPU_SET(*core as usize, &mut set);
            }
            libc::sched_setaffinity(pid as i32, std::mem::size_of::<libc::cpu_set_t>(), &set);
        }

        // IOPRIO_CLASS_BE (2) << 13 | level 5, matches the original's
        // best-effort low I/O priority. Best-effort: ioprio_set has no
        // libc wrapper, so this goes through raw syscall 251 (x86_64).
        #[cfg(target_arch = "x86_64")]
        {
            const IOPRIO_WHO_PROCESS: libc::c_int = 1;
            const IOPRIO_CLASS_BE: libc::c_int = 2;
            const IOPRIO_CLASS_SHIFT: libc::c_int = 13;
            let ioprio = (IOPRIO_CLASS_BE << IOPRIO_CLASS_SHIFT) | 5;
            libc::syscall(251, IOPRIO_WHO_PROCESS, pid as libc::c_int, ioprio);
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_priority_and_affinity(_pid: u32, _cores: &[u32]) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::{JobId, JobSpec};
    use std::path::PathBuf;

    fn job_with(command: Vec<&str>) -> Job {
        let spec = JobSpec::builder(
            command.into_iter().map(Into::into).collect(),
            PathBuf::from("/tmp"),
        )
        .build();
        Job::new(JobId::new(0, 0), spec)
    }

    #[test]
    fn true_command_completes_successfully() {
        let job = job_with(vec!["true"]);
        let mut item = WorkItem::start(&job).expect("spawn");
        while item.is_running() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(item.exit_status(), JobStatus::Completed);
    }

    #[test]
    fn false_command_still_completes() {
        // LQTS does not interpret exit codes: a nonzero exit is Completed,
        // not Error.
        let job = job_with(vec!["false"]);
        let mut item = WorkItem::start(&job).expect("spawn");
        while item.is_running() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(item.exit_status(), JobStatus::Completed);
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let job = job_with(vec!["this-binary-does-not-exist-anywhere"]);
        assert!(WorkItem::start(&job).is_err());
    }

    #[test]
    fn empty_command_is_rejected_before_spawn() {
        let spec = JobSpec::builder(vec![], PathBuf::from("/tmp")).build();
        let job = Job::new(JobId::new(0, 0), spec);
        assert!(matches!(WorkItem::start(&job), Err(SpawnError::EmptyCommand)));
    }

    #[test]
    fn log_file_gets_header_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("job.log");
        let mut spec = JobSpec::builder(vec!["echo".into(), "hi".into()], PathBuf::from("/tmp")).build();
        spec.log_file = Some(log_path.clone());
        let job = Job::new(JobId::new(0, 0), spec);

        let mut item = WorkItem::start(&job).expect("spawn");
        while item.is_running() {
            std::thread::sleep(Duration::from_millis(5));
        }
        item.finish(&job);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("Lightweight Queueing System"));
        assert!(contents.contains("Job Performance"));
    }
}
