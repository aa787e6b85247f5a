use crate::core::job::{Job, JobId, JobSpec};
use serde::{Deserialize, Serialize};

/// Body of a `POST /qsub` request: one or more specs submitted as a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsubRequest {
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsubResponse {
    pub job_ids: Vec<JobId>,
}

/// Query parameters of `GET /qstat`. When all three are `false` (the
/// default), every job is returned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QstatQuery {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub queued: bool,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsummaryResponse {
    #[serde(rename = "Running")]
    pub running: usize,
    #[serde(rename = "Queued")]
    pub queued: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersResponse {
    pub nworkers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersRequest {
    pub nworkers: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobGroupQuery {
    pub group_number: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReallyQuery {
    #[serde(default)]
    pub really: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClearCompletedQuery {
    #[serde(default)]
    pub really: bool,
    #[serde(default)]
    pub group: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdelRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdelResponse {
    #[serde(rename = "Deleted jobs")]
    pub deleted_jobs: Vec<JobId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpriorityRequest {
    pub ids: Vec<String>,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpriorityResponse {
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type QstatResponse = Vec<Job>;
pub type JobGroupResponse = Vec<Job>;
