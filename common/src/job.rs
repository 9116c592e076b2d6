use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Store-assigned job identifier. Never changes after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Count,
    CreateFile,
    CreateDir,
    DeleteFile,
    DeleteDir,
    Execute,
}

impl JobType {
    pub const ALL: [JobType; 6] = [
        JobType::Count,
        JobType::CreateFile,
        JobType::CreateDir,
        JobType::DeleteFile,
        JobType::DeleteDir,
        JobType::Execute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Count => "count",
            JobType::CreateFile => "create_file",
            JobType::CreateDir => "create_dir",
            JobType::DeleteFile => "delete_file",
            JobType::DeleteDir => "delete_dir",
            JobType::Execute => "execute",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("job type", s))
    }
}

/// Lifecycle state. Only ever moves forward: new -> in_progress -> finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    New,
    InProgress,
    Finished,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::InProgress => "in_progress",
            JobStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(JobStatus::New),
            "in_progress" => Ok(JobStatus::InProgress),
            "finished" => Ok(JobStatus::Finished),
            _ => Err(ParseEnumError::new("job status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobOutcome {
    Pass,
    Error,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Pass => "PASS",
            JobOutcome::Error => "ERROR",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobOutcome {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(JobOutcome::Pass),
            "ERROR" => Ok(JobOutcome::Error),
            _ => Err(ParseEnumError::new("job result", s)),
        }
    }
}

/// A row of `job_queue`. Timestamps are Unix seconds stamped by the store layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub client_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_host: Option<String>,
    pub job_type: JobType,
    pub job_arg: String,
    pub status: JobStatus,
    pub ctime: i64,
    pub mtime: i64,
    pub stime: Option<i64>,
}

/// Body of a task-creation request. Fields stay loose so the daemon can
/// answer bad input with a validation error instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewJob {
    pub job_type: String,
    #[serde(default)]
    pub job_arg: Option<String>,
}

impl NewJob {
    pub fn new(job_type: JobType, job_arg: impl Into<String>) -> Self {
        Self {
            job_type: job_type.as_str().to_string(),
            job_arg: Some(job_arg.into()),
        }
    }
}

/// Execution outcome reported by a worker, stored in `job_result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultInfo {
    pub result: JobOutcome,
    pub result_info: String,
    /// Execution time in seconds.
    #[serde(default)]
    pub run_time: f64,
}

impl ResultInfo {
    pub fn pass(info: impl Into<String>, run_time: f64) -> Self {
        Self { result: JobOutcome::Pass, result_info: info.into(), run_time }
    }

    pub fn error(info: impl Into<String>, run_time: f64) -> Self {
        Self { result: JobOutcome::Error, result_info: info.into(), run_time }
    }
}

/// `PUT job_result` body, serialized as the two-element array `[job, result]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobReport(pub Job, pub ResultInfo);

/// A job together with its result, if one has been reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub job: Job,
    pub result: Option<ResultInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            id: JobId(7),
            client_host: "10.0.0.1".to_string(),
            worker_host: None,
            job_type: JobType::CreateFile,
            job_arg: "/tmp/a".to_string(),
            status: JobStatus::InProgress,
            ctime: 100,
            mtime: 105,
            stime: Some(105),
        }
    }

    #[test]
    fn job_type_names_match_wire_format() {
        for t in JobType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(t.as_str().parse::<JobType>().unwrap(), t);
        }
        assert!("create".parse::<JobType>().is_err());
    }

    #[test]
    fn outcome_is_uppercase() {
        assert_eq!(serde_json::to_string(&JobOutcome::Pass).unwrap(), "\"PASS\"");
        assert_eq!("ERROR".parse::<JobOutcome>().unwrap(), JobOutcome::Error);
    }

    #[test]
    fn report_is_a_two_element_array() {
        let report = JobReport(sample_job(), ResultInfo::pass("File /tmp/a created", 0.5));
        let value = serde_json::to_value(&report).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 7);
        assert_eq!(items[0]["status"], "in_progress");
        assert_eq!(items[1]["result"], "PASS");
        assert_eq!(items[1]["result_info"], "File /tmp/a created");
    }

    #[test]
    fn new_job_without_arg_still_decodes() {
        let job: NewJob = serde_json::from_str(r#"{"job_type": "count"}"#).unwrap();
        assert_eq!(job.job_arg, None);
    }
}
