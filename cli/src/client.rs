use async_trait::async_trait;
use common::api::{GET_JOB_PATH, JOB_PATH, JOB_RESULT_PATH, TASK_PATH};
use common::{Job, JobId, JobRecord, JobReport, NewJob, ResultInfo};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to dispatcher failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dispatcher answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response from dispatcher: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where a worker gets jobs from and sends results to.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Claim the next job. `None` means the queue is empty.
    async fn claim(&self) -> Result<Option<Job>, ClientError>;

    async fn report(&self, job: &Job, result: &ResultInfo) -> Result<(), ClientError>;
}

/// HTTP client for the dispatcher's request surface.
pub struct DispatcherClient {
    http: reqwest::Client,
    base_url: String,
}

impl DispatcherClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn body(response: Response) -> Result<String, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        Ok(body)
    }

    /// Queue a task. Returns the body echoed by the dispatcher.
    pub async fn create(&self, new_job: &NewJob) -> Result<String, ClientError> {
        log::info!("Submitting {} {:?}", new_job.job_type, new_job.job_arg);
        let response = self.http.post(self.url(TASK_PATH)).json(new_job).send().await?;
        Self::body(response).await
    }

    pub async fn status(&self, id: JobId) -> Result<JobRecord, ClientError> {
        let response = self
            .http
            .get(format!("{}/{}", self.url(JOB_PATH), id))
            .send()
            .await?;
        let body = Self::body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl JobSource for DispatcherClient {
    async fn claim(&self) -> Result<Option<Job>, ClientError> {
        let response = self.http.get(self.url(GET_JOB_PATH)).send().await?;
        let body = Self::body(response).await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        if value.as_object().map_or(false, |o| o.is_empty()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn report(&self, job: &Job, result: &ResultInfo) -> Result<(), ClientError> {
        let report = JobReport(job.clone(), result.clone());
        let response = self
            .http
            .put(self.url(JOB_RESULT_PATH))
            .json(&report)
            .send()
            .await?;
        Self::body(response).await?;
        Ok(())
    }
}
