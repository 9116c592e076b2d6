//! Job lifecycle: create, claim, report.
//!
//! `status` only moves forward (new -> in_progress -> finished). A claim
//! selects and flips the oldest new job inside one write transaction, guarded
//! by a conditional update, so a job is handed to at most one worker.

use crate::clock::Clock;
use crate::error::DispatchError;
use crate::store::{query, Order, StoreClient};
use common::{Job, JobId, JobOutcome, JobRecord, JobStatus, JobType, ParseEnumError, ResultInfo};
use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;
use std::sync::Arc;

const JOB_QUEUE: &str = "job_queue";
const JOB_RESULT: &str = "job_result";
const JOB_COLUMNS: [&str; 9] = [
    "id",
    "client_host",
    "worker_host",
    "job_type",
    "job_arg",
    "status",
    "ctime",
    "mtime",
    "stime",
];
const RESULT_COLUMNS: [&str; 3] = ["result", "result_info", "run_time"];

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: JobId(row.get(0)?),
        client_host: row.get(1)?,
        worker_host: row.get(2)?,
        job_type: parse_column(row, 3)?,
        job_arg: row.get(4)?,
        status: parse_column(row, 5)?,
        ctime: row.get(6)?,
        mtime: row.get(7)?,
        stime: row.get(8)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ResultInfo> {
    Ok(ResultInfo {
        result: parse_column::<JobOutcome>(row, 0)?,
        result_info: row.get(1)?,
        run_time: row.get(2)?,
    })
}

#[derive(Clone)]
pub struct Dispatcher {
    store: StoreClient,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(store: StoreClient, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Queue a new job in state `new`.
    pub fn create(&self, job_type: &str, job_arg: Option<&str>, client_host: &str) -> Result<Job, DispatchError> {
        let job_type: JobType = job_type
            .parse()
            .map_err(|e: ParseEnumError| DispatchError::Validation(e.to_string()))?;
        let job_arg = match job_arg {
            Some(arg) if !arg.trim().is_empty() => arg.to_string(),
            _ => return Err(DispatchError::Validation("job_arg is required".to_string())),
        };
        let now = self.clock.now();

        self.store.run_in_transaction("create job", |tx| -> Result<Job, DispatchError> {
            let id = query::insert(
                tx,
                JOB_QUEUE,
                &[
                    ("client_host", &client_host),
                    ("job_type", &job_type.as_str()),
                    ("job_arg", &job_arg),
                    ("status", &JobStatus::New.as_str()),
                    ("ctime", &now),
                    ("mtime", &now),
                ],
            )?;
            log::info!("Created job {} ({} {}) for {}", id, job_type, job_arg, client_host);
            Ok(Job {
                id: JobId(id),
                client_host: client_host.to_string(),
                worker_host: None,
                job_type,
                job_arg,
                status: JobStatus::New,
                ctime: now,
                mtime: now,
                stime: None,
            })
        })
    }

    /// Hand the oldest new job to `worker_host`. `None` means the queue is empty.
    pub fn claim(&self, worker_host: &str) -> Result<Option<Job>, DispatchError> {
        let now = self.clock.now();

        self.store.run_in_transaction("claim job", |tx| -> Result<Option<Job>, DispatchError> {
            let new = JobStatus::New.as_str();
            let candidate = query::select_one(
                tx,
                JOB_QUEUE,
                &JOB_COLUMNS,
                &[("status", &new)],
                &[Order::Asc("ctime"), Order::Asc("id")],
                job_from_row,
            )?;
            let Some(mut job) = candidate else {
                log::debug!("No new jobs to hand out");
                return Ok(None);
            };

            let in_progress = JobStatus::InProgress.as_str();
            let mtime = now.max(job.ctime);
            let changed = query::update_if(
                tx,
                JOB_QUEUE,
                job.id.0,
                &[("status", &new)],
                &[
                    ("status", &in_progress),
                    ("stime", &now),
                    ("mtime", &mtime),
                    ("worker_host", &worker_host),
                ],
            )?;
            if changed != 1 {
                log::warn!("Job {} was no longer new when claimed by {}", job.id, worker_host);
                return Ok(None);
            }

            job.status = JobStatus::InProgress;
            job.stime = Some(now);
            job.mtime = mtime;
            job.worker_host = Some(worker_host.to_string());
            log::info!("Job {} claimed by {}", job.id, worker_host);
            Ok(Some(job))
        })
    }

    /// Record a worker's result and finish the job.
    pub fn report(&self, job_id: JobId, outcome: &ResultInfo) -> Result<Job, DispatchError> {
        let now = self.clock.now();

        self.store.run_in_transaction("report job result", |tx| -> Result<Job, DispatchError> {
            let mut job = query::select_one(tx, JOB_QUEUE, &JOB_COLUMNS, &[("id", &job_id.0)], &[], job_from_row)?
                .ok_or(DispatchError::NotFound(job_id))?;
            if job.status != JobStatus::InProgress {
                log::warn!("Result reported for job {} while it is {}, expected in_progress", job.id, job.status);
            }

            let mtime = now.max(job.ctime);
            query::update(
                tx,
                JOB_QUEUE,
                job_id.0,
                &[("status", &JobStatus::Finished.as_str()), ("mtime", &mtime)],
            )?;
            query::upsert(
                tx,
                JOB_RESULT,
                "job_id",
                &[
                    ("job_id", &job_id.0),
                    ("result", &outcome.result.as_str()),
                    ("result_info", &outcome.result_info),
                    ("run_time", &outcome.run_time),
                ],
            )?;
            log::info!("Job {} finished: {} {}", job_id, outcome.result, outcome.result_info);

            job.status = JobStatus::Finished;
            job.mtime = mtime;
            Ok(job)
        })
    }

    pub fn get(&self, job_id: JobId) -> Result<JobRecord, DispatchError> {
        self.store.run_in_transaction("get job", |tx| -> Result<JobRecord, DispatchError> {
            let job = query::select_one(tx, JOB_QUEUE, &JOB_COLUMNS, &[("id", &job_id.0)], &[], job_from_row)?
                .ok_or(DispatchError::NotFound(job_id))?;
            let result =
                query::select_one(tx, JOB_RESULT, &RESULT_COLUMNS, &[("job_id", &job_id.0)], &[], result_from_row)?;
            Ok(JobRecord { job, result })
        })
    }
}
