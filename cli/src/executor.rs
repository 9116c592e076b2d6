use async_trait::async_trait;
use common::JobType;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// File the `execute` job writes its command output to, inside the dump dir.
pub const COMMAND_RESULT_FILE: &str = "command_result";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command {command:?} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl ExecutionError {
    fn io(path: &Path, source: io::Error) -> Self {
        ExecutionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Performs the actual work of a job and describes the outcome.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, job_type: JobType, job_arg: &str) -> Result<String, ExecutionError>;
}

/// Runs jobs against the local filesystem.
pub struct FsExecutor {
    dump_dir: PathBuf,
}

impl FsExecutor {
    pub fn new(dump_dir: impl Into<PathBuf>) -> Self {
        Self {
            dump_dir: dump_dir.into(),
        }
    }

    async fn unique_words(path: &Path) -> Result<String, ExecutionError> {
        log::info!("Counting unique words in {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExecutionError::io(path, e))?;
        let words: HashSet<&str> = content.split_whitespace().collect();
        Ok(format!("Unique words: {}", words.len()))
    }

    async fn create_file(path: &Path) -> Result<String, ExecutionError> {
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await;
        match created {
            Ok(_) => Ok(format!("File {} created", path.display())),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::info!("File {} already exists", path.display());
                Ok(format!("File {} already exists", path.display()))
            }
            Err(e) => Err(ExecutionError::io(path, e)),
        }
    }

    async fn create_dir(path: &Path) -> Result<String, ExecutionError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ExecutionError::io(path, e))?;
        Ok(format!("Directory {} created", path.display()))
    }

    async fn delete_file(path: &Path) -> Result<String, ExecutionError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| ExecutionError::io(path, e))?;
        Ok(format!("File {} deleted", path.display()))
    }

    async fn delete_dir(path: &Path) -> Result<String, ExecutionError> {
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| ExecutionError::io(path, e))?;
        Ok(format!("Directory {} deleted", path.display()))
    }

    /// Runs `cmd` split on whitespace, without a shell.
    async fn execute_command(&self, cmd: &str) -> Result<String, ExecutionError> {
        let mut parts = cmd.split_whitespace();
        let program = parts.next().ok_or(ExecutionError::EmptyCommand)?;
        let output = Command::new(program)
            .args(parts)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                command: cmd.to_string(),
                source,
            })?;
        log::debug!("{} exited with {}", cmd, output.status);

        if !output.status.success() {
            return Err(ExecutionError::CommandFailed {
                command: cmd.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let dump_file = self.dump_dir.join(COMMAND_RESULT_FILE);
        let dump = format!("{}\n{}", cmd, String::from_utf8_lossy(&output.stdout));
        tokio::fs::write(&dump_file, dump)
            .await
            .map_err(|e| ExecutionError::io(&dump_file, e))?;
        log::info!("{} result saved to {}", cmd, dump_file.display());
        Ok(format!("Cmd result saved to {}", dump_file.display()))
    }
}

#[async_trait]
impl Executor for FsExecutor {
    async fn execute(&self, job_type: JobType, job_arg: &str) -> Result<String, ExecutionError> {
        let path = Path::new(job_arg);
        match job_type {
            JobType::Count => Self::unique_words(path).await,
            JobType::CreateFile => Self::create_file(path).await,
            JobType::CreateDir => Self::create_dir(path).await,
            JobType::DeleteFile => Self::delete_file(path).await,
            JobType::DeleteDir => Self::delete_dir(path).await,
            JobType::Execute => self.execute_command(job_arg).await,
        }
    }
}
