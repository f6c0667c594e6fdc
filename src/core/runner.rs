/// Executes command pipelines as child processes

use std::fs::File;
use std::process::{Child, Command, Stdio};

use super::command::Pipeline;
use super::error::{BackupError, Result};

/// Runs a pipeline to completion. Implemented by `ProcessRunner`; mocked in tests.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, pipeline: &Pipeline) -> Result<()>;
}

/// Spawns real processes, blocking until every stage exits
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, pipeline: &Pipeline) -> Result<()> {
        tracing::info!(command = %pipeline, "Running");

        let mut children: Vec<(String, Child)> = Vec::with_capacity(pipeline.stages.len());
        let spawned = spawn_stages(pipeline, &mut children);

        // Reap whatever was started, even if a later stage failed to spawn
        let mut first_failure = None;
        for (program, mut child) in children {
            drop(child.stdout.take());
            let status = child.wait()?;
            if !status.success() && first_failure.is_none() {
                first_failure = Some(BackupError::CommandFailed { program, status });
            }
        }

        spawned?;
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn spawn_stages(pipeline: &Pipeline, children: &mut Vec<(String, Child)>) -> Result<()> {
    let last = pipeline.stages.len().saturating_sub(1);

    for (i, stage) in pipeline.stages.iter().enumerate() {
        let mut command = Command::new(&stage.program);
        command.args(&stage.args);
        for (key, value) in &stage.envs {
            command.env(key, value);
        }

        match children.last_mut() {
            Some((_, previous)) => {
                if let Some(stdout) = previous.stdout.take() {
                    command.stdin(Stdio::from(stdout));
                }
            }
            None => {
                if let Some(path) = &pipeline.stdin {
                    command.stdin(File::open(path)?);
                }
            }
        }

        if i < last {
            command.stdout(Stdio::piped());
        } else if let Some(path) = &pipeline.stdout {
            command.stdout(File::create(path)?);
        }

        let child = command.spawn().map_err(|source| BackupError::Spawn {
            program: stage.program.clone(),
            source,
        })?;
        children.push((stage.program.clone(), child));
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::command::Stage;
    use std::fs;

    #[test]
    fn test_pipes_stages_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let pipeline = Pipeline::new(vec![
            Stage::new("sh").args(["-c", "printf 'b\\na\\n'"]),
            Stage::new("sort"),
        ])
        .stdout_to(&out);

        ProcessRunner::new().run(&pipeline).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_first_stage_reads_stdin_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "c\na\nb\n").unwrap();
        let pipeline = Pipeline::new(vec![Stage::new("sort"), Stage::new("head").args(["-n", "2"])])
            .stdin_from(&input)
            .stdout_to(&out);

        assert_eq!(pipeline.to_string(), format!("sort | head -n 2 < {} > {}", input.display(), out.display()));
        ProcessRunner::new().run(&pipeline).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_missing_stdin_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(vec![Stage::new("cat")]).stdin_from(dir.path().join("missing"));
        let err = ProcessRunner::new().run(&pipeline).unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_stage_environment_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("env.txt");
        let pipeline = Pipeline::new(vec![
            Stage::new("sh").args(["-c", "printf %s \"$PGPASSWORD\""]).env("PGPASSWORD", "s3cret"),
        ])
        .stdout_to(&out);

        ProcessRunner::new().run(&pipeline).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "s3cret");
    }

    #[test]
    fn test_non_zero_exit_fails() {
        let pipeline = Pipeline::new(vec![Stage::new("sh").args(["-c", "exit 3"])]);
        let err = ProcessRunner::new().run(&pipeline).unwrap_err();
        assert!(matches!(err, BackupError::CommandFailed { ref program, .. } if program == "sh"));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let pipeline = Pipeline::new(vec![Stage::new("definitely-not-a-real-program-xyz")]);
        let err = ProcessRunner::new().run(&pipeline).unwrap_err();
        assert!(matches!(err, BackupError::Spawn { .. }));
    }
}
