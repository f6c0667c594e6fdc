/// Dump and restore pipelines built as argument lists
///
/// A `Pipeline` stands for a shell line like `a | b > file`: each
/// stage's stdout feeds the next stage's stdin, and the last stage may be
/// redirected into a file. Nothing here goes through a shell.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::{BZIP2, COMPRESSED_EXTENSION, PGPASSWORD, PG_DUMP, PG_RESTORE, SUDO};

/// Connection parameters handed to pg_dump / pg_restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

/// A single program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl Stage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run this stage through `sudo -S`, keeping its environment
    fn elevated(self) -> Self {
        let mut args = vec!["-S".to_string()];
        if !self.envs.is_empty() {
            let keys: Vec<&str> = self.envs.iter().map(|(k, _)| k.as_str()).collect();
            args.push(format!("--preserve-env={}", keys.join(",")));
        }
        args.push(self.program);
        args.extend(self.args);

        Self {
            program: SUDO.to_string(),
            args,
            envs: self.envs,
        }
    }

    fn elevated_if(self, sudo: bool) -> Self {
        if sudo {
            self.elevated()
        } else {
            self
        }
    }

    /// Whether `program` runs in this stage, directly or under sudo
    pub fn invokes(&self, program: &str) -> bool {
        self.program == program || (self.program == SUDO && self.args.iter().any(|a| a == program))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, _) in &self.envs {
            write!(f, "{}=**** ", key)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Stages connected stdout → stdin, with optional file redirection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            stdin: None,
            stdout: None,
        }
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", stage)?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        if let Some(stdout) = &self.stdout {
            write!(f, " > {}", stdout.display())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DumpRequest {
    pub connection: Connection,
    pub database_name: String,
    pub format: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub connection: Connection,
    pub database_name: String,
    pub format: String,
    pub clean: bool,
    pub if_exists: bool,
    pub input: PathBuf,
}

fn postgres_stage(program: &str, connection: &Connection, database_name: &str, format: &str) -> Stage {
    let stage = Stage::new(program).args([
        format!("--host={}", connection.host),
        format!("--port={}", connection.port),
        format!("--username={}", connection.username),
        format!("--dbname={}", database_name),
        format!("--format={}", format),
    ]);

    match &connection.password {
        Some(password) => stage.env(PGPASSWORD, password.clone()),
        None => stage,
    }
}

/// `pg_dump ... | bzip2 -c > output`
pub fn dump_pipeline(request: &DumpRequest, sudo: bool) -> Pipeline {
    let dump = postgres_stage(
        PG_DUMP,
        &request.connection,
        &request.database_name,
        &request.format,
    )
    .elevated_if(sudo);
    let compress = Stage::new(BZIP2).arg("-c");

    Pipeline::new(vec![dump, compress]).stdout_to(&request.output)
}

/// Whether the restore input has to go through bzip2 first
pub fn is_compressed(input: &Path) -> bool {
    input
        .extension()
        .map(|ext| ext == COMPRESSED_EXTENSION)
        .unwrap_or(false)
}

/// `bzip2 -d -c input -k | pg_restore ...` for compressed input,
/// `pg_restore ... input` otherwise.
pub fn restore_pipeline(request: &RestoreRequest, sudo: bool) -> Pipeline {
    let mut restore = postgres_stage(
        PG_RESTORE,
        &request.connection,
        &request.database_name,
        &request.format,
    );
    if request.clean {
        restore = restore.arg("--clean");
    }
    if request.if_exists {
        restore = restore.arg("--if-exists");
    }

    let input = request.input.to_string_lossy().into_owned();
    if is_compressed(&request.input) {
        let decompress = Stage::new(BZIP2)
            .args(["-d", "-c"])
            .arg(input)
            .arg("-k")
            .elevated_if(sudo);
        Pipeline::new(vec![decompress, restore])
    } else {
        Pipeline::new(vec![restore.arg(input).elevated_if(sudo)])
    }
}
