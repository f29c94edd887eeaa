//! Detached launching of external viewers and editors.
//! （以分離方式啟動外部檢視器與編輯器。）
//!
//! A viewer opened on a page or image must outlive the call that started it,
//! so the launcher spawns the process with null standard streams and hands
//! the child to a reaper thread instead of waiting for it.
//! 由筆記開啟的檢視器需在呼叫結束後繼續執行，因此以空的標準串流啟動，
//! 並交由回收執行緒等待子行程結束。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

/// Errors that may surface while launching a program.
/// （啟動程式時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no program given")]
    EmptyProgram,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Serializable launch specification.
/// （可序列化的啟動設定。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<OsString>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Creates a new specification pointing at the given program.
    /// （以指定的程式建立啟動設定。）
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    /// Appends an argument; paths are passed through without UTF-8 conversion.
    /// （加入一個參數，路徑不需轉為 UTF-8。）
    pub fn push_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments at once.
    /// （一次加入多個參數。）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Registers an environment variable override.
    /// （設定環境變數覆寫值。）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    /// （設定執行的工作目錄。）
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Handle of a launched process.
/// （已啟動行程的資訊。）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Launched {
    pub pid: u32,
}

/// Spawns programs without waiting for them.
/// （啟動程式但不等待其結束。）
pub struct Launcher;

impl Launcher {
    /// Starts the program described by `spec` and returns immediately.
    /// （啟動設定所描述的程式並立即返回。）
    pub fn spawn(spec: &LaunchSpec) -> Result<Launched, RunError> {
        if spec.program.trim().is_empty() {
            return Err(RunError::EmptyProgram);
        }

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(Launched { pid })
    }
}
