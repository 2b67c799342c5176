use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A fully described child process launch.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment, for this child only.
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, data: Vec<u8>) -> Self {
        self.stdin = Some(data);
        self
    }

    /// Short program name used in diagnostics, e.g. `pg_dump`.
    pub fn tool_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Env values are masked; they carry credentials such as `PGPASSWORD`.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<String> = self.env.iter().map(|(k, _)| format!("{}=***", k)).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .field("stdin", &self.stdin.as_ref().map(|data| data.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Runs external programs to completion.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput>;
}

/// Launches real child processes through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd.spawn()?;

        // stdin is fed while output is drained, so a chatty child cannot fill its
        // stdout pipe and stall before consuming all of its input.
        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(data)) = (pipe, invocation.stdin.as_deref()) {
                pipe.write_all(data).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        match fed {
            // child quit before reading all input; its exit status decides
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            other => other?,
        }

        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_output_and_env() {
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("printf '%s' \"$PGPASSWORD\"; echo oops >&2; exit 3")
            .env("PGPASSWORD", "s3cret");

        let output = SystemRunner.run(&invocation).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout_text(), "s3cret");
        assert_eq!(output.stderr_text(), "oops");
    }

    #[tokio::test]
    async fn test_system_runner_feeds_stdin() {
        let input = "line\n".repeat(50_000).into_bytes();
        let invocation = Invocation::new("cat").stdin(input.clone());

        let output = SystemRunner.run(&invocation).await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, input);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let invocation = Invocation::new("/definitely/not/a/real/binary");
        assert!(SystemRunner.run(&invocation).await.is_err());
    }

    #[test]
    fn test_debug_masks_env_values() {
        let invocation = Invocation::new("psql")
            .arg("-d")
            .arg("keap_db")
            .env("PGPASSWORD", "s3cret")
            .stdin(b"SELECT 1;".to_vec());

        let shown = format!("{:?}", invocation);
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("PGPASSWORD=***"));
        assert!(shown.contains("keap_db"));
    }

    #[test]
    fn test_tool_name_strips_directory() {
        let invocation = Invocation::new("/usr/lib/postgresql/16/bin/pg_dump");
        assert_eq!(invocation.tool_name(), "pg_dump");
    }
}
