//! Remote client seam and the `p4` command-line implementation.
//!
//! [`RemoteClient`] is the only way the tracker and synchronizer reach the
//! server. [`P4Cli`] runs one `p4` process per call, drains its output into
//! memory, decodes it into records, and appends the exchange to the
//! diagnostic log.

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use p4watch_core::{
    record::{decode_tagged, decode_text},
    P4Config, Record,
};

use crate::diagnostic_log::DiagnosticLog;
use crate::error::{remote_err, SyncError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const PASSWORD_MASK: &str = "********";

/// Server operations the adapter issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Changes,
    Describe,
    Sync,
}

/// How an operation's stdout is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `-G` marshalled dictionaries.
    Tagged,
    /// One `data` record per stdout or stderr line.
    Text,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Changes => "changes",
            Operation::Describe => "describe",
            Operation::Sync => "sync",
        }
    }

    pub fn output_mode(self) -> OutputMode {
        match self {
            Operation::Changes | Operation::Describe => OutputMode::Tagged,
            Operation::Sync => OutputMode::Text,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes one operation against the configured server.
///
/// `args` is appended to the command line as whitespace-separated words.
pub trait RemoteClient {
    fn execute(&self, operation: Operation, args: &str) -> Result<Vec<Record>, SyncError>;
}

impl<C: RemoteClient + ?Sized> RemoteClient for &C {
    fn execute(&self, operation: Operation, args: &str) -> Result<Vec<Record>, SyncError> {
        (**self).execute(operation, args)
    }
}

/// `p4` subprocess client.
#[derive(Debug, Clone)]
pub struct P4Cli {
    config: P4Config,
    log: DiagnosticLog,
}

impl P4Cli {
    pub fn new(config: P4Config) -> Self {
        let log = DiagnosticLog::new(config.log_path.clone());
        Self { config, log }
    }

    /// Full argument vector (without the executable) for one invocation.
    pub fn command_args(&self, operation: Operation, args: &str) -> Vec<String> {
        let mut argv = Vec::new();
        if operation.output_mode() == OutputMode::Tagged {
            argv.push("-G".to_string());
        }
        for (flag, value) in [
            ("-p", &self.config.port),
            ("-c", &self.config.client),
            ("-u", &self.config.user),
            ("-P", &self.config.password),
        ] {
            argv.push(flag.to_string());
            argv.push(value.clone());
        }
        argv.push(operation.as_str().to_string());
        argv.extend(args.split_whitespace().map(str::to_string));
        argv
    }

    /// Printable command line with the password masked.
    pub fn display_command(&self, argv: &[String]) -> String {
        let mut shown = vec![self.config.p4_binary.display().to_string()];
        let mut mask_next = false;
        for arg in argv {
            if mask_next {
                shown.push(PASSWORD_MASK.to_string());
                mask_next = false;
                continue;
            }
            mask_next = arg == "-P";
            shown.push(arg.clone());
        }
        shown.join(" ")
    }

    fn run(&self, argv: &[String]) -> Result<Output, String> {
        let stdin = if self.config.interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let child = Command::new(&self.config.p4_binary)
            .args(argv)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                format!(
                    "failed to start {}: {e}",
                    self.config.p4_binary.display()
                )
            })?;

        match self.config.timeout {
            Some(limit) => wait_with_deadline(child, limit),
            None => child
                .wait_with_output()
                .map_err(|e| format!("failed waiting for process: {e}")),
        }
    }
}

impl RemoteClient for P4Cli {
    fn execute(&self, operation: Operation, args: &str) -> Result<Vec<Record>, SyncError> {
        let argv = self.command_args(operation, args);
        let command = self.display_command(&argv);
        tracing::debug!("running: {command}");

        let output = match self.run(&argv) {
            Ok(output) => output,
            Err(reason) => {
                self.log.append_failure(&command, &reason);
                return Err(remote_err(&command, reason));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = format!("exited with {}: {}", output.status, stderr.trim());
            self.log.append_failure(&command, &reason);
            return Err(remote_err(&command, reason));
        }

        let records = match operation.output_mode() {
            OutputMode::Text => decode_text(
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            OutputMode::Tagged => match decode_tagged(&output.stdout) {
                Ok(records) => records,
                Err(e) => {
                    self.log.append_failure(&command, &e.to_string());
                    return Err(e.into());
                }
            },
        };
        self.log.append(&command, &records);

        let records = screen_error_records(&command, records)?;
        tracing::debug!("{operation}: {} record(s)", records.len());
        Ok(records)
    }
}

/// Tagged output reports failures in-band as `code: error` records.
///
/// Severity 3 (failed) and above, or a missing severity, fail the call;
/// warnings such as "no such file(s)" are dropped.
fn screen_error_records(command: &str, records: Vec<Record>) -> Result<Vec<Record>, SyncError> {
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if record.text("code").as_deref() != Some("error") {
            kept.push(record);
            continue;
        }
        let message = record
            .text("data")
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| record.to_string());
        let severity = record
            .text("severity")
            .and_then(|s| s.parse::<i64>().ok());
        match severity {
            Some(level) if level < 3 => tracing::warn!("{command}: {message}"),
            _ => return Err(remote_err(command, message)),
        }
    }
    Ok(kept)
}

fn wait_with_deadline(mut child: Child, limit: Duration) -> Result<Output, String> {
    let stdout = child.stdout.take().map(|pipe| thread::spawn(move || drain(pipe)));
    let stderr = child.stderr.take().map(|pipe| thread::spawn(move || drain(pipe)));
    let deadline = Instant::now() + limit;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {:.1}s", limit.as_secs_f64()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(format!("failed waiting for process: {e}")),
        }
    };

    Ok(Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain(mut pipe: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    buf
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
