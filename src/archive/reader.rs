//! Streaming a single member out of a running tool.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::debug;

use super::error::ArchiveError;

/// Reads the extracted bytes of one member from the tool's stdout.
///
/// The child is reaped by [`close`](EntryReader::close) or on drop. Either
/// way the stdout pipe is closed first: waiting on a tool that is still
/// blocked writing into an undrained pipe would never return.
#[derive(Debug)]
pub struct EntryReader {
    child: Child,
    stdout: Option<ChildStdout>,
    tool: String,
    reaped: bool,
}

impl EntryReader {
    pub(crate) fn spawn(mut cmd: Command, tool: &str) -> Result<Self, ArchiveError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| ArchiveError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
        let stdout = child.stdout.take();

        Ok(Self {
            child,
            stdout,
            tool: tool.to_string(),
            reaped: false,
        })
    }

    /// Close the pipe and wait for the tool, reporting a failed exit.
    ///
    /// Closing before everything was read usually makes the tool exit with
    /// an error, which is reported here.
    pub fn close(mut self) -> Result<(), ArchiveError> {
        self.reap()
    }

    fn reap(&mut self) -> Result<(), ArchiveError> {
        drop(self.stdout.take());
        let status = self.child.wait()?;
        self.reaped = true;

        if !status.success() {
            return Err(ArchiveError::CommandFailed {
                tool: self.tool.clone(),
                message: format!("extraction exited with {}", status),
            });
        }
        Ok(())
    }
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for EntryReader {
    fn drop(&mut self) {
        if !self.reaped {
            if let Err(e) = self.reap() {
                debug!("{} reader dropped: {}", self.tool, e);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_reads_child_stdout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf 'hello world'");
        let mut reader = EntryReader::spawn(cmd, "sh").unwrap();

        let mut data = String::new();
        reader.read_to_string(&mut data).unwrap();
        assert_eq!(data, "hello world");
        reader.close().unwrap();
    }

    #[test]
    fn test_early_close_does_not_hang() {
        // Far more output than a pipe buffer holds
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("yes | head -c 10000000");
        let mut reader = EntryReader::spawn(cmd, "sh").unwrap();

        let mut buf = [0u8; 16];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..2], b"y\n");
        // Pipeline exit status is that of `head`, which may or may not see SIGPIPE
        let _ = reader.close();
    }

    #[test]
    fn test_failed_exit_is_reported() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 2");
        let reader = EntryReader::spawn(cmd, "sh").unwrap();
        let err = reader.close().unwrap_err();
        assert!(matches!(err, ArchiveError::CommandFailed { ref tool, .. } if tool == "sh"));
    }

    #[test]
    fn test_drop_without_reading_reaps_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("yes");
        let reader = EntryReader::spawn(cmd, "sh").unwrap();
        drop(reader);
    }
}
