//! Deadline-armed socket I/O.
//!
//! Maps the two expected stream conditions, deadline expiry with no data
//! and end-of-stream, to non-error outcomes so the connection loop can
//! treat them as control flow instead of failures.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Outcome of one deadline-bounded read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n > 0` bytes were read into the buffer.
    Data(usize),
    /// The deadline elapsed with no data; the caller keeps waiting.
    TimedOut,
    /// The peer closed the stream cleanly.
    Closed,
}

/// Read the next chunk, giving up after `timeout`.
pub async fn read_chunk<S>(
    stream: &mut S,
    buf: &mut [u8],
    timeout: Duration,
) -> io::Result<ReadOutcome>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout(timeout, stream.read(buf)).await {
        Err(_elapsed) => Ok(ReadOutcome::TimedOut),
        Ok(Ok(0)) => Ok(ReadOutcome::Closed),
        Ok(Ok(n)) => Ok(ReadOutcome::Data(n)),
        Ok(Err(err)) => Err(err),
    }
}

/// Write a full frame, giving up after `timeout`.
pub async fn write_frame<S>(stream: &mut S, data: &[u8], timeout: Duration) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    match tokio::time::timeout(timeout, stream.write_all(data)).await {
        Err(_elapsed) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "write deadline elapsed",
        )),
        Ok(result) => result,
    }
}
