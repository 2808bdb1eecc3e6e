//! Low-level line/byte framing over a duplex stream.

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Buffered duplex stream speaking the exchange framing: newline-terminated
/// text lines plus exact-length raw bodies.
///
/// Generic over the underlying transport so protocol logic can be tested
/// against mock streams.
#[derive(Debug)]
pub struct IpcStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> IpcStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a duplex stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one line, trimmed of trailing whitespace.
    ///
    /// Returns an empty string at end of stream; callers treat that as the
    /// peer declining rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the line exceeds the length cap.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_line(&mut line)
            .await?;
        if n == MAX_LINE_LENGTH && !line.ends_with('\n') {
            return Err(Error::Protocol("line too long".to_string()));
        }
        Ok(line.trim_end().to_string())
    }

    /// Writes one newline-terminated line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(line.as_bytes());
        self.write_buffer.extend_from_slice(b"\n");

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads exactly `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream ends before `len` bytes arrive.
    pub async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut body = vec![0_u8; len];
        self.reader.read_exact(&mut body).await?;
        Ok(body)
    }

    /// Writes raw bytes and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn test_read_line_trims_trailing_whitespace() {
        let mock = Builder::new().read(b"PAPERCUT\r\n").build();
        let mut stream = IpcStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap(), "PAPERCUT");
    }

    #[tokio::test]
    async fn test_read_line_at_eof_is_empty() {
        let mock = Builder::new().build();
        let mut stream = IpcStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_line_rejects_oversized_line() {
        let long = vec![b'a'; MAX_LINE_LENGTH];
        let mock = Builder::new().read(&long).build();
        let mut stream = IpcStream::new(mock);

        let result = stream.read_line().await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_write_line_appends_newline() {
        let mock = Builder::new().write(b"ACK\n").build();
        let mut stream = IpcStream::new(mock);

        stream.write_line("ACK").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_exact_body() {
        let mock = Builder::new().read(b"hello world").build();
        let mut stream = IpcStream::new(mock);

        assert_eq!(stream.read_exact(5).await.unwrap(), b"hello");
        assert_eq!(stream.read_exact(6).await.unwrap(), b" world");
    }

    #[tokio::test]
    async fn test_read_exact_fails_on_short_stream() {
        let mock = Builder::new().read(b"abc").build();
        let mut stream = IpcStream::new(mock);

        assert!(stream.read_exact(8).await.is_err());
    }
}
