use std::io::{self, Read};

use bytes::{Buf, Bytes};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::error::{IndexError, Result};

/// Index document the original job was built around.
pub const DEFAULT_INDEX_URL: &str =
    "https://antm-pt-prod-dataz-nogbd-nophi-us-east1.s3.amazonaws.com/anthem/2024-08-01_anthem_index.json.gz";

/// Chunks in flight between the network pump and the decoder. A full
/// channel suspends the pump, throttling the download to decode rate.
const PUMP_CHANNEL_CAPACITY: usize = 64;

/// `Read` adapter over the pumped byte channel.
///
/// Meant for a blocking thread (`tokio::task::spawn_blocking`): `read`
/// parks on the channel, so it must not run on an async worker. A closed
/// channel is EOF; an error forwarded by the pump surfaces as the read
/// error.
pub struct ByteStreamReader {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl ByteStreamReader {
    /// Wrap a receiver whose sender feeds `io::Result<Bytes>` chunks, as
    /// the fetch pump does.
    pub fn from_channel(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        ByteStreamReader {
            rx,
            current: Bytes::new(),
        }
    }
}

impl Read for ByteStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(err)) => return Err(err),
                None => return Ok(0),
            }
        }

        let n = self.current.len().min(buf.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

/// Start downloading the index and return a reader over its raw
/// (still-compressed) bytes.
///
/// A non-success status is fatal here, before any decoding begins. On
/// success, one task pumps the response body into a bounded channel; the
/// bounded send is the backpressure that keeps the download from running
/// ahead of the consumer. There is no retry and no timeout: the run
/// completes or fails outright.
pub async fn fetch_index(url: &str) -> Result<ByteStreamReader> {
    let response = reqwest::get(url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(IndexError::Status(status));
    }

    let (tx, rx) = mpsc::channel(PUMP_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    // A closed receiver means the consumer is gone; stop pulling.
                    if tx.send(Ok(bytes)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx
                        .send(Err(io::Error::new(io::ErrorKind::Other, err)))
                        .await;
                    break;
                }
            }
        }
    });

    Ok(ByteStreamReader::from_channel(rx))
}
