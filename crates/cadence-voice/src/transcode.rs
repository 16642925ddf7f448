//! Subprocess transcoding of a remote stream into PCM.
//!
//! Spawns ffmpeg against the chosen stream URL and yields 48 kHz stereo
//! s16le chunks from its stdout. The reconnect flags keep long streams alive
//! across transient CDN drops.

use bytes::Bytes;
use cadence_core::{Error, Result, TransportHeaders};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Read size for stdout chunks.
const CHUNK_SIZE: usize = 65536;

/// One unit of transcoder output.
#[derive(Debug, Clone)]
pub enum PcmChunk {
    /// Decoded PCM data.
    Data(Bytes),
    /// The stream ended normally.
    Complete,
    /// The transcoder failed.
    Error(String),
}

/// A running ffmpeg transcode of one stream URL.
pub struct TranscodeStream {
    rx: mpsc::Receiver<PcmChunk>,
    task: JoinHandle<()>,
}

impl TranscodeStream {
    /// Spawn ffmpeg for a stream URL and start reading its output.
    pub fn spawn(stream_url: &str, headers: &TransportHeaders) -> Result<Self> {
        let args = ffmpeg_args(stream_url, headers);
        debug!("Spawning ffmpeg for transcode");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Transport(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Transport("failed to capture ffmpeg stdout".to_string()))?;

        let (tx, rx) = mpsc::channel(64);

        let task = tokio::spawn(async move {
            let mut buffer = vec![0u8; CHUNK_SIZE];

            loop {
                match stdout.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = Bytes::copy_from_slice(&buffer[..n]);
                        if tx.send(PcmChunk::Data(chunk)).await.is_err() {
                            debug!("Receiver dropped, aborting transcode");
                            if let Err(e) = child.kill().await {
                                warn!("Failed to kill ffmpeg: {e}");
                            }
                            let _ = child.wait().await;
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(PcmChunk::Error(format!("read error: {e}"))).await;
                        return;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    let _ = tx.send(PcmChunk::Complete).await;
                }
                Ok(status) => {
                    let _ = tx
                        .send(PcmChunk::Error(format!(
                            "ffmpeg exited with {:?}",
                            status.code()
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(PcmChunk::Error(format!("failed to wait for ffmpeg: {e}")))
                        .await;
                }
            }
        });

        Ok(Self { rx, task })
    }

    /// Receive the next chunk, or `None` once the channel is closed.
    pub async fn next_chunk(&mut self) -> Option<PcmChunk> {
        self.rx.recv().await
    }

    /// Abort the transcode.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for TranscodeStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Argument list for one transcode invocation.
fn ffmpeg_args(stream_url: &str, headers: &TransportHeaders) -> Vec<String> {
    let header_block = format!(
        "User-Agent: {}\r\nReferer: {}\r\nOrigin: {}\r\n",
        headers.user_agent, headers.referer, headers.origin
    );

    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-reconnect".to_string(),
        "1".to_string(),
        "-reconnect_streamed".to_string(),
        "1".to_string(),
        "-reconnect_delay_max".to_string(),
        "5".to_string(),
        "-headers".to_string(),
        header_block,
        "-i".to_string(),
        stream_url.to_string(),
        "-vn".to_string(),
        "-f".to_string(),
        "s16le".to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "pipe:1".to_string(),
    ]
}
