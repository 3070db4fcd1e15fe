//! ffmpeg 视频解码源
//!
//! 通过 `ffprobe` 读取分辨率，再由 `ffmpeg` 输出 8-bit 灰度 rawvideo 到 stdout，
//! 每次 `next()` 读取一帧。子进程由帧迭代器持有，提前丢弃时会被终止并回收。
//! stderr 由后台线程持续读取，只保留末尾部分用于错误信息。

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use contracts::{ContractError, DecoderConfig, FrameSize, FrameSource, GrayFrames};
use image::GrayImage;
use tracing::{debug, instrument, warn};

/// Environment override for the ffmpeg binary
pub const FFMPEG_ENV: &str = "TELEOP_FFMPEG";
/// Environment override for the ffprobe binary
pub const FFPROBE_ENV: &str = "TELEOP_FFPROBE";

/// Bytes of ffmpeg stderr kept for error messages
const STDERR_TAIL: usize = 4096;

/// Decodes videos by piping them through ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegFrameSource {
    /// Create from config; environment variables take precedence
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            ffmpeg: std::env::var(FFMPEG_ENV).unwrap_or_else(|_| config.ffmpeg.clone()),
            ffprobe: std::env::var(FFPROBE_ENV).unwrap_or_else(|_| config.ffprobe.clone()),
        }
    }

    /// Width and height of the first video stream
    fn probe_dimensions(&self, path: &Path) -> Result<FrameSize, ContractError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height"])
            .args(["-of", "csv=s=x:p=0"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ContractError::video_open(path, format!("failed to run {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ContractError::video_open(path, stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let dims = stdout.lines().next().unwrap_or("").trim().trim_end_matches('x');
        dims.parse::<FrameSize>().map_err(|_| {
            ContractError::video_open(path, format!("no video stream dimensions in '{dims}'"))
        })
    }
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl FrameSource for FfmpegFrameSource {
    #[instrument(name = "ffmpeg_open", skip(self), fields(path = %path.display()))]
    fn open(&self, path: &Path) -> Result<GrayFrames, ContractError> {
        if !path.is_file() {
            return Err(ContractError::video_open(path, "no such file"));
        }

        let size = self.probe_dimensions(path)?;
        debug!(width = size.width, height = size.height, "Probed video stream");

        let mut child = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ContractError::video_open(path, format!("failed to run {}: {e}", self.ffmpeg)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ContractError::video_open(path, "ffmpeg stdout not captured"))?;

        // ffmpeg blocks on a full stderr pipe, so it is drained from the start
        let stderr = child.stderr.take().map(spawn_stderr_drain);

        Ok(Box::new(FfmpegFrames {
            path: path.to_path_buf(),
            child,
            stdout,
            stderr,
            size,
            frames_read: 0,
            finished: false,
            reaped: false,
        }))
    }
}

/// Frame iterator over a running ffmpeg process
struct FfmpegFrames {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    size: FrameSize,
    frames_read: u64,
    /// No more items will be yielded
    finished: bool,
    /// Child has been waited on
    reaped: bool,
}

impl FfmpegFrames {
    fn frame_len(&self) -> usize {
        self.size.width as usize * self.size.height as usize
    }

    /// Fill `buf` completely; returns the number of bytes read before EOF
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Collected stderr tail; the drain thread ends once the child is gone
    fn take_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    /// Stop ffmpeg early and release it
    fn kill(&mut self) {
        self.finished = true;
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
        // Detached: a surviving grandchild may still hold the pipe open
        self.stderr.take();
    }

    /// Reap ffmpeg once stdout is drained
    fn finish(&mut self) -> Option<Result<GrayImage, ContractError>> {
        self.finished = true;

        let status = self.child.wait();
        self.reaped = true;
        let stderr = self.take_stderr();

        match status {
            Ok(status) if status.success() => {
                debug!(path = %self.path.display(), frames = self.frames_read, "Video decoded");
                None
            }
            Ok(status) => Some(Err(ContractError::video_decode(
                &self.path,
                format!("ffmpeg exited with {status}: {}", stderr.trim()),
            ))),
            Err(e) => Some(Err(ContractError::video_decode(&self.path, e.to_string()))),
        }
    }
}

/// Read stderr to EOF on a helper thread, keeping the last [`STDERR_TAIL`] bytes
fn spawn_stderr_drain(mut pipe: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut tail = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > 2 * STDERR_TAIL {
                        tail.drain(..tail.len() - STDERR_TAIL);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        if tail.len() > STDERR_TAIL {
            tail.drain(..tail.len() - STDERR_TAIL);
        }
        String::from_utf8_lossy(&tail).into_owned()
    })
}

impl Iterator for FfmpegFrames {
    type Item = Result<GrayImage, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = vec![0u8; self.frame_len()];
        match self.read_frame(&mut buf) {
            Ok(0) => self.finish(),
            Ok(n) if n < buf.len() => {
                warn!(
                    path = %self.path.display(),
                    bytes = n,
                    expected = buf.len(),
                    "Truncated trailing frame discarded"
                );
                self.finish()
            }
            Ok(_) => {
                self.frames_read += 1;
                let FrameSize { width, height } = self.size;
                Some(GrayImage::from_raw(width, height, buf).ok_or_else(|| {
                    ContractError::video_decode(&self.path, "frame buffer size mismatch")
                }))
            }
            Err(e) => {
                self.kill();
                Some(Err(ContractError::video_decode(&self.path, e.to_string())))
            }
        }
    }
}

impl Drop for FfmpegFrames {
    fn drop(&mut self) {
        self.kill();
    }
}
