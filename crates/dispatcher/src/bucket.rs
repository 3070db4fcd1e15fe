//! LabelBucket - one output directory per command code
//!
//! Layout: `<root>/<code>/{0.jpeg, 1.jpeg, ..., speeds.txt}`. Numbering resumes
//! after the highest index already on disk, existing files are never touched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, LineWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{CommandCode, ContractError, OutputConfig, Telemetry};
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageFormat};
use tracing::{debug, instrument, warn};

/// Image encoding chosen from the configured extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Jpeg { quality: u8 },
    Png,
}

impl Encoding {
    fn from_config(output: &OutputConfig) -> Result<Self, ContractError> {
        match output.image_extension.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Encoding::Jpeg {
                quality: output.jpeg_quality,
            }),
            "png" => Ok(Encoding::Png),
            other => Err(ContractError::config_validation(
                "output.image_extension",
                format!("unsupported image extension '{other}'"),
            )),
        }
    }
}

/// Append-only bucket for a single command code
///
/// The speeds log is opened on first write and released by [`close`](Self::close)
/// or on drop, whichever comes first.
#[derive(Debug)]
pub struct LabelBucket {
    code: CommandCode,
    dir: PathBuf,
    extension: String,
    encoding: Encoding,
    speeds_path: PathBuf,
    speeds: Option<LineWriter<File>>,
    next_index: u64,
    written: u64,
}

impl LabelBucket {
    /// Create `<root>/<code>/` if needed and resume numbering after its contents
    #[instrument(name = "bucket_open", skip_all, fields(code = %code))]
    pub fn open(root: &Path, code: CommandCode, output: &OutputConfig) -> Result<Self, ContractError> {
        let encoding = Encoding::from_config(output)?;
        let dir = root.join(code.to_string());
        fs::create_dir_all(&dir).map_err(|e| sink_error(code, format!("{}: {e}", dir.display())))?;

        let next_index = next_free_index(&dir, &output.image_extension)
            .map_err(|e| sink_error(code, format!("{}: {e}", dir.display())))?;
        if next_index > 0 {
            debug!(dir = %dir.display(), next_index, "Resuming non-empty bucket");
        }

        Ok(Self {
            code,
            speeds_path: dir.join(&output.speeds_file),
            dir,
            extension: output.image_extension.clone(),
            encoding,
            speeds: None,
            next_index,
            written: 0,
        })
    }

    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Index the next image will receive
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Images written since this bucket was opened
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Store one frame and append its speed record; returns the file name
    ///
    /// The image is persisted before its speeds line, so every line names a
    /// file that exists.
    pub fn write(&mut self, frame: &GrayImage, telemetry: Telemetry) -> Result<String, ContractError> {
        let code = self.code;
        let filename = format!("{}.{}", self.next_index, self.extension);
        let path = self.dir.join(&filename);

        self.save_image(&path, frame)
            .map_err(|e| sink_error(code, format!("{}: {e}", path.display())))?;
        self.next_index += 1;

        writeln!(
            self.speeds_writer()?,
            "{},{},{}",
            filename, telemetry.left_speed, telemetry.right_speed
        )
        .map_err(|e| sink_error(code, e.to_string()))?;

        self.written += 1;
        metrics::counter!("bucket_samples_written_total", "code" => code.to_string()).increment(1);
        Ok(filename)
    }

    /// Flush the speeds log
    pub fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(speeds) = self.speeds.as_mut() {
            speeds.flush().map_err(|e| sink_error(self.code, e.to_string()))?;
        }
        Ok(())
    }

    /// Flush and release the speeds log handle
    pub fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut speeds) = self.speeds.take() {
            speeds.flush().map_err(|e| sink_error(self.code, e.to_string()))?;
            debug!(code = %self.code, written = self.written, "Bucket closed");
        }
        Ok(())
    }

    fn speeds_writer(&mut self) -> Result<&mut LineWriter<File>, ContractError> {
        let speeds = match self.speeds.take() {
            Some(speeds) => speeds,
            None => LineWriter::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.speeds_path)
                    .map_err(|e| {
                        sink_error(self.code, format!("{}: {e}", self.speeds_path.display()))
                    })?,
            ),
        };
        Ok(self.speeds.insert(speeds))
    }

    fn save_image(&self, path: &Path, frame: &GrayImage) -> image::ImageResult<()> {
        // create_new: a name collision means someone else wrote into the bucket
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = BufWriter::new(file);

        match self.encoding {
            Encoding::Jpeg { quality } => {
                frame.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?
            }
            Encoding::Png => frame.write_to(&mut writer, ImageFormat::Png)?,
        }
        writer.flush()?;
        Ok(())
    }
}

impl Drop for LabelBucket {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(code = %self.code, error = %e, "Failed to flush speeds log on drop");
        }
    }
}

fn sink_error(code: CommandCode, message: impl Into<String>) -> ContractError {
    ContractError::sink_write(format!("bucket/{code}"), message)
}

/// `max(existing index) + 1`, or 0 for an empty directory
///
/// Only names of the form `<digits>.<extension>` count.
pub fn next_free_index(dir: &Path, extension: &str) -> io::Result<u64> {
    let mut next = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(index) = parse_indexed_name(name, extension) {
            next = next.max(index.saturating_add(1));
        }
    }
    Ok(next)
}

fn parse_indexed_name(name: &str, extension: &str) -> Option<u64> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
