// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine seam and the Tesseract driver.
//
// The pipeline talks to OCR engines through the `TextRecognizer` trait. The
// bundled implementation drives the `tesseract` executable as a subprocess:
// each call writes the variant as PNG into a private temporary directory,
// asks Tesseract for both plain text and TSV word data in one invocation,
// and parses the two output files.
//
// # Executable discovery
//
// There is no global engine path. Callers build a `TesseractConfig` once,
// either explicitly or with `TesseractConfig::discover()` (searches `PATH`,
// then the usual Windows install locations), and pass it to the engine.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use lesewerk_core::config::RunnerSettings;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{BoxRect, OcrConfiguration, WordBox};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// What an engine returns for one image under one configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    /// Word boxes in the pixel space of the image that was recognised.
    pub words: Vec<WordBox>,
}

/// An OCR engine the recognition runner can call.
///
/// Implementations must be safe to call from several tasks at once; each call
/// is independent and must not mutate shared state. Dropping the returned
/// future must stop the work it started.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and reports.
    fn name(&self) -> &str;

    /// Recognise `image` under `configuration`.
    ///
    /// Missing engines map to [`LesewerkError::EngineUnavailable`], images the
    /// engine cannot read to [`LesewerkError::UnsupportedInput`].
    async fn recognize(
        &self,
        image: &DynamicImage,
        configuration: &OcrConfiguration,
    ) -> Result<EngineOutput>;
}

/// Executable name; `which` adds the platform extension.
const TESSERACT_BIN: &str = "tesseract";

/// Usual install locations of the Windows installer.
const WINDOWS_CANDIDATES: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// How to invoke Tesseract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractConfig {
    pub executable: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    /// OCR engine mode (`--oem`); 3 lets Tesseract pick.
    pub oem: u8,
    /// The child is killed once it runs this long.
    pub timeout: Duration,
}

impl TesseractConfig {
    /// Config for an explicit executable path with default settings.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            tessdata_dir: None,
            oem: 3,
            timeout: Duration::from_secs(120),
        }
    }

    /// Look for Tesseract on `PATH`, then in the usual Windows locations.
    pub fn discover() -> Option<Self> {
        find_tesseract().map(Self::with_executable)
    }

    /// Build from runner settings: the explicit path when given, discovery
    /// otherwise.
    pub fn from_settings(settings: &RunnerSettings) -> Result<Self> {
        let executable = match &settings.tesseract_path {
            Some(path) => path.clone(),
            None => find_tesseract().ok_or_else(|| {
                LesewerkError::EngineUnavailable(
                    "tesseract not found on PATH or in the usual install locations".into(),
                )
            })?,
        };
        let config = Self {
            executable,
            tessdata_dir: settings.tessdata_dir.clone(),
            oem: settings.oem,
            timeout: Duration::from_secs(settings.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the executable exists.
    pub fn validate(&self) -> Result<()> {
        if !self.executable.is_file() {
            return Err(LesewerkError::EngineUnavailable(format!(
                "tesseract executable not found at {}",
                self.executable.display()
            )));
        }
        if let Some(dir) = &self.tessdata_dir {
            if !dir.is_dir() {
                return Err(LesewerkError::EngineUnavailable(format!(
                    "tessdata directory not found at {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Search `PATH` for the executable, falling back to the Windows installer
/// locations.
fn find_tesseract() -> Option<PathBuf> {
    find_tesseract_in(std::env::var_os("PATH"))
}

fn find_tesseract_in(paths: Option<OsString>) -> Option<PathBuf> {
    if let Ok(found) = which::which_in(TESSERACT_BIN, paths, ".") {
        return Some(found);
    }
    if cfg!(windows) {
        return WINDOWS_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file());
    }
    None
}

/// Tesseract driven as a subprocess.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn command(&self, input: &Path, outbase: &Path, configuration: &OcrConfiguration) -> Command {
        let mut cmd = Command::new(&self.config.executable);
        cmd.arg(input)
            .arg(outbase)
            .arg("--oem")
            .arg(self.config.oem.to_string())
            .arg("--psm")
            .arg(configuration.psm.code().to_string())
            .arg("-l")
            .arg(&configuration.languages);
        if let Some(dir) = &self.config.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        // Both config files in one pass: outbase.txt and outbase.tsv.
        cmd.arg("txt").arg("tsv");
        cmd
    }

}

#[async_trait]
impl TextRecognizer for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip_all, fields(config = %configuration, width = image.width(), height = image.height()))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        configuration: &OcrConfiguration,
    ) -> Result<EngineOutput> {
        if image.width() == 0 || image.height() == 0 {
            return Err(LesewerkError::UnsupportedInput("image has no pixels".into()));
        }

        let workdir = tempfile::Builder::new().prefix("lesewerk-").tempdir()?;
        let input = workdir.path().join("variant.png");
        let outbase = workdir.path().join("result");

        // PNG encoding is CPU-bound; keep it off the async workers.
        let png = image.clone();
        let png_path = input.clone();
        tokio::task::spawn_blocking(move || png.save_with_format(&png_path, ImageFormat::Png))
            .await
            .map_err(|err| LesewerkError::OcrError(format!("PNG encode task failed: {err}")))?
            .map_err(|err| LesewerkError::UnsupportedInput(format!("PNG encode failed: {err}")))?;

        // Dropping the child (timeout here, or the caller giving up) kills it.
        let child = self
            .command(&input, &outbase, configuration)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    LesewerkError::EngineUnavailable(format!(
                        "cannot run {}: {}",
                        self.config.executable.display(),
                        err
                    ))
                }
                _ => LesewerkError::OcrError(format!("failed to start tesseract: {err}")),
            })?;

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Tesseract timed out, child killed");
                return Err(LesewerkError::Timeout(self.config.timeout));
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status, stderr.trim()));
        }

        let text = tokio::fs::read_to_string(outbase.with_extension("txt"))
            .await
            .map_err(|err| LesewerkError::OcrError(format!("missing text output: {err}")))?;
        let tsv = tokio::fs::read_to_string(outbase.with_extension("tsv"))
            .await
            .map_err(|err| LesewerkError::OcrError(format!("missing TSV output: {err}")))?;
        let words = parse_tsv(&tsv);

        debug!(chars = text.len(), words = words.len(), "Tesseract run complete");
        info!(words = words.len(), "OCR recognition complete");
        Ok(EngineOutput { text, words })
    }
}

/// Map a non-zero Tesseract exit to the error taxonomy.
fn classify_failure(status: ExitStatus, stderr: &str) -> LesewerkError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("failed loading language")
        || lower.contains("error opening data file")
        || lower.contains("traineddata")
    {
        LesewerkError::EngineUnavailable(format!("language data missing: {stderr}"))
    } else if lower.contains("pixread") || lower.contains("unsupported image") {
        LesewerkError::UnsupportedInput(stderr.to_string())
    } else {
        LesewerkError::OcrError(format!("tesseract exited with {status}: {stderr}"))
    }
}

/// Parse Tesseract TSV output into word boxes.
///
/// Only level-5 (word) rows with non-blank text are kept. Confidences below
/// zero mean "none" and become `None`.
pub fn parse_tsv(tsv: &str) -> Vec<WordBox> {
    let mut words = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 && row.starts_with("level") {
            continue;
        }
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].trim().parse::<u32>().ok() != Some(5) {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let field = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let confidence = cols[10]
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|conf| *conf >= 0.0);

        words.push(WordBox::new(
            text,
            BoxRect::new(field(6), field(7), field(8), field(9)),
            confidence,
        ));
    }

    words
}
