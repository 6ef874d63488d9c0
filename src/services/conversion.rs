use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::settings::AppSettings;

const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "pps", "ppsx", "odp"];

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No files to convert")]
    NoInputs,

    #[error("{} does not exist or is not a file", .0.display())]
    InputNotFound(PathBuf),

    #[error("{} is not a presentation", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Converter exited with {}: {output}", exit_label(.code))]
    ProcessFailed { code: Option<i32>, output: String },

    #[error("Converter finished but {} was not created: {output}", .expected.display())]
    MissingOutput { expected: PathBuf, output: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

pub fn is_presentation(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            PRESENTATION_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Turns one source document into a PDF next to it.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path) -> Result<PathBuf, ConversionError>;
}

/// Runs an external converter program: `<program> <args...> <input>`, from the
/// input's directory, with extra directories prepended to `PATH`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
    search_paths: Vec<PathBuf>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            search_paths,
        }
    }

    fn search_path(&self) -> OsString {
        let existing = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .search_paths
            .iter()
            .cloned()
            .chain(std::env::split_paths(&existing));
        std::env::join_paths(dirs).unwrap_or(existing)
    }
}

impl From<&AppSettings> for CommandConverter {
    fn from(settings: &AppSettings) -> Self {
        Self::new(
            settings.converter_program.clone(),
            settings.converter_args.clone(),
            settings
                .converter_search_paths
                .iter()
                .map(PathBuf::from)
                .collect(),
        )
    }
}

#[async_trait]
impl Converter for CommandConverter {
    async fn convert(&self, input: &Path) -> Result<PathBuf, ConversionError> {
        let source = match tokio::fs::canonicalize(input).await {
            Ok(path) if path.is_file() => path,
            _ => return Err(ConversionError::InputNotFound(input.to_path_buf())),
        };
        if !is_presentation(&source) {
            return Err(ConversionError::UnsupportedInput(input.to_path_buf()));
        }

        let expected = source.with_extension("pdf");
        let workdir = source.parent().unwrap_or_else(|| Path::new("."));

        tracing::debug!("Running {} on {}", self.program, source.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&source)
            .current_dir(workdir)
            .env("PATH", self.search_path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ConversionError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));
        let merged = merged.trim().to_string();

        if !output.status.success() {
            return Err(ConversionError::ProcessFailed {
                code: output.status.code(),
                output: merged,
            });
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(ConversionError::MissingOutput {
                expected,
                output: merged,
            });
        }

        Ok(expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ConversionError)>,
}

/// Convert `inputs` one at a time. A failing item is recorded and the batch
/// moves on; `on_progress` runs after every item either way.
pub async fn convert_batch<F>(
    converter: &dyn Converter,
    inputs: &[PathBuf],
    mut on_progress: F,
) -> Result<BatchReport, ConversionError>
where
    F: FnMut(Progress),
{
    if inputs.is_empty() {
        return Err(ConversionError::NoInputs);
    }

    let total = inputs.len();
    let mut report = BatchReport::default();

    for (index, input) in inputs.iter().enumerate() {
        match converter.convert(input).await {
            Ok(output) => {
                tracing::info!("Converted {} -> {}", input.display(), output.display());
                report.converted.push(output);
            }
            Err(e) => {
                tracing::warn!("Failed to convert {}: {}", input.display(), e);
                report.failed.push((input.clone(), e));
            }
        }

        on_progress(Progress {
            completed: index + 1,
            total,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeConverter {
        fail_index: usize,
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Converter for FakeConverter {
        async fn convert(&self, input: &Path) -> Result<PathBuf, ConversionError> {
            let index = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(input.to_path_buf());
                seen.len() - 1
            };
            if index == self.fail_index {
                return Err(ConversionError::ProcessFailed {
                    code: Some(1),
                    output: "Error: source file could not be loaded".to_string(),
                });
            }
            Ok(input.with_extension("pdf"))
        }
    }

    fn sh(script: &str) -> CommandConverter {
        CommandConverter::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            Vec::new(),
        )
    }

    fn deck(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"slides").unwrap();
        path
    }

    #[test]
    fn test_is_presentation() {
        assert!(is_presentation(Path::new("a/b/Quarterly.PPTX")));
        assert!(is_presentation(Path::new("talk.odp")));
        assert!(!is_presentation(Path::new("notes.pdf")));
        assert!(!is_presentation(Path::new("README")));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_reports_progress() {
        let converter = FakeConverter {
            fail_index: 2,
            seen: Mutex::new(Vec::new()),
        };
        let inputs: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("deck{}.pptx", i))).collect();
        let mut progress = Vec::new();

        let report = convert_batch(&converter, &inputs, |p| progress.push(p.fraction()))
            .await
            .unwrap();

        assert_eq!(converter.seen.lock().unwrap().as_slice(), inputs.as_slice());
        assert_eq!(report.converted.len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, inputs[2]);
        assert!(!report.converted.contains(&inputs[2].with_extension("pdf")));
        assert_eq!(progress, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_input() {
        let converter = FakeConverter {
            fail_index: usize::MAX,
            seen: Mutex::new(Vec::new()),
        };
        let result = convert_batch(&converter, &[], |_| {}).await;
        assert!(matches!(result, Err(ConversionError::NoInputs)));
    }

    #[tokio::test]
    async fn test_missing_input_is_not_spawned() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let converter = sh(&format!("touch {}", marker.display()));

        let err = converter
            .convert(&dir.path().join("absent.pptx"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::InputNotFound(_)));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_non_presentation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "already.pdf");

        let err = sh("exit 0").convert(&input).await.unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedInput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_conversion_returns_sibling_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "Roadmap.pptx");
        let converter = sh(r#"printf '%%PDF' > "${1%.*}.pdf""#);

        let output = converter.convert(&input).await.unwrap();

        assert_eq!(output.file_name().unwrap(), "Roadmap.pdf");
        assert_eq!(output.parent(), input.canonicalize().unwrap().parent());
        assert!(output.exists());
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "Broken.pptx");
        let converter = sh("echo converting; echo 'source file could not be loaded' >&2; exit 3");

        let err = converter.convert(&input).await.unwrap_err();

        match err {
            ConversionError::ProcessFailed { code, output } => {
                assert_eq!(code, Some(3));
                assert!(output.contains("converting"));
                assert!(output.contains("source file could not be loaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_without_output_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "Ghost.pptx");

        let err = sh("echo done").convert(&input).await.unwrap_err();

        match err {
            ConversionError::MissingOutput { expected, output } => {
                assert_eq!(expected.file_name().unwrap(), "Ghost.pdf");
                assert_eq!(output, "done");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_search_paths_are_prepended() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let tool = bin.path().join("fake-office");
        std::fs::write(&tool, "#!/bin/sh\nprintf '%%PDF' > \"${1%.*}.pdf\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "Pitch.ppt");
        let converter =
            CommandConverter::new("fake-office", Vec::new(), vec![bin.path().to_path_buf()]);

        let output = converter.convert(&input).await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_unknown_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = deck(&dir, "Deck.pptx");
        let converter = CommandConverter::new("definitely-not-a-converter-xyz", Vec::new(), Vec::new());

        let err = converter.convert(&input).await.unwrap_err();
        assert!(matches!(err, ConversionError::Spawn { .. }));
    }

    #[test]
    fn test_progress_fraction() {
        let p = Progress {
            completed: 1,
            total: 4,
        };
        assert_eq!(p.fraction(), 0.25);
    }
}
