//! Isolated module loading.
//!
//! # Responsibility
//! - Turn one candidate path into a tagged `LoadOutcome`.
//! - Keep every failure local to the path that caused it.
//!
//! # Invariants
//! - `ModuleLoader::load` never panics and never returns an error upward.
//! - Source formats are activated exactly once per loader, before the first
//!   load; later activation calls are no-ops.

use crate::extension::manifest::{ExtensionManifest, ManifestValidationError};
use crate::extension::module::ExtensionModule;
use crate::logging::sanitize_message;
use log::debug;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

/// Result of one load attempt.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ExtensionModule),
    Failed { path: PathBuf, cause: ModuleLoadError },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Pluggable loading strategy used by the registry.
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> LoadOutcome;
}

/// One on-disk document encoding for extension modules.
pub trait ModuleFormat: Send + Sync {
    /// Short format id used in diagnostics.
    fn name(&self) -> &'static str;
    /// Lowercase file extensions handled by this format.
    fn extensions(&self) -> &'static [&'static str];
    /// Parses document text into a manifest.
    fn parse(&self, source: &str) -> Result<ExtensionManifest, String>;
}

/// Machine-generated documents, always available.
#[derive(Debug, Default)]
pub struct JsonFormat;

impl ModuleFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn parse(&self, source: &str) -> Result<ExtensionManifest, String> {
        serde_json::from_str(source).map_err(|err| err.to_string())
    }
}

/// Hand-authored source documents, enabled by loader activation.
#[derive(Debug, Default)]
pub struct TomlFormat;

impl ModuleFormat for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn parse(&self, source: &str) -> Result<ExtensionManifest, String> {
        toml::from_str(source).map_err(|err| err.to_string())
    }
}

/// Default loader reading extension documents from disk.
pub struct FileModuleLoader {
    base_dir: PathBuf,
    prebuilt: Vec<Box<dyn ModuleFormat>>,
    source: OnceCell<Vec<Box<dyn ModuleFormat>>>,
}

impl FileModuleLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            prebuilt: vec![Box::new(JsonFormat)],
            source: OnceCell::new(),
        }
    }

    /// Adds one more always-available format; earlier formats win on clash.
    pub fn with_format(mut self, format: Box<dyn ModuleFormat>) -> Self {
        self.prebuilt.push(format);
        self
    }

    /// Enables source-form documents. Idempotent.
    pub fn activate(&self) {
        self.source.get_or_init(|| {
            debug!("event=loader_activate module=loader status=ok formats=toml");
            let formats: Vec<Box<dyn ModuleFormat>> = vec![Box::new(TomlFormat)];
            formats
        });
    }

    pub fn is_activated(&self) -> bool {
        self.source.get().is_some()
    }

    fn format_for(&self, path: &Path) -> Result<&dyn ModuleFormat, ModuleLoadError> {
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        self.prebuilt
            .iter()
            .chain(self.source.get().into_iter().flatten())
            .find(|format| format.extensions().contains(&extension.as_str()))
            .map(|format| format.as_ref())
            .ok_or(ModuleLoadError::UnsupportedFormat(extension))
    }

    fn try_load(&self, path: &Path) -> Result<ExtensionModule, ModuleLoadError> {
        let format = self.format_for(path)?;
        let source = std::fs::read_to_string(path).map_err(ModuleLoadError::Io)?;
        let manifest = format
            .parse(&source)
            .map_err(|message| ModuleLoadError::Parse {
                format: format.name(),
                message,
            })?;
        manifest.into_module().map_err(ModuleLoadError::Invalid)
    }

    fn label(&self, path: &Path) -> String {
        display_path(path, &self.base_dir)
    }
}

impl ModuleLoader for FileModuleLoader {
    fn load(&self, path: &Path) -> LoadOutcome {
        self.activate();
        let label = self.label(path);
        debug!("event=module_load module=loader status=start path={label}");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.try_load(path)))
            .unwrap_or_else(|payload| Err(ModuleLoadError::Panicked(panic_summary(&payload))));

        match result {
            Ok(module) => {
                debug!("event=module_load module=loader status=ok path={label}");
                LoadOutcome::Loaded(module)
            }
            Err(cause) => {
                debug!(
                    "event=module_load module=loader status=error path={label} error={cause}"
                );
                LoadOutcome::Failed {
                    path: path.to_path_buf(),
                    cause,
                }
            }
        }
    }
}

/// Renders `path` relative to `base_dir` as `./...` when possible.
pub fn display_path(path: &Path, base_dir: &Path) -> String {
    match path.strip_prefix(base_dir) {
        Ok(relative) => format!("./{}", relative.display()),
        Err(_) => path.display().to_string(),
    }
}

fn panic_summary(payload: &Box<dyn std::any::Any + Send>) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    sanitize_message(&message, MAX_PANIC_PAYLOAD_CHARS)
}

/// Why one candidate file did not become a module.
#[derive(Debug)]
pub enum ModuleLoadError {
    Io(std::io::Error),
    UnsupportedFormat(String),
    Parse {
        format: &'static str,
        message: String,
    },
    Invalid(ManifestValidationError),
    Panicked(String),
}

impl Display for ModuleLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read extension file: {err}"),
            Self::UnsupportedFormat(extension) if extension.is_empty() => {
                write!(f, "file has no extension; expected a known document format")
            }
            Self::UnsupportedFormat(extension) => {
                write!(f, "unsupported extension document format: .{extension}")
            }
            Self::Parse { format, message } => {
                write!(f, "cannot parse {format} extension document: {message}")
            }
            Self::Invalid(err) => write!(f, "invalid extension module: {err}"),
            Self::Panicked(payload) => write!(f, "extension load panicked: {payload}"),
        }
    }
}

impl Error for ModuleLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        display_path, FileModuleLoader, LoadOutcome, ModuleFormat, ModuleLoadError, ModuleLoader,
    };
    use crate::extension::manifest::ExtensionManifest;
    use std::fs;
    use std::path::Path;

    const GREETING_TOML: &str = r#"
schema = "type Query { greeting: String }"

[Query.greeting]
kind = "constant"
value = "hi"
"#;

    const GREETING_JSON: &str = r#"{
  "schema": "type Query { greeting: String }",
  "Query": { "greeting": { "kind": "constant", "value": "hi" } }
}"#;

    #[test]
    fn activation_happens_once_before_first_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("greeting.toml");
        fs::write(&path, GREETING_TOML).expect("write fixture");

        let loader = FileModuleLoader::new(dir.path());
        assert!(!loader.is_activated());

        assert!(loader.load(&path).is_loaded());
        assert!(loader.is_activated());
        loader.activate();
        assert!(loader.load(&path).is_loaded());
    }

    #[test]
    fn loads_json_and_toml_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let toml_path = dir.path().join("a.toml");
        let json_path = dir.path().join("b.json");
        fs::write(&toml_path, GREETING_TOML).expect("write toml");
        fs::write(&json_path, GREETING_JSON).expect("write json");

        let loader = FileModuleLoader::new(dir.path());
        assert!(loader.load(&toml_path).is_loaded());
        assert!(loader.load(&json_path).is_loaded());
    }

    #[test]
    fn missing_file_becomes_failed_outcome() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone.toml");
        let loader = FileModuleLoader::new(dir.path());

        match loader.load(&path) {
            LoadOutcome::Failed { path: failed, cause } => {
                assert_eq!(failed, path);
                assert!(matches!(cause, ModuleLoadError::Io(_)));
            }
            LoadOutcome::Loaded(_) => panic!("missing file must not load"),
        }
    }

    #[test]
    fn unsupported_and_malformed_files_fail_without_panicking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let readme = dir.path().join("README.md");
        let broken = dir.path().join("broken.toml");
        let no_handlers = dir.path().join("empty.json");
        fs::write(&readme, "# docs").expect("write readme");
        fs::write(&broken, "schema = [").expect("write broken");
        fs::write(&no_handlers, r#"{ "schema": "type Query { a: Int }" }"#).expect("write");

        let loader = FileModuleLoader::new(dir.path());
        let causes: Vec<ModuleLoadError> = [readme, broken, no_handlers]
            .iter()
            .map(|path| match loader.load(path) {
                LoadOutcome::Failed { cause, .. } => cause,
                LoadOutcome::Loaded(_) => panic!("{} must not load", path.display()),
            })
            .collect();

        assert!(matches!(causes[0], ModuleLoadError::UnsupportedFormat(ref ext) if ext == "md"));
        assert!(matches!(causes[1], ModuleLoadError::Parse { format: "toml", .. }));
        assert!(matches!(causes[2], ModuleLoadError::Invalid(_)));
    }

    struct ExplodingFormat;

    impl ModuleFormat for ExplodingFormat {
        fn name(&self) -> &'static str {
            "boom"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["boom"]
        }

        fn parse(&self, _source: &str) -> Result<ExtensionManifest, String> {
            panic!("format exploded\nwhile parsing");
        }
    }

    #[test]
    fn panics_during_load_are_caught() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.boom");
        fs::write(&path, "").expect("write fixture");

        let loader = FileModuleLoader::new(dir.path()).with_format(Box::new(ExplodingFormat));
        match loader.load(&path) {
            LoadOutcome::Failed {
                cause: ModuleLoadError::Panicked(payload),
                ..
            } => assert_eq!(payload, "format exploded while parsing"),
            other => panic!("expected a caught panic, got {other:?}"),
        }
    }

    #[test]
    fn display_path_is_relative_to_base_dir() {
        assert_eq!(
            display_path(Path::new("/srv/app/demos/books.toml"), Path::new("/srv/app")),
            "./demos/books.toml"
        );
        assert_eq!(
            display_path(Path::new("/elsewhere/books.toml"), Path::new("/srv/app")),
            "/elsewhere/books.toml"
        );
    }
}
