//! The single place that maps file names to handlers.

use camino::Utf8Path;
use tracing::{debug, instrument};

use super::{FileFormat, FileHandler};
use crate::error::{HandlerError, HandlerResult};

/// Read `path` from disk and wrap it in the handler for its extension.
///
/// A missing or unreadable file is [`HandlerError::Io`]; an extension
/// outside `.json`, `.yaml`, `.yml` and `.podspec` is
/// [`HandlerError::UnsupportedFormat`].
#[instrument]
pub fn from_path(path: &Utf8Path) -> HandlerResult<FileHandler> {
    let content = std::fs::read_to_string(path).map_err(|source| HandlerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(bytes = content.len(), "read file");
    from_content(path.as_str(), content)
}

/// Wrap text that did not come from the local disk, such as a file fetched
/// from another branch. `name` is only used to pick the format.
pub fn from_content(name: &str, content: String) -> HandlerResult<FileHandler> {
    let format = FileFormat::from_name(name).ok_or_else(|| HandlerError::UnsupportedFormat {
        name: name.to_string(),
    })?;
    FileHandler::new(format, content)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(dir.path().join(name)).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn dispatches_on_extension() {
        let json = from_content("package.json", "{}".into()).unwrap();
        assert_eq!(json.format(), FileFormat::Json);

        let yaml = from_content("pubspec.yml", "name: x\n".into()).unwrap();
        assert_eq!(yaml.format(), FileFormat::Yaml);

        let pod = from_content("X.podspec", "Pod::Spec.new do |s|\nend\n".into()).unwrap();
        assert_eq!(pod.format(), FileFormat::Podspec);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = from_content("Cargo.toml", String::new()).unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedFormat { ref name } if name == "Cargo.toml"));
    }

    #[test]
    fn podspec_without_header_is_rejected() {
        let err = from_content("X.podspec", "s.version = '1'\n".into()).unwrap_err();
        assert!(matches!(err, HandlerError::NotFound { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("nope.json")).unwrap();
        let err = from_path(&path).unwrap_err();
        assert!(matches!(err, HandlerError::Io { .. }));
    }

    #[test]
    fn reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.json", r#"{ "version": "0.4.2" }"#);
        let handler = from_path(&path).unwrap();
        assert_eq!(handler.get("version").unwrap(), "0.4.2");
    }
}
