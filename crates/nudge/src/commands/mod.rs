//! Command implementations

pub mod bump;

pub mod get;

pub mod info;

pub mod set;

use camino::{Utf8Path, Utf8PathBuf};

/// Resolve a user-supplied path against the working directory.
///
/// Shared by the commands that take a manifest path argument.
pub fn resolve_path(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_cwd() {
        let cwd = Utf8Path::new("/work");
        assert_eq!(
            resolve_path(cwd, Utf8Path::new("app/package.json")),
            Utf8PathBuf::from("/work/app/package.json")
        );
        assert_eq!(
            resolve_path(cwd, Utf8Path::new("/etc/pubspec.yaml")),
            Utf8PathBuf::from("/etc/pubspec.yaml")
        );
    }
}
