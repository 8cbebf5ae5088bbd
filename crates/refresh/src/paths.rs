//! Path normalization for reported files.
//!
//! Paths are compared lexically. Nothing here touches the filesystem, so
//! deleted files and symlinks are reported by the path they were given as.

use std::path::{Component, Path};

/// Path string sent to the reload server.
///
/// With a base path the result is root-relative (`/css/a.css`), using `/`
/// separators on every platform. Without one, or with an empty one, the
/// input is reported as-is.
pub(crate) fn report_path(base_path: Option<&Path>, path: &Path) -> String {
    match base_path {
        Some(base) if !base.as_os_str().is_empty() => format!("/{}", relative_to(base, path)),
        _ => path.to_string_lossy().into_owned(),
    }
}

/// Last segment of a reported path (empty for `/`).
pub(crate) fn file_name(reported: &str) -> String {
    Path::new(reported)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `path` relative to `base`, joined with `/`.
///
/// Relative inputs are resolved against the current directory first.
/// Paths outside `base` climb out with `..` segments.
fn relative_to(base: &Path, path: &Path) -> String {
    let base = absolute_segments(base);
    let path = absolute_segments(path);

    let common = base.iter().zip(&path).take_while(|(a, b)| a == b).count();

    let mut segments: Vec<&str> = vec![".."; base.len() - common];
    segments.extend(path[common..].iter().map(String::as_str));
    segments.join("/")
}

/// Normalized segments of an absolute form of `path`.
fn absolute_segments(path: &Path) -> Vec<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut segments = Vec::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => {
                segments.push(prefix.as_os_str().to_string_lossy().into_owned());
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                segments.pop();
            }
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
        }
    }
    segments
}
