//! Static file fallback.
//!
//! Requests that match no route but look like a file (`GET` with a `.` in the
//! path) are answered from the configured public root. Any failure to locate
//! or read the file is reported as 404.

use crate::logging::debug;
use crate::{Error, HttpStatus};
use std::path::{Component, Path, PathBuf};

/// File type classification used for content-type detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// .js, .mjs
    JavaScript,
    Stylesheet,
    /// .png, .jpg, .jpeg, .gif, .svg, .webp, .avif, .ico
    Image,
    /// .woff, .woff2, .ttf, .otf, .eot
    Font,
    Html,
    Json,
    Text,
    Video,
    Audio,
    Other,
}

impl FileType {
    /// Detect file type from path extension
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("js") | Some("mjs") => FileType::JavaScript,
            Some("css") => FileType::Stylesheet,
            Some("png") | Some("jpg") | Some("jpeg") | Some("gif") | Some("svg") | Some("webp")
            | Some("avif") | Some("ico") => FileType::Image,
            Some("woff") | Some("woff2") | Some("ttf") | Some("otf") | Some("eot") => FileType::Font,
            Some("html") | Some("htm") => FileType::Html,
            Some("json") | Some("map") => FileType::Json,
            Some("txt") | Some("md") | Some("csv") | Some("xml") => FileType::Text,
            Some("mp4") | Some("webm") | Some("ogv") => FileType::Video,
            Some("mp3") | Some("wav") | Some("ogg") | Some("m4a") => FileType::Audio,
            _ => FileType::Other,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// MIME type for a file path; unknown extensions are `application/octet-stream`
pub fn mime_type(path: &Path) -> &'static str {
    let ext = extension(path);
    match (FileType::from_path(path), ext.as_deref()) {
        (FileType::JavaScript, _) => "text/javascript",
        (FileType::Stylesheet, _) => "text/css",
        (FileType::Image, Some("png")) => "image/png",
        (FileType::Image, Some("gif")) => "image/gif",
        (FileType::Image, Some("svg")) => "image/svg+xml",
        (FileType::Image, Some("webp")) => "image/webp",
        (FileType::Image, Some("avif")) => "image/avif",
        (FileType::Image, Some("ico")) => "image/x-icon",
        (FileType::Image, _) => "image/jpeg",
        (FileType::Font, Some("woff")) => "font/woff",
        (FileType::Font, Some("woff2")) => "font/woff2",
        (FileType::Font, Some("otf")) => "font/otf",
        (FileType::Font, Some("eot")) => "application/vnd.ms-fontobject",
        (FileType::Font, _) => "font/ttf",
        (FileType::Html, _) => "text/html",
        (FileType::Json, _) => "application/json",
        (FileType::Text, Some("csv")) => "text/csv",
        (FileType::Text, Some("xml")) => "application/xml",
        (FileType::Text, Some("md")) => "text/markdown",
        (FileType::Text, _) => "text/plain",
        (FileType::Video, Some("webm")) => "video/webm",
        (FileType::Video, Some("ogv")) => "video/ogg",
        (FileType::Video, _) => "video/mp4",
        (FileType::Audio, Some("wav")) => "audio/wav",
        (FileType::Audio, Some("ogg")) => "audio/ogg",
        (FileType::Audio, Some("m4a")) => "audio/mp4",
        (FileType::Audio, _) => "audio/mpeg",
        (FileType::Other, _) => "application/octet-stream",
    }
}

/// A file read from the public root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub len: u64,
}

/// Resolve `request_path` under `root`, refusing anything that escapes it.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

/// Load a file for the static fallback.
pub async fn load(root: &Path, request_path: &str) -> Result<StaticFile, Error> {
    let not_found = || Error::http(HttpStatus::NotFound);

    let path = resolve_path(root, request_path).ok_or_else(|| {
        debug!(path = request_path, "Rejected static file path");
        not_found()
    })?;

    let metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let bytes = tokio::fs::read(&path).await.map_err(|_| not_found())?;
    debug!(path = %path.display(), size = metadata.len(), "Serving static file");

    Ok(StaticFile {
        content_type: mime_type(&path),
        len: metadata.len(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_path(Path::new("app.JS")), FileType::JavaScript);
        assert_eq!(FileType::from_path(Path::new("logo.svg")), FileType::Image);
        assert_eq!(FileType::from_path(Path::new("data.bin")), FileType::Other);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type(Path::new("style.css")), "text/css");
        assert_eq!(mime_type(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("font.woff2")), "font/woff2");
        assert_eq!(mime_type(Path::new("archive.tar.gz")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_path_rejects_traversal() {
        let root = Path::new("public");
        assert_eq!(
            resolve_path(root, "/css/app.css"),
            Some(PathBuf::from("public/css/app.css"))
        );
        assert_eq!(resolve_path(root, "/../secret.txt"), None);
        assert_eq!(resolve_path(root, "/a/../../b.txt"), None);
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();

        let file = load(dir.path(), "/hello.txt").await.unwrap();
        assert_eq!(file.bytes, b"hello".to_vec());
        assert_eq!(file.len, 5);
        assert_eq!(file.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_missing_file_and_directory_are_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("assets.d")).unwrap();

        let err = load(dir.path(), "/missing.css").await.unwrap_err();
        assert_eq!(err.http_status(), HttpStatus::NotFound);
        assert!(err.is_http());

        let err = load(dir.path(), "/assets.d").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
