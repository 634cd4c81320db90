use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

const MAX_NAME_ATTEMPTS: u32 = 1000;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// An image received with a form submission, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Reduce a client-supplied file name to a safe basename. Returns an empty
/// string when nothing usable is left.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let spaced = WHITESPACE.replace_all(base.trim(), "_");
    let cleaned = UNSAFE_CHARS.replace_all(&spaced, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

pub fn content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn with_suffix(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", name, n),
    }
}

pub struct UploadService {
    root: PathBuf,
}

impl UploadService {
    /// Creates the upload root if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the image and return its file name. A file with a disallowed
    /// extension, or a name that sanitizes to nothing, is dropped and `None`
    /// is returned.
    pub async fn save(&self, upload: &ImageUpload) -> AppResult<Option<String>> {
        let safe = sanitize_file_name(&upload.file_name);
        if safe.is_empty() || !has_allowed_extension(&safe) {
            log::warn!("Ignoring upload with unsupported name '{}'", upload.file_name);
            return Ok(None);
        }

        let base = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), safe);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                with_suffix(&base, attempt)
            };
            let path = self.root.join(&name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = file.write_all(&upload.bytes).await {
                drop(file);
                self.discard(&name).await;
                return Err(e.into());
            }
            file.flush().await?;

            log::info!("Stored upload {} ({} bytes)", name, upload.bytes.len());
            return Ok(Some(name));
        }

        Err(AppError::Storage(format!(
            "No free upload name for {} after {} attempts",
            base, MAX_NAME_ATTEMPTS
        )))
    }

    /// Read back a stored file. Names that are not plain stored file names
    /// are treated as missing.
    pub async fn load(&self, name: &str) -> AppResult<Option<Vec<u8>>> {
        if sanitize_file_name(name) != name || !has_allowed_extension(name) {
            return Ok(None);
        }
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a stored file.
    pub async fn discard(&self, name: &str) {
        if name.contains('/') || name.contains('\\') {
            log::warn!("Refusing to remove upload with path separators: {}", name);
            return;
        }
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => log::info!("Removed upload {}", name),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::error!("Failed to remove upload {}: {}", name, e),
        }
    }
}
