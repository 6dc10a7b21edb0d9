use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct AvatarStorage {
    uploads_dir: PathBuf,
}

impl AvatarStorage {
    pub fn new(uploads_dir: impl AsRef<Path>) -> Self {
        Self {
            uploads_dir: uploads_dir.as_ref().to_path_buf(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Writes the upload as `{millis}-{name}` and returns the public URL path.
    pub fn store(
        &self,
        original_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<String, InfraError> {
        let file_name = sanitize_file_name(original_name)?;
        if bytes.is_empty() {
            return Err(InfraError::Upload("avatar file is empty".to_string()));
        }

        fs::create_dir_all(&self.uploads_dir)?;
        let stored_name = format!("{}-{}", now.timestamp_millis(), file_name);
        fs::write(self.uploads_dir.join(&stored_name), bytes)?;
        Ok(format!("{UPLOADS_ROUTE}/{stored_name}"))
    }

    /// Resolves a stored file name, refusing anything that could leave the uploads dir.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let trimmed = file_name.trim();
        if trimmed.is_empty()
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed.contains("..")
        {
            return None;
        }
        let path = self.uploads_dir.join(trimmed);
        path.is_file().then_some(path)
    }
}

pub fn content_type_for(file_name: &str) -> &'static str {
    match extension_of(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
}

fn sanitize_file_name(original_name: &str) -> Result<String, InfraError> {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let Some(extension) = extension_of(base) else {
        return Err(InfraError::Upload(format!(
            "'{original_name}' has no file extension"
        )));
    };
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(InfraError::Upload(format!(
            "only .jpg, .jpeg and .png avatars are accepted, got .{extension}"
        )));
    }

    let sanitized = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "taskdeck-avatar-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-16T08:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn stores_allowed_images_with_timestamp_prefix() {
        let dir = TempDir::new();
        let storage = AvatarStorage::new(&dir.path);
        let url = storage
            .store("C:\\photos\\my face.PNG", b"\x89PNG", fixed_time())
            .expect("store avatar");
        let expected_name = format!("{}-my_face.PNG", fixed_time().timestamp_millis());
        assert_eq!(url, format!("/uploads/{expected_name}"));
        assert!(storage.resolve(&expected_name).is_some());
        assert_eq!(content_type_for(&expected_name), "image/png");
    }

    #[test]
    fn rejects_disallowed_extensions_and_empty_files() {
        let dir = TempDir::new();
        let storage = AvatarStorage::new(&dir.path);
        assert!(matches!(
            storage.store("avatar.gif", b"GIF89a", fixed_time()),
            Err(InfraError::Upload(_))
        ));
        assert!(matches!(
            storage.store("avatar", b"data", fixed_time()),
            Err(InfraError::Upload(_))
        ));
        assert!(matches!(
            storage.store("avatar.jpg", b"", fixed_time()),
            Err(InfraError::Upload(_))
        ));
    }

    #[test]
    fn resolve_refuses_path_traversal() {
        let dir = TempDir::new();
        let storage = AvatarStorage::new(&dir.path);
        assert!(storage.resolve("../secret.png").is_none());
        assert!(storage.resolve("nested/file.png").is_none());
        assert!(storage.resolve("missing.png").is_none());
    }
}
