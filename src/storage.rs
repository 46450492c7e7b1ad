use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// 1. ImageStore Contract
/// ImageStore
///
/// Defines the abstract contract for persisting uploaded image bytes. This
/// trait allows us to swap the concrete implementation, from the local-disk
/// store (LocalImageStore) in production to the in-memory Mock
/// (MockImageStore) during testing, without affecting the calling handlers.
///
/// Metadata rows are the repository's concern; this layer only owns the bytes
/// and the public URL they end up at.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Ensures the backing directory exists. Called once at startup in the
    /// `Env::Local` setup; a no-op when the directory is already provisioned.
    async fn ensure_image_dir(&self) -> std::io::Result<()>;

    /// Writes the bytes under `<file_name>.<extension>` and returns the public
    /// URL the file is served at.
    async fn save(
        &self,
        file_name: &str,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<String>;
}

/// ImageStoreState
///
/// The concrete type used to share the image store across the application state.
pub type ImageStoreState = Arc<dyn ImageStore>;

/// sanitize_file_name
///
/// Prevents path traversal by stripping directory separators and dot segments
/// from a user-provided file name before it touches the filesystem.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '/' | '\\'))
        .collect::<String>()
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

// 2. The Real Implementation (local disk)
/// LocalImageStore
///
/// Writes uploads to a directory on local disk. The directory is served
/// statically at `/images`, so the returned URL is
/// `<public_base_url>/images/<file_name>.<ext>`.
#[derive(Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(image_dir: &str, public_base_url: &str) -> Self {
        Self {
            root: PathBuf::from(image_dir),
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn ensure_image_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn save(
        &self,
        file_name: &str,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let safe_name = sanitize_file_name(file_name);
        let full_name = format!("{}{}", safe_name, extension);
        let path = self.root.join(&full_name);

        tokio::fs::write(&path, bytes).await?;

        Ok(format!("{}/images/{}", self.base_url, full_name))
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockImageStore
///
/// A mock implementation of `ImageStore` used exclusively for testing. Keeps
/// the saved names in memory so tests can assert on them, and can simulate
/// filesystem failures without touching a disk.
#[derive(Default)]
pub struct MockImageStore {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    saved: Mutex<Vec<String>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn saved_files(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn ensure_image_dir(&self) -> std::io::Result<()> {
        Ok(())
    }

    async fn save(
        &self,
        file_name: &str,
        extension: &str,
        _bytes: &[u8],
    ) -> std::io::Result<String> {
        if self.should_fail {
            return Err(std::io::Error::other("mock store failure requested"));
        }

        let full_name = format!("{}{}", sanitize_file_name(file_name), extension);
        self.saved.lock().unwrap().push(full_name.clone());

        Ok(format!("http://localhost:3000/images/{}", full_name))
    }
}
