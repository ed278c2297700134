use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    Missing(PathBuf),
    #[error("model {0} is not cached and has no download URL; pass its path explicitly")]
    NotDownloadable(&'static str),
    #[error("could not create model cache {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not fetch {url}: {source}")]
    Fetch {
        url: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not save model to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no user cache directory on this platform")]
    NoCacheDir,
}

/// Called as `(bytes_so_far, total_bytes)` while a model downloads.
/// `total_bytes` is 0 when the server sends no length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// A model file known by name, optionally downloadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSource {
    pub file_name: &'static str,
    pub url: Option<&'static str>,
}

/// Finds model files for the capabilities, fetching missing ones once.
pub struct ModelResolver {
    cache_dir: PathBuf,
}

impl ModelResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Resolver over `<cache dir>/MoodLens/models`. On macOS the data
    /// directory is used, matching where apps keep large assets there.
    pub fn user_cache() -> Result<Self, ModelResolveError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();
        #[cfg(not(target_os = "macos"))]
        let base = dirs::cache_dir();

        base.map(|d| Self::new(d.join("MoodLens").join("models")))
            .ok_or(ModelResolveError::NoCacheDir)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// An explicit path must exist and is used as is. Otherwise the cached
    /// copy is used, downloading it first when `source` has a URL.
    pub fn resolve(
        &self,
        source: &ModelSource,
        explicit: Option<&Path>,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = explicit {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(ModelResolveError::Missing(path.to_path_buf()))
            };
        }

        let cached = self.cache_dir.join(source.file_name);
        if cached.is_file() {
            return Ok(cached);
        }

        let url = source
            .url
            .ok_or(ModelResolveError::NotDownloadable(source.file_name))?;
        fs::create_dir_all(&self.cache_dir).map_err(|e| ModelResolveError::CacheDir {
            path: self.cache_dir.clone(),
            source: e,
        })?;
        log::info!("Downloading {} from {url}", source.file_name);
        fetch(url, &cached, progress)?;
        Ok(cached)
    }
}

/// Downloads into `<dest>.part` and renames on success, so `dest` only
/// ever holds a complete file.
fn fetch(
    url: &'static str,
    dest: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = fetch_to(url, &part, progress)
        .and_then(|()| fs::rename(&part, dest).map_err(|e| save_error(dest, e)));
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn fetch_to(
    url: &'static str,
    part: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Fetch { url, source: e })?;

    let total = response.content_length().unwrap_or(0);
    let mut reader = ProgressReader {
        inner: response,
        read: 0,
        total,
        progress,
    };
    let mut file = fs::File::create(part).map_err(|e| save_error(part, e))?;
    io::copy(&mut reader, &mut file).map_err(|e| save_error(part, e))?;
    file.sync_all().map_err(|e| save_error(part, e))
}

fn save_error(path: &Path, source: io::Error) -> ModelResolveError {
    ModelResolveError::Save {
        path: path.to_path_buf(),
        source,
    }
}

struct ProgressReader<R> {
    inner: R,
    read: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            if let Some(cb) = &self.progress {
                cb(self.read, self.total);
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const LOCAL_ONLY: ModelSource = ModelSource {
        file_name: "model.onnx",
        url: None,
    };

    #[test]
    fn test_explicit_path_wins_over_cache() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("custom.onnx");
        fs::write(&model, b"model").unwrap();
        fs::write(tmp.path().join("model.onnx"), b"cached").unwrap();

        let resolved = ModelResolver::new(tmp.path())
            .resolve(&LOCAL_ONLY, Some(&model), None)
            .unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_explicit_path_missing_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.onnx");

        let err = ModelResolver::new(tmp.path())
            .resolve(&LOCAL_ONLY, Some(&missing), None)
            .unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == missing));
    }

    #[test]
    fn test_cached_file_is_found() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("model.onnx");
        fs::write(&cached, b"cached").unwrap();

        let resolved = ModelResolver::new(tmp.path())
            .resolve(&LOCAL_ONLY, None, None)
            .unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_uncached_without_url_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = ModelResolver::new(tmp.path())
            .resolve(&LOCAL_ONLY, None, None)
            .unwrap_err();
        assert!(matches!(err, ModelResolveError::NotDownloadable("model.onnx")));
    }

    #[test]
    fn test_user_cache_is_under_app_dir() {
        let resolver = ModelResolver::user_cache().unwrap();
        assert!(resolver.cache_dir().to_string_lossy().contains("MoodLens"));
        assert!(resolver.cache_dir().ends_with("models"));
    }

    #[test]
    fn test_failed_fetch_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");

        let result = fetch("http://invalid.nonexistent.example.com/model", &dest, None);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_progress_reader_reports_running_total() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_cb = seen.clone();
        let mut reader = ProgressReader {
            inner: &[7u8; 10][..],
            read: 0,
            total: 10,
            progress: Some(Box::new(move |done, total| {
                assert_eq!(total, 10);
                seen_cb.store(done, Ordering::SeqCst);
            })),
        };

        let mut out = Vec::new();
        io::copy(&mut reader, &mut out).unwrap();

        assert_eq!(out.len(), 10);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }
}
