// fetcher.rs -- Repository file retrieval with compression probing

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};

use crate::exception::FetchError;

/// Compression suffixes probed for index and translation files, in order.
/// The empty suffix matches an uncompressed file and is tried last.
pub const COMPRESSION_CANDIDATES: [&str; 4] = ["xz", "bz2", "gz", ""];

/// Placeholder in a repository-relative path where the compression
/// suffix (including its leading dot) is substituted.
pub const EXT_SLOT: &str = "{ext}";

/// Resolves repository-relative paths into local files.
///
/// A local root is read in place; an http(s) root is downloaded into the
/// scratch directory, where a present file of nonzero size is reused
/// without refetching.
pub struct Fetcher {
    root: String,
    tmp_dir: PathBuf,
}

impl Fetcher {
    pub fn new(root: &str, tmp_dir: &Path) -> Self {
        Fetcher {
            root: root.trim_end_matches('/').to_string(),
            tmp_dir: tmp_dir.to_path_buf(),
        }
    }

    fn is_remote(&self) -> bool {
        self.root.starts_with("http://") || self.root.starts_with("https://")
    }

    /// Fetch `relative`, substituting each compression candidate into its
    /// `{ext}` slot until one resolves. A path without a slot is tried as-is.
    pub fn fetch(&self, relative: &str) -> Result<PathBuf, FetchError> {
        let candidates: &[&str] = if relative.contains(EXT_SLOT) {
            &COMPRESSION_CANDIDATES
        } else {
            &[""]
        };

        for ext in candidates {
            let suffix = if ext.is_empty() {
                String::new()
            } else {
                format!(".{}", ext)
            };
            let rel = relative.replace(EXT_SLOT, &suffix);

            match self.fetch_one(&rel) {
                Ok(path) => return Ok(path),
                Err(e) => debug!("Candidate {} did not resolve: {}", rel, e),
            }
        }

        Err(FetchError::NotFound(relative.to_string()))
    }

    fn fetch_one(&self, relative: &str) -> Result<PathBuf, FetchError> {
        if !self.is_remote() {
            let path = Path::new(&self.root).join(relative);
            if file_nonempty(&path) {
                return Ok(path);
            }
            return Err(FetchError::NotFound(relative.to_string()));
        }

        let dest = self.tmp_dir.join(relative);
        if file_nonempty(&dest) {
            debug!("Using cached {}", dest.display());
            return Ok(dest);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = format!("{}/{}", self.root, relative);
        if self.try_download(&url, &dest)? {
            Ok(dest)
        } else {
            Err(FetchError::Download(url))
        }
    }

    fn try_download(&self, url: &str, dest: &Path) -> Result<bool, FetchError> {
        let temp_dest = dest.with_extension("part");
        let temp_str = temp_dest.to_string_lossy();

        let status = Command::new("wget")
            .args([
                "--quiet",
                "--tries=1",
                "--timeout=60",
                "--output-document",
                temp_str.as_ref(),
                url,
            ])
            .status();

        match status {
            Ok(s) if s.success() && file_nonempty(&temp_dest) => {
                fs::rename(&temp_dest, dest)?;
                Ok(true)
            }
            _ => {
                let _ = fs::remove_file(&temp_dest);
                warn!("Failed to download {}", url);
                Ok(false)
            }
        }
    }
}

fn file_nonempty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Read a fetched file to a string, decompressing by file extension.
pub fn read_compressed(path: &Path) -> Result<String, FetchError> {
    let file = File::open(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let mut content = String::new();
    match ext {
        "xz" => {
            xz2::read::XzDecoder::new(file).read_to_string(&mut content)?;
        }
        "bz2" => {
            bzip2::read::BzDecoder::new(file).read_to_string(&mut content)?;
        }
        "gz" => {
            flate2::read::GzDecoder::new(file).read_to_string(&mut content)?;
        }
        _ => {
            let mut file = file;
            file.read_to_string(&mut content)?;
        }
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_local_uncompressed_fetch() {
        let root = tempfile::TempDir::new().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let dir = root.path().join("dists/sid/main/binary-amd64");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Packages"), "Package: foo\n").unwrap();

        let fetcher = Fetcher::new(root.path().to_str().unwrap(), tmp.path());
        let path = fetcher
            .fetch("dists/sid/main/binary-amd64/Packages{ext}")
            .unwrap();
        assert!(path.ends_with("Packages"));
        assert_eq!(read_compressed(&path).unwrap(), "Package: foo\n");
    }

    #[test]
    fn test_probe_order_prefers_compressed() {
        let root = tempfile::TempDir::new().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let dir = root.path().join("dists/sid/main/binary-amd64");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Packages"), "plain\n").unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Package: gzipped\n").unwrap();
        fs::write(dir.join("Packages.gz"), encoder.finish().unwrap()).unwrap();

        let fetcher = Fetcher::new(root.path().to_str().unwrap(), tmp.path());
        let path = fetcher
            .fetch("dists/sid/main/binary-amd64/Packages{ext}")
            .unwrap();

        // gz ranks before the empty suffix in the probe order
        assert!(path.to_string_lossy().ends_with("Packages.gz"));
        assert_eq!(read_compressed(&path).unwrap(), "Package: gzipped\n");
    }

    #[test]
    fn test_not_found_when_nothing_resolves() {
        let root = tempfile::TempDir::new().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let fetcher = Fetcher::new(root.path().to_str().unwrap(), tmp.path());
        let result = fetcher.fetch("dists/sid/main/binary-amd64/Packages{ext}");
        assert!(matches!(result, Err(FetchError::NotFound(_))));
    }

    #[test]
    fn test_empty_file_does_not_resolve() {
        let root = tempfile::TempDir::new().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let dir = root.path().join("dists/sid");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("InRelease"), "").unwrap();

        let fetcher = Fetcher::new(root.path().to_str().unwrap(), tmp.path());
        assert!(fetcher.fetch("dists/sid/InRelease").is_err());
    }

    #[test]
    fn test_slotless_path_fetched_as_is() {
        let root = tempfile::TempDir::new().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let dir = root.path().join("dists/sid");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("InRelease"), "Origin: Debian\n").unwrap();

        let fetcher = Fetcher::new(root.path().to_str().unwrap(), tmp.path());
        let path = fetcher.fetch("dists/sid/InRelease").unwrap();
        assert_eq!(read_compressed(&path).unwrap(), "Origin: Debian\n");
    }
}
