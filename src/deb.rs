// deb.rs -- Reading desktop entries out of .deb package payloads
//
// A .deb is an ar archive containing control.tar.* and data.tar.*; the
// desktop entries live in the data member under usr/share/applications/.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::warn;

use crate::exception::GeneratorError;

/// Scratch directory removed on all exit paths.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(base: &Path, name: &str) -> Result<Self, GeneratorError> {
        let path = base.join(name);
        fs::create_dir_all(&path)
            .map_err(|e| GeneratorError::new(&format!("Failed to create scratch dir: {}", e)))?;
        Ok(ScratchDir { path })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Whether a tar member path is a desktop entry we care about.
fn is_desktop_member(path: &Path) -> bool {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.starts_with("usr/share/applications")
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "desktop")
            .unwrap_or(false)
}

/// Open a data.tar member for reading, decompressing by extension.
fn open_data_tar(path: &Path) -> Result<Box<dyn Read>, GeneratorError> {
    let file = File::open(path)
        .map_err(|e| GeneratorError::new(&format!("Failed to open {}: {}", path.display(), e)))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let reader: Box<dyn Read> = match ext {
        "xz" => Box::new(xz2::read::XzDecoder::new(file)),
        "gz" => Box::new(flate2::read::GzDecoder::new(file)),
        "bz2" => Box::new(bzip2::read::BzDecoder::new(file)),
        "zst" => Box::new(
            zstd::Decoder::new(file)
                .map_err(|e| GeneratorError::new(&format!("Failed to create zstd decoder: {}", e)))?,
        ),
        _ => Box::new(file),
    };
    Ok(reader)
}

/// Extract all desktop entries from a .deb payload as (basename, contents)
/// pairs. The ar container is unpacked into a scratch directory under
/// `tmp_dir`; the data tarball is streamed without unpacking.
pub fn extract_desktop_files(
    deb_path: &Path,
    tmp_dir: &Path,
    scratch_name: &str,
) -> Result<Vec<(String, String)>, GeneratorError> {
    let scratch = ScratchDir::create(tmp_dir, scratch_name)?;

    let status = Command::new("ar")
        .arg("x")
        .arg(deb_path)
        .current_dir(&scratch.path)
        .status()
        .map_err(|e| GeneratorError::new(&format!("Failed to run ar: {}", e)))?;
    if !status.success() {
        return Err(GeneratorError::new(&format!(
            "ar extraction failed for {}",
            deb_path.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&scratch.path)
        .map_err(|e| GeneratorError::new(&format!("Failed to read scratch dir: {}", e)))?
    {
        let entry =
            entry.map_err(|e| GeneratorError::new(&format!("Failed to read entry: {}", e)))?;
        let filename = entry.file_name();
        if !filename.to_string_lossy().starts_with("data.tar") {
            continue;
        }

        let reader = open_data_tar(&entry.path())?;
        let mut archive = tar::Archive::new(reader);
        let members = archive
            .entries()
            .map_err(|e| GeneratorError::new(&format!("Failed to read data tarball: {}", e)))?;

        for member in members {
            let mut member = match member {
                Ok(member) => member,
                Err(e) => {
                    warn!("Skipping unreadable tar member: {}", e);
                    continue;
                }
            };

            let member_path = match member.path() {
                Ok(path) => path.to_path_buf(),
                Err(_) => continue,
            };
            if !is_desktop_member(&member_path) {
                continue;
            }
            let basename = match member_path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let mut bytes = Vec::new();
            if let Err(e) = member.read_to_end(&mut bytes) {
                warn!("Skipping unreadable member {}: {}", basename, e);
                continue;
            }
            entries.push((basename, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }

    Ok(entries)
}
