//! ZIP packaging of container workfolders.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{error::IcddError, fileutil::to_slash};

/// Zips the contents of `dir` (not `dir` itself) into `archive`, replacing any existing file.
pub fn pack(dir: &Path, archive: &Path) -> Result<(), IcddError> {
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = ZipWriter::new(File::create(archive)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut buffer = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        let name = to_slash(entry.path().strip_prefix(dir)?);
        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else {
            writer.start_file(name, options)?;
            buffer.clear();
            File::open(entry.path())?.read_to_end(&mut buffer)?;
            writer.write_all(&buffer)?;
        }
    }
    writer.finish()?;
    tracing::debug!("packed {:?} into {:?}", dir, archive);
    Ok(())
}

/// Extracts `archive` into `dir`.
pub fn unpack(archive: &Path, dir: &Path) -> Result<(), IcddError> {
    let mut zip = open(archive)?;
    std::fs::create_dir_all(dir)?;
    zip.extract(dir)?;
    tracing::debug!("unpacked {:?} into {:?}", archive, dir);
    Ok(())
}

/// Entry names of `archive`, in archive order.
pub fn entries(archive: &Path) -> Result<Vec<String>, IcddError> {
    let zip = open(archive)?;
    Ok(zip.file_names().map(str::to_string).collect())
}

/// Whether `path` opens as a ZIP archive.
pub fn is_zip(path: &Path) -> bool {
    open(path).is_ok()
}

fn open(archive: &Path) -> Result<ZipArchive<File>, IcddError> {
    let file = File::open(archive).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => IcddError::NotFound(format!("{archive:?}")),
        _ => IcddError::from(err),
    })?;
    Ok(ZipArchive::new(file)?)
}
