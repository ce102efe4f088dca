use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use bytes::Bytes;
use uuid::Uuid;

/// Archive format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::Tar => "application/x-tar",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            _ => Err(anyhow::anyhow!("Unsupported archive format: {}", s)),
        }
    }
}

/// One file to pack
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub document_id: Uuid,
    pub filename: String,
    pub data: Bytes,
}

/// Base name only, so entries cannot escape the extraction directory.
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Append " (2)", " (3)", ... before the extension until the name is unused.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (name.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// Entry names in input order, sanitized and made unique.
pub(crate) fn entry_names(entries: &[ArchiveEntry]) -> Vec<String> {
    let mut used = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            let safe = sanitize_archive_filename(
                &entry.filename,
                &format!("documento_{}", entry.document_id),
            );
            unique_name(safe, &mut used)
        })
        .collect()
}

/// Create a ZIP archive
pub fn create_zip_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (entry, name) in entries.iter().zip(entry_names(entries)) {
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("Failed to add file to ZIP: {}", name))?;
            zip.write_all(&entry.data)
                .with_context(|| format!("Failed to write file data to ZIP: {}", name))?;
        }

        zip.finish().context("Failed to finalize ZIP archive")?;
    }

    Ok(buffer)
}

/// Create a TAR archive
pub fn create_tar_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    use tar::Builder;

    let mut buffer = Vec::new();
    {
        let mut tar = Builder::new(&mut buffer);

        for (entry, name) in entries.iter().zip(entry_names(entries)) {
            let mut header = tar::Header::new_gnu();
            header.set_size(entry.data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
            header.set_cksum();

            tar.append_data(&mut header, &name, &entry.data[..])
                .with_context(|| format!("Failed to add file to TAR: {}", name))?;
        }

        tar.finish().context("Failed to finalize TAR archive")?;
    }

    Ok(buffer)
}

pub fn create_archive(format: ArchiveFormat, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    match format {
        ArchiveFormat::Zip => create_zip_archive(entries),
        ArchiveFormat::Tar => create_tar_archive(entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry(filename: &str, data: &str) -> ArchiveEntry {
        ArchiveEntry {
            document_id: Uuid::new_v4(),
            filename: filename.to_string(),
            data: Bytes::from(data.to_string()),
        }
    }

    #[test]
    fn test_archive_format_from_str() {
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!(" TAR ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Tar);
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn test_sanitize_archive_filename() {
        assert_eq!(sanitize_archive_filename("../../etc/passwd", "fallback"), "passwd");
        assert_eq!(sanitize_archive_filename("..\\docs\\nota.xml", "fallback"), "nota.xml");
        assert_eq!(sanitize_archive_filename("balancete.pdf", "fallback"), "balancete.pdf");
        assert_eq!(sanitize_archive_filename("", "fallback"), "fallback");
        assert_eq!(sanitize_archive_filename("..", "fallback"), "fallback");
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let entries = vec![
            entry("contrato.pdf", "a"),
            entry("Contrato.pdf", "b"),
            entry("dir/contrato.pdf", "c"),
            entry("LEIAME", "d"),
            entry("LEIAME", "e"),
        ];
        assert_eq!(
            entry_names(&entries),
            vec![
                "contrato.pdf",
                "Contrato (2).pdf",
                "contrato (3).pdf",
                "LEIAME",
                "LEIAME (2)"
            ]
        );
    }

    #[test]
    fn test_zip_contains_every_entry() {
        let entries = vec![entry("a.txt", "alpha"), entry("a.txt", "beta")];
        let bytes = create_archive(ArchiveFormat::Zip, &entries).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("a (2).txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "beta");
    }

    #[test]
    fn test_tar_contains_every_entry() {
        let entries = vec![entry("x.csv", "1,2"), entry("y.csv", "3,4")];
        let bytes = create_archive(ArchiveFormat::Tar, &entries).unwrap();

        let mut archive = tar::Archive::new(std::io::Cursor::new(bytes));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.csv", "y.csv"]);
    }
}
