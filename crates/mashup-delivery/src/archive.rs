//! Zip packaging.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DeliveryResult;

/// Deflate `bytes` into a single-entry zip archive.
pub fn archive(bytes: &[u8], inner_filename: &str) -> DeliveryResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(inner_filename, options)?;
    zip.write_all(bytes)?;

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_single_entry() {
        let payload = vec![7u8; 4096];
        let bytes = archive(&payload, "mashup.mp3").unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 1);
        let mut entry = zip.by_name("mashup.mp3").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut out = Vec::new();
        entry.read_to_end(&mut out).unwrap();
        assert_eq!(out, payload);
    }
}
