// SLogViz - platform/fs.rs
//
// Whole-file text reads for the text importers (syslog, snapshot).
//
// - Content is decoded lossily: an invalid byte becomes U+FFFD instead of
//   failing the import.
// - Files at or above the large-file threshold are memory-mapped rather than
//   read into an intermediate buffer.
// - A failed read is reported as is; inputs are static files.

use std::io;
use std::path::Path;

/// Read `path` as text, memory-mapping it when it is at least
/// `large_threshold` bytes long.
pub fn read_text_lossy(path: &Path, large_threshold: u64) -> io::Result<String> {
    let size = std::fs::metadata(path)?.len();
    if size >= large_threshold {
        tracing::debug!(file = %path.display(), size, "Memory-mapping large file");
        read_mapped(path)
    } else {
        std::fs::read(path).map(decode_lossy)
    }
}

fn read_mapped(path: &Path) -> io::Result<String> {
    let file = std::fs::File::open(path)?;
    // SAFETY: the map is only read, and imported files are already written.
    // A file truncated by another process while mapped can still fault; that
    // risk is accepted for log files at rest.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Decode bytes as UTF-8, reusing the buffer when it is already valid.
fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
