//! Executable identity probe.
//!
//! Windows executables carry product/description strings in their version
//! resource as UTF-16LE. Rather than bind to platform version-info APIs, the
//! probe scans the binary for the expected marker strings, which is enough to
//! keep directory discovery from driving an unrelated executable.

use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK: usize = 64 * 1024;

/// True when every marker appears (UTF-16LE encoded) somewhere in the file.
pub fn verify_executable(path: &Path, markers: &[String]) -> bool {
    if markers.is_empty() {
        return false;
    }
    let needles: Vec<Vec<u8>> = markers.iter().map(|m| utf16le_bytes(m)).collect();
    match scan_for_all(path, &needles) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "identity probe failed to read file");
            false
        }
    }
}

fn scan_for_all(path: &Path, needles: &[Vec<u8>]) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut found = vec![false; needles.len()];
    let longest = needles.iter().map(Vec::len).max().unwrap_or(0);

    // Overlap consecutive chunks so a marker split across a boundary still
    // matches.
    let mut carry: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        let mut window = carry.clone();
        window.extend_from_slice(&buf[..read]);

        for (i, needle) in needles.iter().enumerate() {
            if !found[i] && contains(&window, needle) {
                found[i] = true;
            }
        }
        if found.iter().all(|f| *f) {
            return Ok(true);
        }

        let keep = longest.saturating_sub(1).min(window.len());
        carry = window[window.len() - keep..].to_vec();
    }
    Ok(found.iter().all(|f| *f))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn utf16le_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}
