use std::collections::HashSet;

use md5::{Digest, Md5};

/// Known JVM-style error-message prefixes used to carve an `error_type` out
/// of a raw message.
const KNOWN_PREFIXES: [&str; 2] = ["java.lang.", "com."];

/// Scans every `:`-delimited part of the message for one starting with a
/// known prefix, not just the first — a target failure message is commonly
/// wrapped (`"execution failed (code=1): java.lang.AssertionError: boom"`),
/// so the exception class can sit behind other `:`-separated segments.
/// Falls back to `"UnknownError"` when no part matches.
pub fn extract_error_type(message: &str) -> String {
    for part in message.split(':') {
        let part = part.trim();
        for prefix in KNOWN_PREFIXES {
            if part.starts_with(prefix) {
                return part.to_string();
            }
        }
    }
    "UnknownError".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashEntry {
    pub input: Vec<i64>,
    pub error_message: String,
    pub error_type: String,
}

/// Dedups crashing inputs by the MD5 hash of their error message. Two runs
/// raising the identically-worded exception collapse into one recorded
/// crash regardless of which input triggered them.
#[derive(Debug, Default)]
pub struct ErrorDetector {
    crashes: Vec<CrashEntry>,
    seen_hashes: HashSet<String>,
}

impl ErrorDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `input` as a crash if `error_message` is non-empty and its
    /// hash hasn't been seen before. Returns whether a new crash was
    /// recorded.
    pub fn record(&mut self, input: &[i64], error_message: Option<&str>) -> bool {
        let Some(message) = error_message else {
            return false;
        };
        if message.is_empty() {
            return false;
        }

        let mut hasher = Md5::new();
        hasher.update(message.as_bytes());
        let digest = hex::encode(hasher.finalize());

        if !self.seen_hashes.insert(digest) {
            return false;
        }

        self.crashes.push(CrashEntry {
            input: input.to_vec(),
            error_message: message.to_string(),
            error_type: extract_error_type(message),
        });
        true
    }

    pub fn crashes(&self) -> &[CrashEntry] {
        &self.crashes
    }

    pub fn count(&self) -> usize {
        self.crashes.len()
    }
}
