//! Shared utility functions for CLI commands.

use std::path::{Path, PathBuf};

/// Image extensions accepted as frames.
pub const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Lists the frame images in `dir`, sorted by file name.
///
/// Sub-directories and files with other extensions are ignored.
pub fn list_frame_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Format a throughput estimate (e.g., "23.4 fps", "-- fps").
pub fn format_fps(fps: Option<f64>) -> String {
    match fps {
        Some(fps) => format!("{:.1} fps", fps),
        None => "-- fps".to_string(),
    }
}

/// Format a duration in microseconds (e.g., "850 µs", "12.3 ms").
pub fn format_micros(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.2} s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.1} ms", us as f64 / 1_000.0)
    } else {
        format!("{} µs", us)
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}
