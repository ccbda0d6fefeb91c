//! Filename helpers for saved artifacts

/// Characters invalid on Windows/macOS/Linux filesystems
const INVALID_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

const MAX_FILENAME_LEN: usize = 200;

/// Make a service-provided filename safe to create inside the download directory.
pub fn sanitize_filename(name: &str) -> String {
    // Path traversal first, then invalid characters
    let mut sanitized: String = name
        .replace("..", "")
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();

    // Leading dots would make hidden files; trailing dots and spaces break Windows
    sanitized = sanitized.trim().trim_start_matches('.').to_string();
    sanitized = sanitized.trim_end_matches('.').trim_end().to_string();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    if sanitized.chars().count() > MAX_FILENAME_LEN {
        let extension = sanitized
            .rfind('.')
            .map(|pos| sanitized[pos..].to_string())
            .filter(|ext| ext.chars().count() < 10)
            .unwrap_or_default();
        let keep = MAX_FILENAME_LEN - extension.chars().count();
        let stem: String = sanitized.chars().take(keep).collect();
        sanitized = format!("{}{}", stem, extension);
    }

    sanitized
}

/// Shorten a URL for user-facing messages, appending `...` when cut.
pub fn preview_url(url: &str, max_chars: usize) -> String {
    if url.chars().count() <= max_chars {
        return url.to_string();
    }
    let head: String = url.chars().take(max_chars).collect();
    format!("{}...", head)
}
