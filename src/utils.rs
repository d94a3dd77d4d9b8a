// src/utils.rs
use anyhow::Result;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Make an uploaded file name safe to store: path components are dropped and
/// anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validate file extension against allowed types
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> Result<()> {
    let ext = get_file_extension(filename)
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", filename))?;

    if !allowed.contains(&ext.as_str()) {
        anyhow::bail!(
            "Unsupported file extension: {}. Allowed: {:?}",
            ext,
            allowed
        );
    }

    Ok(())
}

pub fn validate_image_file(filename: &str) -> Result<()> {
    validate_file_extension(filename, &IMAGE_EXTENSIONS)
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
