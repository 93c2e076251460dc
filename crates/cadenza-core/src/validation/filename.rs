use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

const MAX_STEM_LENGTH: usize = 64;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("static regex"))
}

fn repeated_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_{2,}").expect("static regex"))
}

/// Lowercased extension without the dot, if any
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    let ext = ext.to_lowercase();
    ext.chars()
        .all(|c| c.is_ascii_alphanumeric())
        .then_some(ext)
}

/// Make a name safe to use as one storage path segment
pub fn sanitize_file_name(file_name: &str) -> String {
    let replaced = unsafe_chars().replace_all(file_name, "_");
    let collapsed = repeated_underscores().replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    let mut out: String = trimmed.chars().take(MAX_STEM_LENGTH).collect();
    if out.is_empty() {
        out.push_str("file");
    }
    out
}

/// Unique in-bucket path for an upload, optionally under an owner prefix
pub fn generate_upload_path(file_name: &str, owner: Option<&str>) -> String {
    let extension = file_extension(file_name);
    let stem = match &extension {
        Some(ext) => &file_name[..file_name.len() - ext.len() - 1],
        None => file_name,
    };
    let mut name = format!("{}-{}", sanitize_file_name(stem), Uuid::new_v4().simple());
    if let Some(ext) = extension {
        name.push('.');
        name.push_str(&ext);
    }
    match owner.map(sanitize_file_name) {
        Some(owner) => format!("{}/{}", owner, name),
        None => name,
    }
}
