//! Upload name handling: extension allow-list, sanitization and
//! collision-resistant stored names.

use uuid::Uuid;

use crate::errors::{GalleryError, Result};

/// Extensions accepted for upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "mp4", "mov", "webm"];

/// Upper bound for a single path component on common filesystems.
pub const MAX_STORED_NAME_BYTES: usize = 255;

/// Room left for the sanitized name after the 32 hex token and `_`.
const MAX_SANITIZED_BYTES: usize = MAX_STORED_NAME_BYTES - 33;

/// Returns `true` when the text after the last `.` is an allowed extension.
///
/// Names without any `.` are rejected.
pub fn validate_extension(original_name: &str) -> bool {
    match original_name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Human readable rejection message listing the allowed extensions.
pub fn extension_rejection_message() -> String {
    format!(
        "File type not allowed. Allowed: {}",
        ALLOWED_EXTENSIONS.join(", ")
    )
}

/// Strips any directory components and control characters from a client
/// supplied file name.
///
/// Both `/` and `\` count as separators so that Windows-style paths sent by
/// browsers are reduced to their final component as well. Over-long names
/// have their stem shortened so the `.ext` suffix survives.
pub fn sanitize_original_name(original_name: &str) -> Result<String> {
    let last = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(GalleryError::Validation(format!(
            "Invalid file name: {original_name:?}"
        )));
    }

    Ok(shorten(cleaned, MAX_SANITIZED_BYTES))
}

fn shorten(name: String, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name;
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max_bytes => {
            let stem = truncate_on_char_boundary(stem, max_bytes - ext.len() - 1);
            format!("{stem}.{ext}")
        }
        _ => truncate_on_char_boundary(&name, max_bytes).to_string(),
    }
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Builds `{random hex}_{sanitized name}` for a new upload.
pub fn generate_stored_name(original_name: &str) -> Result<String> {
    let sanitized = sanitize_original_name(original_name)?;
    let token = Uuid::new_v4().simple();
    Ok(format!("{token}_{sanitized}"))
}

/// A stored name must be a single path component.
pub fn is_safe_stored_name(stored_name: &str) -> bool {
    !stored_name.is_empty()
        && stored_name != "."
        && stored_name != ".."
        && !stored_name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_extension_allowed() {
        assert!(validate_extension("photo.png"));
        assert!(validate_extension("photo.JPG"));
        assert!(validate_extension("clip.final.webm"));
        assert!(validate_extension("movie.MoV"));
    }

    #[test]
    fn test_validate_extension_rejected() {
        assert!(!validate_extension("virus.exe"));
        assert!(!validate_extension("noextension"));
        assert!(!validate_extension("archive.png.zip"));
        assert!(!validate_extension("trailingdot."));
        assert!(!validate_extension(""));
    }

    #[test]
    fn test_rejection_message_lists_extensions() {
        let message = extension_rejection_message();
        for ext in ALLOWED_EXTENSIONS {
            assert!(message.contains(ext));
        }
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_original_name("../../etc/a.png").unwrap(), "a.png");
        assert_eq!(
            sanitize_original_name("C:\\Users\\me\\b.jpg").unwrap(),
            "b.jpg"
        );
        assert_eq!(sanitize_original_name("plain.gif").unwrap(), "plain.gif");
    }

    #[test]
    fn test_sanitize_drops_control_characters() {
        assert_eq!(sanitize_original_name("a\0b\n.png").unwrap(), "ab.png");
    }

    #[test]
    fn test_sanitize_rejects_empty_components() {
        assert!(matches!(
            sanitize_original_name("dir/"),
            Err(GalleryError::Validation(_))
        ));
        assert!(sanitize_original_name("..").is_err());
        assert!(sanitize_original_name("a/.").is_err());
        assert!(sanitize_original_name("\0").is_err());
    }

    #[test]
    fn test_generate_stored_name_format() {
        let name = generate_stored_name("a.png").unwrap();
        let (token, rest) = name.split_once('_').unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "a.png");
        assert!(is_safe_stored_name(&name));
    }

    #[test]
    fn test_generate_stored_name_unique() {
        let first = generate_stored_name("a.png").unwrap();
        let second = generate_stored_name("a.png").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_stored_name_sanitizes() {
        let name = generate_stored_name("../../evil.png").unwrap();
        assert!(name.ends_with("_evil.png"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_sanitize_shortens_long_names() {
        let long = format!("{}.png", "a".repeat(236));

        let sanitized = sanitize_original_name(&long).unwrap();

        assert_eq!(sanitized.len(), MAX_SANITIZED_BYTES);
        assert!(sanitized.ends_with(".png"));
        assert!(validate_extension(&sanitized));
    }

    #[test]
    fn test_sanitize_shortens_on_char_boundary() {
        let long = format!("{}.jpeg", "é".repeat(200));

        let sanitized = sanitize_original_name(&long).unwrap();

        assert!(sanitized.len() <= MAX_SANITIZED_BYTES);
        assert!(sanitized.ends_with(".jpeg"));
        assert!(sanitized.trim_end_matches(".jpeg").chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_generate_stored_name_fits_path_component() {
        let long = format!("{}.webm", "x".repeat(1000));

        let name = generate_stored_name(&long).unwrap();

        assert!(name.len() <= MAX_STORED_NAME_BYTES);
        assert!(name.ends_with(".webm"));
    }

    #[test]
    fn test_is_safe_stored_name() {
        assert!(is_safe_stored_name("abc_a.png"));
        assert!(!is_safe_stored_name(""));
        assert!(!is_safe_stored_name(".."));
        assert!(!is_safe_stored_name("../a.png"));
        assert!(!is_safe_stored_name("a\\b.png"));
        assert!(!is_safe_stored_name("a\0.png"));
    }
}
