//! File and page naming for output destinations.

use std::path::Path;

/// Name used when a chapter title sanitizes to nothing.
const FALLBACK_NAME: &str = "chapter";

const KNOWN_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// Sanitizes a chapter name for use as a file or directory name.
///
/// - Replaces NUL, path separators, characters Windows rejects (`<>:"|?*`)
///   and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes (NAME_MAX)
pub fn sanitize_file_name(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = match c {
            '\0' | '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '\t' || c == '.');

    let limited = if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        &trimmed[..take]
    } else {
        trimmed
    };

    if limited.is_empty() || limited.chars().all(|c| c == '_') {
        FALLBACK_NAME.to_string()
    } else {
        limited.to_string()
    }
}

/// Lowercased image extension from the last path segment of `page_url`, if recognised.
pub fn extension_from_url(page_url: &str) -> Option<String> {
    let last = match url::Url::parse(page_url) {
        Ok(u) => u.path_segments()?.last()?.to_string(),
        Err(_) => Path::new(page_url).file_name()?.to_str()?.to_string(),
    };
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    KNOWN_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// Image extension from magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else {
        None
    }
}

/// File name of page `index` (0-based) out of `count`: `001.jpg`, `002.png`, …
///
/// Numbers are at least three digits wide and widen for long chapters so
/// names still sort in reading order.
pub fn page_file_name(index: usize, count: usize, page_url: &str, bytes: &[u8]) -> String {
    let width = count.to_string().len().max(3);
    let ext = extension_from_url(page_url)
        .or_else(|| sniff_extension(bytes).map(str::to_string))
        .unwrap_or_else(|| "jpg".to_string());
    format!("{:0width$}.{}", index + 1, ext, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_reserved_characters() {
        assert_eq!(sanitize_file_name("Vol 1: Ch 2/3?"), "Vol 1_ Ch 2_3_");
        assert_eq!(sanitize_file_name("a\\b|c*d"), "a_b_c_d");
    }

    #[test]
    fn keeps_spaces_inside_and_trims_edges() {
        assert_eq!(sanitize_file_name("  .001 - Start.  "), "001 - Start");
    }

    #[test]
    fn empty_names_fall_back() {
        assert_eq!(sanitize_file_name("..."), "chapter");
        assert_eq!(sanitize_file_name("???"), "chapter");
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_file_name(&long);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn extension_from_url_path() {
        assert_eq!(
            extension_from_url("https://cdn.test/a/001.PNG?x=1").as_deref(),
            Some("png")
        );
        assert_eq!(extension_from_url("https://cdn.test/page"), None);
        assert_eq!(extension_from_url("https://cdn.test/page.php"), None);
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
        assert_eq!(sniff_extension(b"\x89PNG\r\n"), Some("png"));
        assert_eq!(sniff_extension(b"RIFF\0\0\0\0WEBPVP8"), Some("webp"));
        assert_eq!(sniff_extension(b"hello"), None);
    }

    #[test]
    fn page_names_sort_in_reading_order() {
        assert_eq!(page_file_name(0, 12, "https://x.test/a.png", b""), "001.png");
        assert_eq!(page_file_name(4, 12, "https://x.test/view", b"GIF89a"), "005.gif");
        assert_eq!(page_file_name(9, 1500, "https://x.test/view", b""), "0010.jpg");
    }
}
