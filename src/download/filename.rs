//! Destination file naming.
//!
//! A record's file name is derived only from its venue, year/volume and title,
//! so the same listing always produces the same set of files:
//!
//! ```text
//! {VENUE}-{year | v<volume>}-{Sanitized-Title}.pdf
//! ```

use std::path::{Path, PathBuf};

use url::Url;

use crate::paper::PaperRecord;

/// Maximum length of the sanitized title part, in characters.
pub const MAX_TITLE_CHARS: usize = 150;

/// Maximum length of the sanitized title part, in UTF-8 bytes.
///
/// Venue prefix, `-Slides` suffix, extension and the `.part` temp wrapper
/// all fit on top of this within a 255-byte file name.
pub const MAX_TITLE_BYTES: usize = 200;

const UNTITLED: &str = "untitled";

/// Makes a title filesystem-safe.
///
/// `/` and `.` are dropped, every run of non-word characters becomes one `-`,
/// and leading/trailing dashes are trimmed. Word characters are Unicode
/// alphanumerics and `_`. The result is cut at a character boundary to at
/// most [`MAX_TITLE_CHARS`] characters and [`MAX_TITLE_BYTES`] bytes.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars().filter(|c| !matches!(c, '/' | '.')) {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }

    let mut budget = MAX_TITLE_BYTES;
    let truncated: String = out
        .chars()
        .take(MAX_TITLE_CHARS)
        .take_while(|ch| match budget.checked_sub(ch.len_utf8()) {
            Some(left) => {
                budget = left;
                true
            }
            None => false,
        })
        .collect();
    let trimmed = truncated.trim_end_matches('-');
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name for a record, e.g. `FAST-2023-A-Cache-Story.pdf`.
#[must_use]
pub fn destination_name(record: &PaperRecord) -> String {
    let venue = record.venue.as_str().to_ascii_uppercase();
    let title = sanitize_title(&record.title);
    match (record.year, record.volume) {
        (Some(year), _) => format!("{venue}-{year}-{title}.pdf"),
        (None, Some(volume)) => format!("{venue}-v{volume}-{title}.pdf"),
        (None, None) => format!("{venue}-{title}.pdf"),
    }
}

/// Full destination path under `save_dir`.
#[must_use]
pub fn destination_path(save_dir: &Path, record: &PaperRecord) -> PathBuf {
    save_dir.join(destination_name(record))
}

/// Sibling path for a paper's slide deck: `{stem}-Slides.{ext}`.
///
/// The extension is taken from the slides URL when it is short and
/// alphabetic (`pdf`, `pptx`, `key`); anything else falls back to `pdf`.
#[must_use]
pub fn slides_path(destination: &Path, slides_url: &str) -> PathBuf {
    let stem = destination
        .file_stem()
        .map_or_else(|| UNTITLED.into(), |s| s.to_string_lossy());
    let ext = slides_extension(slides_url);
    destination.with_file_name(format!("{stem}-Slides.{ext}"))
}

fn slides_extension(url: &str) -> String {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    path.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphabetic()))
        .map_or_else(|| "pdf".to_string(), str::to_ascii_lowercase)
}

/// Hidden temporary path next to `destination` used for atomic writes.
#[must_use]
pub fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map_or_else(|| UNTITLED.into(), |n| n.to_string_lossy());
    destination.with_file_name(format!(".{name}.part"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::PaperSource;
    use crate::venue::VenueId;

    fn record(title: &str, venue: VenueId) -> PaperRecord {
        PaperRecord::new(
            title,
            venue,
            PaperSource::Pdf {
                url: "https://x.org/a.pdf".to_string(),
            },
        )
    }

    #[test]
    fn test_sanitize_title_basic() {
        assert_eq!(
            sanitize_title("A Cache: For Everything!"),
            "A-Cache-For-Everything"
        );
    }

    #[test]
    fn test_sanitize_title_drops_slash_and_dot() {
        assert_eq!(sanitize_title("I/O v2.0 Design"), "IO-v20-Design");
    }

    #[test]
    fn test_sanitize_title_keeps_unicode_and_underscore() {
        assert_eq!(sanitize_title("Über snake_case Ideen"), "Über-snake_case-Ideen");
    }

    #[test]
    fn test_sanitize_title_empty_becomes_untitled() {
        assert_eq!(sanitize_title(" ../ !! "), "untitled");
    }

    #[test]
    fn test_sanitize_title_truncates() {
        let long = "word ".repeat(100);
        let sanitized = sanitize_title(&long);
        assert!(sanitized.chars().count() <= MAX_TITLE_CHARS);
        assert!(!sanitized.ends_with('-'));
    }

    #[test]
    fn test_sanitize_title_respects_byte_budget() {
        let cjk = "缓存一致性协议的形式化验证".repeat(20);
        let sanitized = sanitize_title(&cjk);
        assert!(sanitized.len() <= MAX_TITLE_BYTES);
        assert!(sanitized.chars().count() < MAX_TITLE_CHARS);

        let record = record(&cjk, VenueId::Neurips).with_year(Some(2023));
        let temp = temp_path(Path::new(&destination_name(&record)));
        let slides = slides_path(&temp, "https://x.org/deck.pptx");
        assert!(slides.as_os_str().len() <= 255);
    }

    #[test]
    fn test_slides_path_takes_extension_from_url() {
        let paper = Path::new("/tmp/paper/FAST-2023-Cache.pdf");
        assert_eq!(
            slides_path(paper, "https://www.usenix.org/system/files/fast23_slides-cache.pdf"),
            PathBuf::from("/tmp/paper/FAST-2023-Cache-Slides.pdf")
        );
        assert_eq!(
            slides_path(paper, "https://www.ndss-symposium.org/wp-content/uploads/deck.PPTX"),
            PathBuf::from("/tmp/paper/FAST-2023-Cache-Slides.pptx")
        );
        assert_eq!(
            slides_path(paper, "https://x.org/slides?id=7"),
            PathBuf::from("/tmp/paper/FAST-2023-Cache-Slides.pdf")
        );
    }

    #[test]
    fn test_destination_name_year_volume_and_neither() {
        let conf = record("Fast Caches", VenueId::Fast).with_year(Some(2023));
        assert_eq!(destination_name(&conf), "FAST-2023-Fast-Caches.pdf");

        let journal = record("Kernels", VenueId::Jmlr).with_volume(Some(24));
        assert_eq!(destination_name(&journal), "JMLR-v24-Kernels.pdf");

        let flat = record("Kernels", VenueId::Jmlr);
        assert_eq!(destination_name(&flat), "JMLR-Kernels.pdf");
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path(Path::new("/tmp/paper/FAST-2023-X.pdf"));
        assert_eq!(temp, PathBuf::from("/tmp/paper/.FAST-2023-X.pdf.part"));
    }
}
