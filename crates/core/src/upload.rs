//! Filename rules for uploaded inputs and generated outputs.

use chrono::{DateTime, Utc};

/// Used when sanitization leaves nothing behind.
pub const FALLBACK_FILENAME: &str = "upload";

/// Reduce a client-supplied filename to a safe single path component.
///
/// - Path separators and whitespace become `_` (runs collapse to one).
/// - Only ASCII letters, digits, `.`, `_` and `-` survive.
/// - Leading and trailing `.`/`_` are stripped, so `..` can never remain.
///
/// ```
/// use posegen_core::upload::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Pose.JPG"), "My_Pose.JPG");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(sanitize_filename("..."), "upload");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch.is_whitespace() || ch == '/' || ch == '\\' {
            pending_sep = true;
            continue;
        }
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')) {
            continue;
        }
        if pending_sep && !cleaned.is_empty() {
            cleaned.push('_');
        }
        pending_sep = false;
        cleaned.push(ch);
    }

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Name for the `index`-th output of a synchronous run finished at `at`.
///
/// Convention: `output_{YYYYmmdd_HHMMSS}_{index}.png`
pub fn output_filename(at: DateTime<Utc>, index: usize) -> String {
    format!("output_{}_{index}.png", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plain_name_is_unchanged() {
        assert_eq!(sanitize_filename("input_pose2.jpg"), "input_pose2.jpg");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(sanitize_filename("  my   pose .png"), "my_pose_.png");
    }

    #[test]
    fn traversal_is_flattened() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
    }

    #[test]
    fn non_ascii_is_dropped() {
        assert_eq!(sanitize_filename("pose_ñandú.png"), "pose_and.png");
    }

    #[test]
    fn hidden_file_loses_leading_dot() {
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("日本語"), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("._."), FALLBACK_FILENAME);
    }

    #[test]
    fn output_filename_uses_timestamp_and_index() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(output_filename(at, 0), "output_20250309_140507_0.png");
        assert_eq!(output_filename(at, 3), "output_20250309_140507_3.png");
    }
}
