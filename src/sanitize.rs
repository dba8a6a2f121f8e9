//! Filesystem-safe file and directory names.
//!
//! Names are made valid on the most restrictive common target (Windows / SMB shares),
//! since the destination library is often a network drive.

use crate::normalize::RE_WHITESPACE;

/// Characters that are not allowed in Windows file names.
pub const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Reserved device names on Windows.
/// A file whose base name (before the first dot) matches one of these is escaped with a leading underscore.
pub const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2",
    "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make a single path segment safe to use as a file or directory name.
///
/// Invalid and control characters are replaced with `_`, whitespace is collapsed,
/// trailing dots and spaces are removed and reserved device names are escaped.
///
/// ```rust
/// use media_relocate::sanitize::sanitize_filename;
///
/// assert_eq!(sanitize_filename("What If?  Part 1"), "What If_ Part 1");
/// assert_eq!(sanitize_filename("con.mkv"), "_con.mkv");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();

    let collapsed = RE_WHITESPACE.replace_all(&replaced, " ");
    let trimmed = collapsed.trim().trim_end_matches(['.', ' ']);

    let base = trimmed.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|reserved| base.eq_ignore_ascii_case(reserved)) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod sanitize_tests {
    use super::*;

    #[test]
    fn replaces_invalid_characters() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn replaces_control_characters() {
        assert_eq!(sanitize_filename("tab\u{0007}bell"), "tab_bell");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(sanitize_filename("  Show \t Name  "), "Show Name");
    }

    #[test]
    fn removes_trailing_dots() {
        assert_eq!(sanitize_filename("S.H.I.E.L.D."), "S.H.I.E.L.D");
    }

    #[test]
    fn escapes_reserved_names() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("nul.srt"), "_nul.srt");
        assert_eq!(sanitize_filename("Lpt1"), "_Lpt1");
    }

    #[test]
    fn reserved_name_as_prefix_is_fine() {
        assert_eq!(sanitize_filename("Console Wars.mkv"), "Console Wars.mkv");
        assert_eq!(sanitize_filename("COM10"), "COM10");
    }

    #[test]
    fn keeps_unicode() {
        assert_eq!(sanitize_filename("Pokémon: La Película"), "Pokémon_ La Película");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["What If?", "con", "A  B..", "x:y"] {
            let once = sanitize_filename(name);
            assert_eq!(sanitize_filename(&once), once);
        }
    }
}
