//! Helper functions for rendering numbers and names in controller syntax

use std::sync::LazyLock;

use regex::Regex;

use crate::euler::pose_2_xyzrpw;
use crate::pose::Pose;

static NOT_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_]+").expect("valid regex")
});

/// Formats with a fixed number of decimals, never printing "-0.000".
pub fn num(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

/// Values formatted by [`num`] and joined by `separator`.
pub fn num_list(values: &[f64], decimals: usize, separator: &str) -> String {
    values.iter().map(|&v| num(v, decimals)).collect::<Vec<_>>().join(separator)
}

/// Turns an arbitrary program name into a controller identifier: runs of characters other
/// than letters, digits and underscores become one underscore, a leading digit gets a
/// prefix, and the result is cut to `max_len` characters.
pub fn sanitize_name(name: &str, max_len: usize, uppercase: bool) -> String {
    let mut id = NOT_IDENTIFIER.replace_all(name.trim(), "_").into_owned();
    if id.is_empty() {
        id = "PROG".to_string();
    }
    if id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, 'P');
    }
    if uppercase {
        id = id.to_uppercase();
    }
    id.chars().take(max_len).collect()
}

/// Splits text into pieces of at most `width` characters, for controllers with short comment
/// or message fields. Empty text gives one empty piece.
pub fn split_text(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![String::new()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Pose as "x, y, z, r, p, w" (mm and degrees), for comments and logs.
pub fn pose_str(pose: &Pose) -> String {
    num_list(&pose_2_xyzrpw(pose), 3, ", ")
}

/// Print pose values in the xyzrpw convention.
#[allow(dead_code)]
pub fn dump_pose(pose: &Pose) {
    println!("[{}]", pose_str(pose));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_no_negative_zero() {
        assert_eq!(num(-0.0, 3), "0.000");
        assert_eq!(num(-0.0001, 3), "0.000");
        assert_eq!(num(-0.001, 3), "-0.001");
        assert_eq!(num(12.34567, 2), "12.35");
        assert_eq!(num(-1e-9, 0), "0");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Weld seam #2", 32, false), "Weld_seam_2");
        assert_eq!(sanitize_name("1st pass", 32, true), "P1ST_PASS");
        assert_eq!(sanitize_name("a_very_long_program_name", 8, true), "A_VERY_L");
        assert_eq!(sanitize_name("  ", 8, false), "PROG");
    }

    #[test]
    fn test_split_text() {
        assert_eq!(split_text("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_text("", 3), vec![""]);
    }

    #[test]
    fn test_pose_str() {
        assert_eq!(pose_str(&Pose::transl(1.0, -0.0, 2.5)), "1.000, 0.000, 2.500, 0.000, 0.000, 0.000");
    }
}
