use std::cmp::Ordering;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a leaderboard cell, e.g. "Team Name (12.34)"
pub fn label_with_value(name: &str, value: f64) -> String {
    format!("{} ({:.2})", name, round2(value))
}

/// Convert a win/loss/tie record to a display string ("7-3", or "7-2-1" with ties)
pub fn format_record(wins: u32, losses: u32, ties: u32) -> String {
    if ties > 0 {
        format!("{}-{}-{}", wins, losses, ties)
    } else {
        format!("{}-{}", wins, losses)
    }
}

/// Signed point differential, "+" prefixed when positive
pub fn format_differential(differential: f64) -> String {
    // adding 0.0 folds -0 into 0
    let rounded = differential.round() + 0.0;
    if rounded > 0.0 {
        format!("+{}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// Descending comparison for floats; NaN sorts as equal
pub fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Ascending comparison for floats; NaN sorts as equal
pub fn asc(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Percentage of `part` in `total`, 0 when total is zero
pub fn share_pct(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    round2(part / total * 100.0)
}

/// Parse a percentage label such as "76%" or " 24 % "
pub fn parse_percentage(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

/// Validate a registry name (used in URLs and cache paths)
pub fn validate_league_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.len() <= 50
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(-3.004), -3.0);
    }

    #[test]
    fn test_label_with_value() {
        assert_eq!(label_with_value("Golladay Inn", 12.3456), "Golladay Inn (12.35)");
    }

    #[test]
    fn test_format_record() {
        assert_eq!(format_record(7, 3, 0), "7-3");
        assert_eq!(format_record(7, 2, 1), "7-2-1");
    }

    #[test]
    fn test_format_differential() {
        assert_eq!(format_differential(42.4), "+42");
        assert_eq!(format_differential(-17.6), "-18");
        assert_eq!(format_differential(0.2), "0");
    }

    #[test]
    fn test_share_pct() {
        assert_eq!(share_pct(25.0, 100.0), 25.0);
        assert_eq!(share_pct(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("76%"), Some(76.0));
        assert_eq!(parse_percentage(" 24 % "), Some(24.0));
        assert_eq!(parse_percentage("n/a"), None);
    }

    #[test]
    fn test_validate_league_name() {
        assert!(validate_league_name("Work League"));
        assert!(!validate_league_name("../etc"));
        assert!(!validate_league_name("  "));
    }
}
