//! String conversion utilities.

/// Converts a blank string to `None`, otherwise returns the trimmed value.
///
/// # Examples
///
/// ```
/// use storyloom_domain::common::none_if_blank;
///
/// assert_eq!(none_if_blank("  hall "), Some("hall"));
/// assert_eq!(none_if_blank("   "), None);
/// ```
pub fn none_if_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Reads an optional identifier as produced by generated text.
///
/// Generated records often spell "nothing" as an empty string or as the
/// literal words `null` / `none` instead of omitting the field.
///
/// # Examples
///
/// ```
/// use storyloom_domain::common::optional_token;
///
/// assert_eq!(optional_token("room_001_001"), Some("room_001_001".to_string()));
/// assert_eq!(optional_token("null"), None);
/// assert_eq!(optional_token(" None "), None);
/// assert_eq!(optional_token(""), None);
/// ```
pub fn optional_token(value: &str) -> Option<String> {
    let trimmed = none_if_blank(value)?;
    if trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
