//! Helpers for the free-text fields that arrive from dashboard forms.

/// Trim a form value and treat blank input as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Like [`non_blank`] for borrowed input.
pub fn non_blank_str(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" Offset A ".to_string())), Some("Offset A".to_string()));
        assert_eq!(non_blank_str(Some("\t")), None);
    }
}
