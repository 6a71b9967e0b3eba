//! Shared identifier types and label handling.

/// Room identifier. Caller-supplied and opaque: a project id, or
/// [`PUBLIC_ROOM_ID`] for the unauthenticated shared canvas.
pub type RoomId = String;

/// Client identifier, generated by the joining participant. Unique within a
/// room for the lifetime of its connection; the relay treats it as unique
/// without verifying global uniqueness.
pub type ClientId = String;

/// Well-known room id for the public canvas (no authorization required).
pub const PUBLIC_ROOM_ID: &str = "public-canvas";

/// Display label used when a participant joins without one.
pub const ANONYMOUS_LABEL: &str = "anonymous";

/// Normalize a participant label: trim whitespace, fall back to the
/// anonymous placeholder when empty.
pub fn normalize_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        ANONYMOUS_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("ada@example.com"), "ada@example.com");
        assert_eq!(normalize_label("  bob@example.com  "), "bob@example.com");
        assert_eq!(normalize_label(""), ANONYMOUS_LABEL);
        assert_eq!(normalize_label("   "), ANONYMOUS_LABEL);
    }
}
