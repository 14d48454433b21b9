//! Format checks for the text inputs. Each function accepts exactly what its
//! documented pattern accepts.

/// `^[^\s@]+@[^\s@]+\.[^\s@]+$`
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len())
}

/// `^\+?[0-9\s\-()]{8,15}$`
pub fn is_phone(value: &str) -> bool {
    let body = value.strip_prefix('+').unwrap_or(value);
    let count = body.chars().count();
    (8..=15).contains(&count)
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '(' | ')'))
}

/// `^\d{2}-\d{3}$`
pub fn is_postal_code(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 6
        && bytes[2] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(index, b)| index == 2 || b.is_ascii_digit())
}

/// `^\d+(\.\d+)?$`
pub fn is_decimal(value: &str) -> bool {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}
