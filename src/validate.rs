/// Display names: non-empty, letters and spaces only.
pub fn is_valid_name(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_alphabetic() || c == ' ')
}

/// Passwords: 8-15 characters with at least one uppercase letter, one
/// lowercase letter, one digit and one special character.
pub fn is_valid_password(value: &str) -> bool {
    let len = value.chars().count();
    if !(8..=15).contains(&len) {
        return false;
    }
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    let has_special = value.chars().any(|c| "#?!@$%^&*-".contains(c));
    has_upper && has_lower && has_digit && has_special
}
