/// Minimum number of digits the admin forms accept.
pub const MIN_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please enter a phone number")]
    Empty,

    #[error("Please enter a valid phone number (got {digits} digits)")]
    TooShort { digits: usize },
}

/// Strips everything but ASCII digits: `+91 98765-43210` -> `919876543210`.
pub fn clean_number(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Cleans `input`, rejecting it only when no digits remain.
pub fn require_number(input: &str) -> Result<String, InputError> {
    let cleaned = clean_number(input);
    if cleaned.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(cleaned)
}

/// Cleans `input` and enforces the admin-form minimum length.
pub fn validate_number(input: &str) -> Result<String, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let cleaned = clean_number(input);
    if cleaned.len() < MIN_DIGITS {
        return Err(InputError::TooShort {
            digits: cleaned.len(),
        });
    }
    Ok(cleaned)
}

/// Groups a number as `2 5 5` digits for display, e.g. `91 98765 43210`.
/// Numbers longer than twelve digits are shown ungrouped.
pub fn display_number(input: &str) -> String {
    let cleaned = clean_number(input);
    if cleaned.len() > 12 {
        return cleaned;
    }
    let (head, rest) = cleaned.split_at(cleaned.len().min(2));
    let (mid, tail) = rest.split_at(rest.len().min(5));
    [head, mid, tail]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
