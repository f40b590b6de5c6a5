//! Phone number validation.
//!
//! Accepted shape: a leading `+`, then 7 to 15 digits. A single space may
//! separate digits. The stored form has the spaces removed.

use peerfx_types::{PeerfxError, Result, constants};

/// Validate `raw` and return it with spaces stripped.
pub fn normalize(raw: &str) -> Result<String> {
    let invalid = || PeerfxError::InvalidPhone(raw.to_string());

    let rest = raw.strip_prefix('+').ok_or_else(invalid)?;
    let mut digits = String::with_capacity(rest.len() + 1);
    digits.push('+');

    let mut prev_space = true; // a space right after `+` is rejected
    for c in rest.chars() {
        match c {
            '0'..='9' => {
                digits.push(c);
                prev_space = false;
            }
            ' ' if !prev_space => prev_space = true,
            _ => return Err(invalid()),
        }
    }
    if prev_space {
        return Err(invalid());
    }

    let count = digits.len() - 1;
    if !(constants::MIN_PHONE_DIGITS..=constants::MAX_PHONE_DIGITS).contains(&count) {
        return Err(invalid());
    }
    Ok(digits)
}
