use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,
    #[error("Unsupported country code +{0}; only US numbers (+1) are accepted")]
    InvalidCountryCode(String),
    #[error("Phone number must have 10 digits, got {0}")]
    InvalidLength(usize),
    #[error("Phone number contains invalid characters")]
    InvalidCharacters,
}

/// Normalizes a US phone number to `XXX-XXX-XXXX`.
///
/// Spaces, dots, dashes and parentheses are ignored. A leading `+1` (or a bare
/// eleven-digit number starting with `1`) is stripped; any other `+` prefix is
/// rejected rather than reformatted.
pub fn format_phone(input: &str) -> Result<String, PhoneError> {
    let digits = national_digits(input)?;
    Ok(format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..10]))
}

/// E.164 form (`+1XXXXXXXXXX`) used when handing numbers to the SMS provider.
pub fn to_e164(input: &str) -> Result<String, PhoneError> {
    national_digits(input).map(|digits| format!("+1{}", digits))
}

fn national_digits(input: &str) -> Result<String, PhoneError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let (international, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(PhoneError::InvalidCharacters),
        }
    }

    if international {
        if !digits.starts_with('1') {
            let code: String = digits.chars().take(3).collect();
            return Err(PhoneError::InvalidCountryCode(code));
        }
        digits.remove(0);
    } else if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }

    if digits.len() != 10 {
        return Err(PhoneError::InvalidLength(digits.len()));
    }

    Ok(digits)
}
