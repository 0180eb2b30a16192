//! Modulus-11 checksummed patient identifier generation.
//!
//! NHS numbers are 10 digits: a 9-digit base plus a check digit computed with
//! weights 10..2 over the base digits. The target system rejects identifiers
//! with a bad check digit, so the rule is reproduced exactly here.

use rand::Rng;

/// Generate a valid 10-digit NHS number.
///
/// The check digit is `11 - (weighted_sum % 11)`, where digit `i` of the base
/// carries weight `11 - (i + 1)`. A result of 11 maps to 0; a result of 10
/// means the base itself is invalid and a fresh base is drawn.
pub fn generate_nhs_number<R: Rng>(rng: &mut R) -> String {
    loop {
        let mut digits = [0u32; 9];
        // Leading digit 1-9 so the number is always 10 characters long
        digits[0] = rng.random_range(1..10);
        for d in digits.iter_mut().skip(1) {
            *d = rng.random_range(0..10);
        }

        if let Some(check) = check_digit(&digits) {
            let mut result = String::with_capacity(10);
            for d in digits {
                result.push(char::from_digit(d, 10).unwrap_or('0'));
            }
            result.push(char::from_digit(check, 10).unwrap_or('0'));
            return result;
        }
        // check digit was 10: base is unusable, redraw
    }
}

/// Compute the modulus-11 check digit for a 9-digit base.
///
/// Returns `None` when the computation yields 10, which has no valid
/// single-digit representation.
fn check_digit(base: &[u32; 9]) -> Option<u32> {
    let weighted_sum: u32 = base
        .iter()
        .enumerate()
        .map(|(i, d)| d * (11 - (i as u32 + 1)))
        .sum();

    match 11 - (weighted_sum % 11) {
        11 => Some(0),
        10 => None,
        check => Some(check),
    }
}

/// Validate a 10-digit NHS number against the modulus-11 rule.
pub fn is_valid_nhs_number(value: &str) -> bool {
    if value.len() != 10 || !value.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    let mut base = [0u32; 9];
    base.copy_from_slice(&digits[..9]);

    check_digit(&base) == Some(digits[9])
}
