// ✔️ Checksum Validator - Luhn mod-10
// Operates on a bare digit string so it is testable against known vectors

/// Check a card number against the Luhn mod-10 algorithm.
///
/// Non-digit input or a length outside [13,19] returns `false`, never an
/// error. Traverses digits right-to-left, doubles every second digit,
/// subtracts 9 when the doubled value exceeds 9, and requires the total
/// to be divisible by 10.
pub fn is_valid_luhn(digits: &str) -> bool {
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut sum: u32 = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let mut d = c.to_digit(10).unwrap_or(0);
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }

    sum % 10 == 0
}

// ============================================================================
// TESTS
// ============================================================================
