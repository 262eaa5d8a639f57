//! CNPJ check digits (mod 11).

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Length of a full, unformatted CNPJ.
pub const CNPJ_LEN: usize = 14;

fn digit(values: &[u8], weights: &[u32]) -> u8 {
    let sum: u32 = values
        .iter()
        .zip(weights)
        .map(|(&d, &w)| u32::from(d) * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => (11 - r) as u8,
    }
}

/// Compute the two verifier digits for the first 12 digits of a CNPJ.
///
/// Returns `None` unless `base` is exactly 12 ASCII digits.
pub fn check_digits(base: &str) -> Option<[u8; 2]> {
    if base.len() != CNPJ_LEN - 2 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits: Vec<u8> = base.bytes().map(|b| b - b'0').collect();
    let first = digit(&digits, &FIRST_WEIGHTS);
    digits.push(first);
    let second = digit(&digits, &SECOND_WEIGHTS);
    Some([first, second])
}

/// True when `id` is 14 digits and its verifier digits are correct.
pub fn is_valid(id: &str) -> bool {
    if id.len() != CNPJ_LEN || !id.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match check_digits(&id[..CNPJ_LEN - 2]) {
        Some([a, b]) => {
            let tail = id.as_bytes();
            tail[12] == b'0' + a && tail[13] == b'0' + b
        }
        None => false,
    }
}
