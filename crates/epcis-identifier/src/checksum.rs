//! GS1 check digit / check character algorithms (spec.md §4.4).

/// The standard GS1 mod-10 check digit over a numeric key (GTIN, GLN, SSCC,
/// GRAI, GDTI and similar N13/N14 keys all share this algorithm). `digits`
/// is the key *without* its check digit; weights alternate 3/1 starting
/// from the rightmost digit, which sits immediately left of the check
/// digit.
pub fn mod10_check_digit(digits: &str) -> Option<char> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = digits
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap();
            if i % 2 == 0 {
                d * 3
            } else {
                d
            }
        })
        .sum();
    let check = (10 - (sum % 10)) % 10;
    std::char::from_digit(check, 10)
}

/// Alphanumeric check character table used by GS1's mod 1036/37-36 scheme
/// for alphanumeric keys (GIAI, CPI serials that carry an optional check
/// character). Index is the character's value 0-9/A-Z, weight alternates
/// 1/3 like the numeric scheme but over base-36 values.
const BASE36_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn base36_value(c: char) -> Option<u32> {
    let upper = c.to_ascii_uppercase();
    BASE36_ALPHABET.iter().position(|&b| b as char == upper).map(|p| p as u32)
}

/// Computes the mod-37-36 check character for an alphanumeric GS1 key
/// (spec.md §4.4). Returns `None` if any character falls outside the
/// GS1 AI encodable character set (`0-9A-Z` once uppercased, plus the
/// handful of symbols GS1 assigns values 36-43 — unsupported here since
/// none of the schemes this converter handles use them).
pub fn mod_37_36_check_char(value: &str) -> Option<char> {
    if value.is_empty() {
        return None;
    }
    let mut sum: u32 = 36;
    for c in value.chars() {
        let v = base36_value(c)?;
        sum = (sum + v) % 36;
        if sum == 0 {
            sum = 36;
        }
        sum *= 2;
        sum %= 37;
    }
    let check = (37 - sum) % 37;
    let check = if check == 0 { 36 } else { check };
    Some(BASE36_ALPHABET[(check % 36) as usize] as char)
}
