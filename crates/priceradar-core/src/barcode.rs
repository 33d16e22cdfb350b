/// Outcome of an advisory barcode check.
///
/// Submissions are never rejected on barcode shape alone; callers log
/// `Invalid` results and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeCheck {
    Valid,
    Invalid,
    UnknownScheme,
}

/// Check a barcode against its declared encoding scheme.
///
/// EAN-13, EAN-8 and UPC-A verify length and check digit; CODE128 verifies
/// printable-ASCII shape only. Scheme names are matched case-insensitively
/// with separators ignored, so `EAN13`, `ean-13` and `EAN_13` are equivalent.
#[must_use]
pub fn check(barcode: &str, barcode_type: &str) -> BarcodeCheck {
    let scheme: String = barcode_type
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_uppercase();

    let valid = match scheme.as_str() {
        "EAN13" => check_digits(barcode, 13, 1, 3),
        "EAN8" => check_digits(barcode, 8, 3, 1),
        "UPCA" => check_digits(barcode, 12, 3, 1),
        "CODE128" => !barcode.is_empty() && barcode.bytes().all(|b| (0x20..=0x7e).contains(&b)),
        _ => return BarcodeCheck::UnknownScheme,
    };

    if valid {
        BarcodeCheck::Valid
    } else {
        BarcodeCheck::Invalid
    }
}

/// Validate length and modulo-10 check digit over weighted digit positions.
fn check_digits(code: &str, length: usize, even_weight: u32, odd_weight: u32) -> bool {
    if code.len() != length {
        return false;
    }
    let Some(digits) = code
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
    else {
        return false;
    };

    let (payload, check) = digits.split_at(length - 1);
    let sum: u32 = payload
        .iter()
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                d * even_weight
            } else {
                d * odd_weight
            }
        })
        .sum();

    (10 - sum % 10) % 10 == check[0]
}
