//! Exhibit label generation.
//!
//! Labels are a pure function of the zero-based input position, so the
//! mapping is total, order-preserving and collision-free.

use crate::models::NumberingStyle;

const ROMAN_TABLE: [(usize, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Label for the exhibit at zero-based `index`.
pub fn exhibit_number(index: usize, style: NumberingStyle) -> String {
    match style {
        NumberingStyle::Letters => letters(index),
        NumberingStyle::Numbers => (index + 1).to_string(),
        NumberingStyle::Roman => roman(index + 1),
    }
}

/// Labels for `count` consecutive exhibits.
pub fn exhibit_numbers(count: usize, style: NumberingStyle) -> Vec<String> {
    (0..count).map(|i| exhibit_number(i, style)).collect()
}

/// Bijective base-26: A..Z, AA..AZ, BA.., ZZ, AAA...
fn letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    // Only ASCII uppercase bytes are pushed above.
    String::from_utf8_lossy(&out).into_owned()
}

/// Greedy subtractive notation. Values above 3999 repeat M.
fn roman(mut value: usize) -> String {
    let mut out = String::new();
    for &(weight, symbol) in ROMAN_TABLE.iter() {
        while value >= weight {
            out.push_str(symbol);
            value -= weight;
        }
    }
    out
}
