//! Number token parsing.
//!
//! Integers that fit `i64` stay `i64`; positive integers that only fit
//! `u64` become `u64`; everything else (fractions, exponents, magnitude
//! overflow) is parsed as `f64`. The integer fast path accumulates the
//! magnitude directly; the `f64` path validates the token's shape first and
//! then hands the digits to the standard library, which is correctly
//! rounded.

use crate::error::{Error, Result};

/// A number token, classified by the narrowest representation it fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ParsedNumber {
    Int64(i64),
    Uint64(u64),
    Double(f64),
}

/// True for the bytes allowed to follow a number or literal token: the
/// structural characters, whitespace, and the padding byte.
const BOUNDARY: [bool; 256] = {
    let mut table = [false; 256];
    table[0x00] = true;
    table[b'{' as usize] = true;
    table[b'}' as usize] = true;
    table[b'[' as usize] = true;
    table[b']' as usize] = true;
    table[b':' as usize] = true;
    table[b',' as usize] = true;
    table[b' ' as usize] = true;
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table
};

pub(crate) fn is_token_boundary(b: u8) -> bool {
    BOUNDARY[b as usize]
}

/// Parse the number token starting at `start`. The input is padded, so
/// reading one byte past every digit is always in bounds.
pub(crate) fn parse_number(src: &[u8], start: usize) -> Result<ParsedNumber> {
    let negative = src[start] == b'-';
    let mut i = start + usize::from(negative);

    let digits_start = i;
    let mut magnitude = 0u64;
    let mut overflowed = false;
    while src[i].is_ascii_digit() {
        let (m, o1) = magnitude.overflowing_mul(10);
        let (m, o2) = m.overflowing_add(u64::from(src[i] - b'0'));
        magnitude = m;
        overflowed |= o1 | o2;
        i += 1;
    }
    let int_digits = i - digits_start;
    if int_digits == 0 {
        return Err(Error::InvalidNumber);
    }
    // Leading zeros are forbidden, "0" itself is fine.
    if int_digits > 1 && src[digits_start] == b'0' {
        return Err(Error::InvalidNumber);
    }

    let mut is_float = false;
    if src[i] == b'.' {
        is_float = true;
        i += 1;
        let frac_start = i;
        while src[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return Err(Error::InvalidNumber);
        }
    }
    if src[i] == b'e' || src[i] == b'E' {
        is_float = true;
        i += 1;
        if src[i] == b'+' || src[i] == b'-' {
            i += 1;
        }
        let exp_start = i;
        while src[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return Err(Error::InvalidNumber);
        }
    }
    if !is_token_boundary(src[i]) {
        return Err(Error::InvalidNumber);
    }

    if is_float || overflowed {
        return parse_double(&src[start..i]);
    }

    if negative {
        // i64::MIN's magnitude is i64::MAX + 1; wrapping_neg maps it back.
        if magnitude > i64::MAX as u64 + 1 {
            return parse_double(&src[start..i]);
        }
        return Ok(ParsedNumber::Int64((magnitude as i64).wrapping_neg()));
    }
    if magnitude > i64::MAX as u64 {
        return Ok(ParsedNumber::Uint64(magnitude));
    }
    Ok(ParsedNumber::Int64(magnitude as i64))
}

/// The shape was validated already, so a parse failure here means the value
/// is out of `f64`'s finite range.
fn parse_double(token: &[u8]) -> Result<ParsedNumber> {
    let text = std::str::from_utf8(token).map_err(|_| Error::InvalidNumber)?;
    let value: f64 = text.parse().map_err(|_| Error::InvalidNumber)?;
    if !value.is_finite() {
        return Err(Error::NumberOutOfRange);
    }
    Ok(ParsedNumber::Double(value))
}

#[cfg(test)]
mod tests {
    use super::{ParsedNumber, parse_number};
    use crate::error::Error;
    use rstest::rstest;

    fn parse(token: &str) -> Result<ParsedNumber, Error> {
        let mut padded = token.as_bytes().to_vec();
        padded.extend_from_slice(&[0; 8]);
        parse_number(&padded, 0)
    }

    #[rstest]
    #[case("0", 0)]
    #[case("-0", 0)]
    #[case("42", 42)]
    #[case("-17", -17)]
    #[case("9223372036854775807", i64::MAX)]
    #[case("-9223372036854775808", i64::MIN)]
    fn integers(#[case] token: &str, #[case] expected: i64) {
        assert_eq!(parse(token), Ok(ParsedNumber::Int64(expected)));
    }

    #[test]
    fn positive_overflow_promotes_to_u64() {
        assert_eq!(
            parse("9223372036854775808"),
            Ok(ParsedNumber::Uint64(9_223_372_036_854_775_808))
        );
        assert_eq!(
            parse("18446744073709551615"),
            Ok(ParsedNumber::Uint64(u64::MAX))
        );
    }

    #[test]
    fn u64_overflow_promotes_to_double() {
        assert_eq!(
            parse("18446744073709551616"),
            Ok(ParsedNumber::Double(18_446_744_073_709_551_616.0))
        );
        assert_eq!(
            parse("-9223372036854775809"),
            Ok(ParsedNumber::Double(-9_223_372_036_854_775_809.0))
        );
    }

    #[rstest]
    #[case("1.5", 1.5)]
    #[case("-0.25", -0.25)]
    #[case("1e3", 1000.0)]
    #[case("2.5E-1", 0.25)]
    #[case("1e+2", 100.0)]
    #[case("0.0", 0.0)]
    fn doubles(#[case] token: &str, #[case] expected: f64) {
        assert_eq!(parse(token), Ok(ParsedNumber::Double(expected)));
    }

    #[rstest]
    #[case("01")]
    #[case("-01")]
    #[case("-")]
    #[case("1.")]
    #[case(".5")]
    #[case("1e")]
    #[case("1e+")]
    #[case("1x")]
    #[case("1.2.3")]
    #[case("+1")]
    fn malformed(#[case] token: &str) {
        assert_eq!(parse(token), Err(Error::InvalidNumber));
    }

    #[test]
    fn huge_exponent_is_out_of_range() {
        assert_eq!(parse("1e400"), Err(Error::NumberOutOfRange));
        assert_eq!(parse("-1e999"), Err(Error::NumberOutOfRange));
    }

    #[test]
    fn tiny_values_underflow_to_zero() {
        assert_eq!(parse("1e-999"), Ok(ParsedNumber::Double(0.0)));
    }

    #[test]
    fn boundary_byte_terminates() {
        let padded = b"42,7]\0\0\0\0".to_vec();
        assert_eq!(parse_number(&padded, 0), Ok(ParsedNumber::Int64(42)));
        assert_eq!(parse_number(&padded, 3), Ok(ParsedNumber::Int64(7)));
    }
}
