//! Primitive literal decoding.
//!
//! Integers follow integer-literal decoding: an optional sign, then `0x`,
//! `0X` or `#` for hexadecimal, a leading `0` for octal, decimal otherwise.

use crate::error::ConversionError;
use crate::types::PrimitiveKind;
use crate::value::Value;

/// Decode `raw` as a value of `kind`. `type_name` is only used in errors.
pub(crate) fn decode(
    kind: PrimitiveKind,
    raw: &str,
    type_name: &str,
) -> Result<Value, ConversionError> {
    let fail = |reason: &str| ConversionError::new(raw, type_name, reason);

    if raw.is_empty() {
        return Err(fail("empty string is not a valid primitive value"));
    }

    match kind {
        PrimitiveKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(fail("expected exactly one character")),
            }
        }
        PrimitiveKind::Bool => {
            let trimmed = raw.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(fail("expected 'true' or 'false'"))
            }
        }
        PrimitiveKind::F32 => raw
            .trim()
            .parse::<f32>()
            .map(Value::F32)
            .map_err(|e| fail(&e.to_string())),
        PrimitiveKind::F64 => raw
            .trim()
            .parse::<f64>()
            .map(Value::F64)
            .map_err(|e| fail(&e.to_string())),
        PrimitiveKind::I8 => {
            let v = decode_integer(raw.trim()).map_err(|r| fail(&r))?;
            i8::try_from(v)
                .map(Value::I8)
                .map_err(|_| fail("out of range"))
        }
        PrimitiveKind::I16 => {
            let v = decode_integer(raw.trim()).map_err(|r| fail(&r))?;
            i16::try_from(v)
                .map(Value::I16)
                .map_err(|_| fail("out of range"))
        }
        PrimitiveKind::I32 => {
            let v = decode_integer(raw.trim()).map_err(|r| fail(&r))?;
            i32::try_from(v)
                .map(Value::I32)
                .map_err(|_| fail("out of range"))
        }
        PrimitiveKind::I64 => {
            let v = decode_integer(raw.trim()).map_err(|r| fail(&r))?;
            i64::try_from(v)
                .map(Value::I64)
                .map_err(|_| fail("out of range"))
        }
    }
}

/// Decode a signed integer literal into an `i128`.
pub(crate) fn decode_integer(literal: &str) -> Result<i128, String> {
    let (negative, unsigned) = match literal.as_bytes().first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        Some(_) => (false, literal),
        None => return Err("empty literal".to_string()),
    };

    let (radix, digits) = if let Some(rest) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'))
    {
        (16, rest)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    // from_str_radix would otherwise accept a second sign after the prefix.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("malformed integer literal '{}'", literal));
    }

    let magnitude = u64::from_str_radix(digits, radix)
        .map_err(|e| format!("{} (radix {})", e, radix))?;
    let magnitude = i128::from(magnitude);
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(raw: &str) -> i128 {
        decode_integer(raw).unwrap()
    }

    #[test]
    fn decodes_decimal_hex_and_octal() {
        assert_eq!(int("65535"), 65535);
        assert_eq!(int("0"), 0);
        assert_eq!(int("0x1F"), 31);
        assert_eq!(int("0X1f"), 31);
        assert_eq!(int("#ff"), 255);
        assert_eq!(int("010"), 8);
        assert_eq!(int("-0x10"), -16);
        assert_eq!(int("+7"), 7);
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(decode_integer("").is_err());
        assert!(decode_integer("-").is_err());
        assert!(decode_integer("0x").is_err());
        assert!(decode_integer("0x-1").is_err());
        assert!(decode_integer("+-1").is_err());
        assert!(decode_integer("09").is_err());
        assert!(decode_integer("1.5").is_err());
    }

    #[test]
    fn range_is_checked_per_kind() {
        assert_eq!(decode(PrimitiveKind::I8, "127", "i8").unwrap(), Value::I8(127));
        assert_eq!(decode(PrimitiveKind::I8, "-128", "i8").unwrap(), Value::I8(-128));
        assert!(decode(PrimitiveKind::I8, "128", "i8").is_err());
        assert_eq!(
            decode(PrimitiveKind::I64, "-9223372036854775808", "i64").unwrap(),
            Value::I64(i64::MIN)
        );
    }

    #[test]
    fn booleans_ignore_case() {
        for raw in ["true", "True", "TRUE"] {
            assert_eq!(decode(PrimitiveKind::Bool, raw, "bool").unwrap(), Value::Bool(true));
        }
        assert_eq!(decode(PrimitiveKind::Bool, "False", "bool").unwrap(), Value::Bool(false));
        assert!(decode(PrimitiveKind::Bool, "yes", "bool").is_err());
    }

    #[test]
    fn characters_need_exactly_one_code_point() {
        assert_eq!(decode(PrimitiveKind::Char, "é", "char").unwrap(), Value::Char('é'));
        assert!(decode(PrimitiveKind::Char, "ab", "char").is_err());
    }

    #[test]
    fn empty_input_always_fails() {
        for kind in [PrimitiveKind::Bool, PrimitiveKind::Char, PrimitiveKind::I32, PrimitiveKind::F64] {
            let err = decode(kind, "", kind.name()).unwrap_err();
            assert!(err.reason.contains("empty"));
        }
    }

    #[test]
    fn floats_parse_decimal() {
        assert_eq!(decode(PrimitiveKind::F64, " 2.5 ", "f64").unwrap(), Value::F64(2.5));
        assert!(decode(PrimitiveKind::F32, "abc", "f32").is_err());
    }
}
