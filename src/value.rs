use crate::error::LiteralError;
use serde::Serialize;

/// A constant attached to a field or enum constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Boolean(bool),
    /// `byte`, `short` and `int` constants.
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// A UTF-16 code unit, so lone surrogates are representable.
    Char(u16),
    String(String),
    /// A value of any other type, kept exactly as written.
    Raw(String),
}

// The only accepted spellings of the IEEE special values.
const FLOAT_SPECIALS: &[(&str, f32)] = &[
    ("(1.0f/0.0f)", f32::INFINITY),
    ("(1.0f / 0.0f)", f32::INFINITY),
    ("(-1.0f/0.0f)", f32::NEG_INFINITY),
    ("(-1.0f / 0.0f)", f32::NEG_INFINITY),
    ("(0.0f/0.0f)", f32::NAN),
    ("(0.0f / 0.0f)", f32::NAN),
];

const DOUBLE_SPECIALS: &[(&str, f64)] = &[
    ("(1.0/0.0)", f64::INFINITY),
    ("(1.0 / 0.0)", f64::INFINITY),
    ("(-1.0/0.0)", f64::NEG_INFINITY),
    ("(-1.0 / 0.0)", f64::NEG_INFINITY),
    ("(0.0/0.0)", f64::NAN),
    ("(0.0 / 0.0)", f64::NAN),
];

/// Interprets the literal written after `=` in a field declaration of type
/// `type_name`. `Ok(None)` means the field is explicitly `null`.
pub fn parse_value(type_name: &str, literal: &str) -> Result<Option<ConstantValue>, LiteralError> {
    let value = match type_name {
        "boolean" => match literal {
            "true" => ConstantValue::Boolean(true),
            "false" => ConstantValue::Boolean(false),
            _ => return Err(LiteralError::Boolean),
        },
        "byte" | "short" | "int" => ConstantValue::Int(literal.parse()?),
        "long" => {
            let digits = literal.strip_suffix(['l', 'L']).unwrap_or(literal);
            ConstantValue::Long(digits.parse()?)
        }
        "float" => match FLOAT_SPECIALS.iter().find(|(spelling, _)| *spelling == literal) {
            Some((_, special)) => ConstantValue::Float(*special),
            None => {
                let digits = literal.strip_suffix(['f', 'F']).unwrap_or(literal);
                ConstantValue::Float(digits.parse()?)
            }
        },
        "double" => match DOUBLE_SPECIALS.iter().find(|(spelling, _)| *spelling == literal) {
            Some((_, special)) => ConstantValue::Double(*special),
            None => {
                let digits = literal.strip_suffix(['d', 'D']).unwrap_or(literal);
                ConstantValue::Double(digits.parse()?)
            }
        },
        // Truncated to 16 bits like a Java `(char)` cast.
        "char" => ConstantValue::Char(literal.parse::<i32>()? as u16),
        "String" | "java.lang.String" => {
            if literal == "null" {
                return Ok(None);
            }
            let inner = literal
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .ok_or(LiteralError::UnquotedString)?;
            ConstantValue::String(unescape(inner)?)
        }
        _ if literal == "null" => return Ok(None),
        _ => ConstantValue::Raw(literal.to_string()),
    };
    Ok(Some(value))
}

/// Resolves Java escape sequences, including `\uXXXX` (surrogate pairs are
/// combined) and octal escapes.
pub fn unescape(text: &str) -> Result<String, LiteralError> {
    let mut units: Vec<u16> = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }

        let Some(escape) = chars.next() else {
            return Err(LiteralError::Escape(String::new()));
        };
        match escape {
            'b' => units.push(0x08),
            't' => units.push(u16::from(b'\t')),
            'n' => units.push(u16::from(b'\n')),
            'f' => units.push(0x0c),
            'r' => units.push(u16::from(b'\r')),
            's' => units.push(u16::from(b' ')),
            '"' | '\'' | '\\' => units.push(escape as u16),
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                let unit = (hex.len() == 4)
                    .then(|| u16::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .ok_or_else(|| LiteralError::Escape(format!("u{hex}")))?;
                units.push(unit);
            }
            '0'..='7' => {
                let mut code = escape.to_digit(8).unwrap_or_default();
                // Up to three digits, never exceeding \377.
                let max_digits = if escape <= '3' { 3 } else { 2 };
                for _ in 1..max_digits {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                units.push(code as u16);
            }
            other => return Err(LiteralError::Escape(other.to_string())),
        }
    }

    String::from_utf16(&units).map_err(|_| LiteralError::Escape("u (unpaired surrogate)".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(type_name: &str, literal: &str) -> ConstantValue {
        parse_value(type_name, literal).unwrap().unwrap()
    }

    #[test]
    fn test_booleans() {
        assert_eq!(value("boolean", "true"), ConstantValue::Boolean(true));
        assert_eq!(value("boolean", "false"), ConstantValue::Boolean(false));
        assert_eq!(parse_value("boolean", "TRUE"), Err(LiteralError::Boolean));
    }

    #[test]
    fn test_integers() {
        assert_eq!(value("int", "-1"), ConstantValue::Int(-1));
        assert_eq!(value("byte", "127"), ConstantValue::Int(127));
        assert_eq!(value("short", "-32768"), ConstantValue::Int(-32768));
        assert_eq!(value("long", "9223372036854775807L"), ConstantValue::Long(i64::MAX));
        assert_eq!(value("long", "-5l"), ConstantValue::Long(-5));
        assert!(matches!(parse_value("int", "0x10"), Err(LiteralError::Integer(_))));
        assert!(matches!(parse_value("int", "1.5"), Err(LiteralError::Integer(_))));
    }

    #[test]
    fn test_float_specials() {
        assert_eq!(value("float", "(1.0f/0.0f)"), ConstantValue::Float(f32::INFINITY));
        assert_eq!(value("float", "(-1.0f / 0.0f)"), ConstantValue::Float(f32::NEG_INFINITY));
        assert!(matches!(value("float", "(0.0f/0.0f)"), ConstantValue::Float(f) if f.is_nan()));
        assert_eq!(value("double", "(1.0 / 0.0)"), ConstantValue::Double(f64::INFINITY));
        assert_eq!(value("double", "(-1.0/0.0)"), ConstantValue::Double(f64::NEG_INFINITY));
        assert!(matches!(value("double", "(0.0 / 0.0)"), ConstantValue::Double(d) if d.is_nan()));
    }

    #[test]
    fn test_other_parenthesized_spellings_fail() {
        assert!(matches!(parse_value("float", "(2.0f/0.0f)"), Err(LiteralError::Float(_))));
        assert!(matches!(parse_value("double", "(1.0f/0.0f)"), Err(LiteralError::Float(_))));
    }

    #[test]
    fn test_plain_floats() {
        assert_eq!(value("float", "1.5f"), ConstantValue::Float(1.5));
        assert_eq!(value("float", "-0.25"), ConstantValue::Float(-0.25));
        assert_eq!(value("double", "1.0E-5"), ConstantValue::Double(1.0e-5));
        assert_eq!(value("double", "3.0d"), ConstantValue::Double(3.0));
    }

    #[test]
    fn test_chars() {
        assert_eq!(value("char", "65"), ConstantValue::Char(u16::from(b'A')));
        assert_eq!(value("char", "55296"), ConstantValue::Char(0xd800));
        assert_eq!(value("char", "57343"), ConstantValue::Char(0xdfff));
        assert_eq!(value("char", "65601"), ConstantValue::Char(0x41));
        assert!(matches!(parse_value("char", "'A'"), Err(LiteralError::Integer(_))));
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse_value("java.lang.String", "null"), Ok(None));
        assert_eq!(
            value("java.lang.String", "\"null\""),
            ConstantValue::String("null".to_string())
        );
        assert_eq!(
            value("String", r#""tab\there \"quoted\" é""#),
            ConstantValue::String("tab\there \"quoted\" é".to_string())
        );
        assert_eq!(parse_value("String", "abc"), Err(LiteralError::UnquotedString));
    }

    #[test]
    fn test_other_types() {
        assert_eq!(parse_value("android.net.Uri", "null"), Ok(None));
        assert_eq!(
            value("test.pkg.Color", "RED"),
            ConstantValue::Raw("RED".to_string())
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\\b").unwrap(), "a\\b");
        assert_eq!(unescape(r"\101\0").unwrap(), "A\0");
        assert_eq!(unescape(r"😀").unwrap(), "😀");
        assert_eq!(unescape(r"A\uuu0042").unwrap(), "AB");
        assert!(unescape(r"\q").is_err());
        assert!(unescape(r"\u12").is_err());
    }
}
