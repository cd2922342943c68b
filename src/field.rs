use std::fmt;

/// One typed value of a result-file row.
///
/// The tag is decided once by [`Field::classify`] and drives both the
/// comparison arithmetic and the text written back into chart data blocks:
/// a double-quoted token is a string, a token made only of ASCII digits is
/// an integer, anything else is a floating-point number.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Field {
    /// Classify a raw token from a result file.
    pub fn classify(token: &str) -> Field {
        if let Some(inner) = unquote(token) {
            return Field::Str(inner.to_string());
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            if token.is_empty() {
                return Field::Int(0);
            }
            // Digit runs wider than i64 still carry a numeric value.
            return match token.parse::<i64>() {
                Ok(v) => Field::Int(v),
                Err(_) => Field::Float(token.parse().unwrap_or(0.0)),
            };
        }
        match token.parse::<f64>() {
            Ok(v) => Field::Float(v),
            Err(_) => {
                tracing::debug!(token, "non-numeric token read as 0.0");
                Field::Float(0.0)
            }
        }
    }

    /// Build a string field from an unquoted label.
    pub fn label_of(label: impl Into<String>) -> Field {
        Field::Str(label.into())
    }

    /// The display text without quoting: the interior of a string, or the
    /// rendered number.
    pub fn label(&self) -> String {
        match self {
            Field::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Field::Str(_))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Field::Str(_) => 0.0,
            Field::Int(v) => *v as f64,
            Field::Float(v) => *v,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Field::Str(_) => 0,
            Field::Int(v) => *v,
            Field::Float(v) => *v as i64,
        }
    }
}

/// Missing pivot cells render as the zero element.
impl Default for Field {
    fn default() -> Self {
        Field::Int(0)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Str(s) => write!(f, "\"{}\"", s),
            Field::Int(v) => write!(f, "{}", v),
            // Debug formatting keeps the fractional part ("3.0"), so the
            // token classifies as a float again when read back.
            Field::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(token: &str) -> Option<&str> {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_tags() {
        assert_eq!(Field::classify("\"float_v\""), Field::Str("float_v".into()));
        assert_eq!(Field::classify("\"\""), Field::Str(String::new()));
        assert_eq!(Field::classify("42"), Field::Int(42));
        assert_eq!(Field::classify(""), Field::Int(0));
        assert_eq!(Field::classify("3.25"), Field::Float(3.25));
        assert_eq!(Field::classify("-7"), Field::Float(-7.0));
        assert_eq!(Field::classify("1e3"), Field::Float(1000.0));
    }

    #[test]
    fn test_lone_quote_is_not_a_string() {
        assert!(!Field::classify("\"").is_str());
    }

    #[test]
    fn test_oversized_integer_stays_numeric() {
        let field = Field::classify("123456789012345678901234567890");
        assert!(matches!(field, Field::Float(v) if v > 1e29));
    }

    #[test]
    fn test_display_keeps_tag() {
        assert_eq!(Field::Str("AVX".into()).to_string(), "\"AVX\"");
        assert_eq!(Field::Int(-3).to_string(), "-3");
        assert_eq!(Field::Float(4.0).to_string(), "4.0");
        assert_eq!(Field::default().to_string(), "0");
    }

    #[test]
    fn test_label_and_numeric_views() {
        assert_eq!(Field::Str("SSE".into()).label(), "SSE");
        assert_eq!(Field::Int(8).label(), "8");
        assert_eq!(Field::Float(2.5).as_f64(), 2.5);
        assert_eq!(Field::Float(2.9).as_i64(), 2);
        assert_eq!(Field::Str("x".into()).as_f64(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_string_roundtrip(s in "[A-Za-z0-9 ,._()/-]{0,24}") {
            let field = Field::Str(s.clone());
            prop_assert_eq!(Field::classify(&field.to_string()), Field::Str(s));
        }

        #[test]
        fn prop_integer_roundtrip(v in 0i64..i64::MAX) {
            let text = v.to_string();
            let field = Field::classify(&text);
            prop_assert_eq!(&field, &Field::Int(v));
            prop_assert_eq!(field.to_string(), text);
        }

        #[test]
        fn prop_float_roundtrip(v in -1.0e12f64..1.0e12f64) {
            let field = Field::Float(v);
            match Field::classify(&field.to_string()) {
                Field::Float(back) => prop_assert_eq!(back, v),
                other => prop_assert!(false, "reclassified as {:?}", other),
            }
        }
    }
}
