use crate::field::unquote;
use std::collections::HashMap;

/// Built-in display labels shared by every benchmark.
const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("interleavedmemorywrapper", "InterleavedMemoryWrapper Benchmark"),
    ("memio", "Load/Store Benchmark"),
    ("arithmetics", "Arithmetic Operations Benchmark"),
    (
        "arithmetics2",
        "Arithmetic Operations Benchmark (without loads/stores)",
    ),
    ("flops", "Peak Flop Benchmark"),
    ("gather", "Gathers Benchmark"),
    ("scatter", "Scatters Benchmark"),
    ("mask", "Masks Benchmark"),
    ("compare", "Compares Benchmark"),
    ("math", "Math Functions Benchmark"),
    ("dhryrock", "Dhryrock Benchmark (Integer Vectors)"),
    ("whetrock", "Whetrock Benchmark (Floating-Point Vectors)"),
    ("half L1", "⅟₂ L1"),
    ("half L2", "⅟₂ L2"),
    ("half L3", "⅟₂ L3"),
    ("4x L3", "4×L3"),
    ("-nan", "0"),
    ("nan", "0"),
    ("sse", "SSE"),
    ("sse-mnoavx", "SSE (binary ops)"),
    ("sse-mavx", "SSE (ternary ops)"),
    ("scalar", "Scalar"),
    ("scalar-mnoavx", "Scalar (binary ops)"),
    ("scalar-mavx", "Scalar (ternary ops)"),
    ("avx", "AVX"),
    ("avx-mavx", "AVX"),
    ("avx-mxop", "AVX, XOP"),
    ("avx-mfma4", "AVX, FMA4"),
    ("avx-mxop-mfma4", "AVX, XOP, FMA4"),
];

/// Maps raw benchmark, implementation and column tokens to display labels.
///
/// Lookups never fail: a token without an entry is returned unchanged.
#[derive(Debug, Clone)]
pub struct LabelTranslator {
    trans: HashMap<String, String>,
}

impl LabelTranslator {
    /// Translator holding only the built-in dictionary.
    pub fn builtin() -> Self {
        Self {
            trans: DEFAULT_LABELS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Copy of this translator with `overrides` taking precedence.
    pub fn merged<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut trans = self.trans.clone();
        for (k, v) in overrides {
            trans.insert(k.clone(), v.clone());
        }
        Self { trans }
    }

    /// Translate a single token.
    ///
    /// A quoted token is looked up by its interior and re-quoted when an
    /// entry exists, so quoted column values keep matching quoted filters.
    pub fn translate(&self, token: &str) -> String {
        if let Some(inner) = unquote(token) {
            if let Some(label) = self.trans.get(inner) {
                return format!("\"{}\"", label);
            }
        }
        self.trans
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string())
    }

    /// Translate each token independently and join with `", "`.
    pub fn translate_all<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        tokens
            .iter()
            .map(|t| self.translate(t.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for LabelTranslator {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn flops_translator() -> LabelTranslator {
        let overrides: HashMap<String, String> = [
            ("flops", "Peak-Flop Benchmark"),
            ("class", "Vc"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        LabelTranslator::builtin().merged(&overrides)
    }

    #[test]
    fn test_plain_lookup() {
        let tr = LabelTranslator::builtin();
        assert_eq!(tr.translate("sse"), "SSE");
        assert_eq!(tr.translate("half L2"), "⅟₂ L2");
        assert_eq!(tr.translate("nan"), "0");
        assert_eq!(tr.translate("float_v"), "float_v");
    }

    #[test]
    fn test_quoted_lookup_requotes() {
        let tr = LabelTranslator::builtin();
        assert_eq!(tr.translate("\"avx-mxop\""), "\"AVX, XOP\"");
        assert_eq!(tr.translate("\"unknown\""), "\"unknown\"");
    }

    #[test]
    fn test_overrides_win() {
        let tr = flops_translator();
        assert_eq!(tr.translate("flops"), "Peak-Flop Benchmark");
        assert_eq!(tr.translate("\"class\""), "\"Vc\"");
        assert_eq!(tr.translate("avx"), "AVX");
        assert_eq!(LabelTranslator::builtin().translate("flops"), "Peak Flop Benchmark");
    }

    #[test]
    fn test_sequence_joins() {
        let tr = LabelTranslator::builtin();
        assert_eq!(tr.translate_all(&["aligned", "sse"]), "aligned, SSE");
        assert_eq!(tr.translate_all::<&str>(&[]), "");
    }

    #[test]
    fn test_known_label_translates_deterministically() {
        let tr = LabelTranslator::builtin();
        assert_eq!(tr.translate("scalar-mavx"), tr.translate("scalar-mavx"));
    }

    proptest! {
        #[test]
        fn prop_unknown_is_noop(token in "[a-z]{1,8}_[a-z0-9]{1,8}") {
            let tr = LabelTranslator::builtin();
            let once = tr.translate(&token);
            prop_assert_eq!(&once, &token);
            prop_assert_eq!(tr.translate(&once), once);
        }

        #[test]
        fn prop_quoted_unknown_is_noop(token in "[a-z]{1,8}_[a-z0-9]{1,8}") {
            let tr = LabelTranslator::builtin();
            let quoted = format!("\"{}\"", token);
            prop_assert_eq!(tr.translate(&quoted), quoted);
        }
    }
}
