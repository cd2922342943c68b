use crate::field::unquote;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// Domain ordering of chart axes, in rank order.
const DEFAULT_ORDER: &[&str] = &[
    "sfloat_v",
    "float_v",
    "double_v",
    "int_v",
    "uint_v",
    "short_v",
    "ushort_v",
    "Scalar",
    "Scalar (binary ops)",
    "Scalar (ternary ops)",
    "SSE",
    "SSE (binary ops)",
    "SSE (ternary ops)",
    "AVX",
    "AVX, XOP",
    "AVX, FMA4",
    "AVX, XOP, FMA4",
    "deinterleave (index vector)",
    "deinterleave (successive)",
    "interleave (index vector)",
    "interleave (successive)",
    "normalize vectors (baseline)",
    "normalize interleaved vectors (manually)",
    "normalize interleaved vectors (index vector)",
    "normalize interleaved vectors (successive)",
    "load",
    "store",
    "load \\& store",
    "Aligned, Scalar",
    "Aligned Memory, Unaligned Instruction, Scalar",
    "Unaligned, Scalar",
    "Aligned, Scalar (binary ops)",
    "Aligned Memory, Unaligned Instruction, Scalar (binary ops)",
    "Unaligned, Scalar (binary ops)",
    "Aligned, Scalar (ternary ops)",
    "Aligned Memory, Unaligned Instruction, Scalar (ternary ops)",
    "Unaligned, Scalar (ternary ops)",
    "Aligned, SSE",
    "Aligned Memory, Unaligned Instruction, SSE",
    "Unaligned, SSE",
    "Aligned, SSE (binary ops)",
    "Aligned Memory, Unaligned Instruction, SSE (binary ops)",
    "Unaligned, SSE (binary ops)",
    "Aligned, SSE (ternary ops)",
    "Aligned Memory, Unaligned Instruction, SSE (ternary ops)",
    "Unaligned, SSE (ternary ops)",
    "Aligned, AVX",
    "Aligned Memory, Unaligned Instruction, AVX",
    "Unaligned, AVX",
    "Aligned, AVX, XOP",
    "Aligned Memory, Unaligned Instruction, AVX, XOP",
    "Unaligned, AVX, XOP",
    "Aligned, AVX, FMA4",
    "Aligned Memory, Unaligned Instruction, AVX, FMA4",
    "Unaligned, AVX, FMA4",
    "Aligned, AVX, XOP, FMA4",
    "Aligned Memory, Unaligned Instruction, AVX, XOP, FMA4",
    "Unaligned, AVX, XOP, FMA4",
    "Vc",
    "Intrinsics",
    "Assembler",
];

/// Sort key produced by [`SortOrder::rank`].
///
/// Ranked labels order first, then unranked numbers by value, then all other
/// unranked labels lexically.
#[derive(Debug, Clone)]
pub enum SortKey {
    Ranked(usize),
    Number(f64),
    Unranked(String),
}

impl SortKey {
    fn tier(&self) -> u8 {
        match self {
            SortKey::Ranked(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Unranked(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Ranked(a), SortKey::Ranked(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Unranked(a), SortKey::Unranked(b)) => a.cmp(b),
            _ => self.tier().cmp(&other.tier()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Explicit ranking of known labels.
#[derive(Debug, Clone)]
pub struct SortOrder {
    ranks: HashMap<String, usize>,
}

impl SortOrder {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (i, label) in labels.into_iter().enumerate() {
            // First occurrence wins.
            ranks.entry(label.into()).or_insert(i);
        }
        Self { ranks }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_ORDER.iter().copied())
    }

    /// Rank of a single label; surrounding quotes are ignored.
    pub fn rank(&self, value: &str) -> SortKey {
        let value = unquote(value).unwrap_or(value);
        if let Some(&i) = self.ranks.get(value) {
            return SortKey::Ranked(i);
        }
        match value.parse::<f64>() {
            Ok(number) => SortKey::Number(number),
            Err(_) => SortKey::Unranked(value.to_string()),
        }
    }

    /// Rank tuple for an ordered tuple of labels.
    pub fn ranks<S: AsRef<str>>(&self, values: &[S]) -> Vec<SortKey> {
        values.iter().map(|v| self.rank(v.as_ref())).collect()
    }

    /// Labels without a rank, reported only when they are mixed with ranked
    /// ones (the ranked list no longer covers the data).
    pub fn outdated<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let (ranked, unranked): (Vec<_>, Vec<_>) = labels
            .iter()
            .map(|l| (l.as_ref(), self.rank(l.as_ref())))
            .partition(|(_, key)| matches!(key, SortKey::Ranked(_)));
        if ranked.is_empty() {
            return Vec::new();
        }
        let mut out: Vec<String> = unranked.into_iter().map(|(l, _)| l.to_string()).collect();
        out.dedup();
        out
    }

    /// Stable sort of `items` by the rank tuple of the labels `key` yields.
    pub fn sort_by_labels<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> Vec<String>,
    {
        let labels: Vec<String> = items.iter().flat_map(|item| key(item)).collect();
        let outdated = self.outdated(&labels);
        if !outdated.is_empty() {
            warn!(
                labels = ?outdated,
                "sort order has no rank for some labels; placing them after ranked ones"
            );
        }
        items.sort_by_cached_key(|item| self.ranks(&key(item)));
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::builtin()
    }
}
