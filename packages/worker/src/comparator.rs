/// Result of comparing a program's output with the expected output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch,
}

/// Exact comparison after trimming outer whitespace on both sides.
///
/// Interior whitespace is significant: `"1  2"` does not match `"1 2"`.
pub fn compare(actual: &str, expected: &str) -> Comparison {
    if actual.trim() == expected.trim() {
        Comparison::Match
    } else {
        Comparison::Mismatch
    }
}
