// crates/claudex-assembler/src/tokens.rs
//! The token model shared by every section builder (§4.7): `ceil(len/4)`,
//! counted against a single budget that includes inter-section newlines.

/// Estimate the token cost of a rendered string.
pub fn estimate(s: &str) -> usize {
    s.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up() {
        assert_eq!(estimate(""), 0);
        assert_eq!(estimate("a"), 1);
        assert_eq!(estimate("abcd"), 1);
        assert_eq!(estimate("abcde"), 2);
    }
}
