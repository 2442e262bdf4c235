//! Process-independent seeds derived from text

use sha2::{Digest, Sha256};

/// First 8 bytes of SHA-256 over the parts, separated by a NUL byte
pub fn stable_hash(parts: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Seed from the first `len` characters of `text`, reduced modulo 1000
pub fn prefix_seed(text: &str, len: usize) -> u64 {
    let prefix: String = text.chars().take(len).collect();
    stable_hash(&[&prefix]) % 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_across_calls() {
        assert_eq!(stable_hash(&["great movie"]), stable_hash(&["great movie"]));
        assert_ne!(stable_hash(&["a", "bc"]), stable_hash(&["ab", "c"]));
    }

    #[test]
    fn test_prefix_seed_ignores_tail() {
        let head = "x".repeat(30);
        assert_eq!(
            prefix_seed(&format!("{head} first ending"), 30),
            prefix_seed(&format!("{head} second ending"), 30)
        );
        assert!(prefix_seed("anything", 30) < 1000);
    }

    #[test]
    fn test_prefix_counts_characters() {
        // multi-byte characters must not split
        let text = "é".repeat(40);
        assert_eq!(prefix_seed(&text, 30), prefix_seed(&"é".repeat(30), 30));
    }
}
