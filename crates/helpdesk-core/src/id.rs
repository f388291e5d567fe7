//! Entity id allocation.
//!
//! Ids are `<millis base36>-<4 random base36 chars>`, e.g. `lrq3k2x0-9fzq`.
//! The allocator re-rolls on collision against ids already in use, so
//! uniqueness holds within a collection regardless of clock resolution.

use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 4;

/// Allocate an id that `taken` does not report as already in use.
pub fn allocate(now_millis: i64, taken: impl Fn(&str) -> bool) -> String {
    let mut rng = rand::thread_rng();
    let prefix = base36(u64::try_from(now_millis).unwrap_or(0));
    loop {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect();
        let candidate = format!("{prefix}-{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        tracing::trace!(candidate, "id collision, re-rolling");
    }
}

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        // value % 36 < 36, always a valid index
        #[allow(clippy::cast_possible_truncation)]
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1_705_744_800_000), "lrlwev40");
    }

    #[test]
    fn ids_have_time_prefix_and_suffix() {
        let id = allocate(36, |_| false);
        let (prefix, suffix) = id.split_once('-').expect("dash separator");
        assert_eq!(prefix, "10");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn allocation_avoids_taken_ids() {
        let seen = RefCell::new(HashSet::new());
        for _ in 0..500 {
            let id = allocate(1_000, |c| seen.borrow().contains(c));
            assert!(seen.borrow_mut().insert(id));
        }
    }
}
