//! SimHash fingerprints for chunk text.
//!
//! A [`SimHashGenerator`] hashes every feature produced by its
//! [`FeatureSet`] with FNV-1a 64 and takes a weighted majority vote per bit:
//! a set bit adds the feature weight to that bit's accumulator, a clear bit
//! subtracts it. The fingerprint has a 1 wherever the accumulator ended up
//! strictly positive. Texts that share most of their features therefore
//! differ in few bits, which is what [`hamming_distance`] measures.
//!
//! FNV-1a is implemented here rather than taken from `std` because
//! `DefaultHasher` output is not stable across releases; persisted indexes
//! must keep matching fingerprints computed later.

use std::hash::Hasher;

use crate::features::FeatureSet;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit FNV-1a hasher.
pub struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    pub fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= u64::from(b);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// FNV-1a 64 of a byte string.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hasher = Fnv1a64::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Number of differing bits between two fingerprints.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Computes 64-bit SimHash fingerprints with a bound feature extractor.
pub struct SimHashGenerator {
    feature_set: Box<dyn FeatureSet>,
}

impl SimHashGenerator {
    pub fn new(feature_set: Box<dyn FeatureSet>) -> Self {
        Self { feature_set }
    }

    pub fn hash(&self, text: &str) -> u64 {
        let mut acc = [0i64; 64];

        for feature in self.feature_set.features(text) {
            let h = fnv1a64(&feature.text);
            let w = i64::from(feature.weight);
            for (i, slot) in acc.iter_mut().enumerate() {
                if (h >> i) & 1 == 1 {
                    *slot += w;
                } else {
                    *slot -= w;
                }
            }
        }

        acc.iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .fold(0u64, |fp, (i, _)| fp | (1u64 << i))
    }

    /// Hash raw chunk bytes; invalid UTF-8 is replaced, never rejected.
    pub fn hash_bytes(&self, data: &[u8]) -> u64 {
        self.hash(&String::from_utf8_lossy(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureConfig, NgramFeatureSet, WordFeatureSet};

    fn word_gen() -> SimHashGenerator {
        SimHashGenerator::new(Box::new(WordFeatureSet::new()))
    }

    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(fnv1a64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn hamming_identical_is_zero() {
        assert_eq!(hamming_distance(0b101010, 0b101010), 0);
        assert_eq!(hamming_distance(u64::MAX, u64::MAX), 0);
    }

    #[test]
    fn hamming_known_values() {
        assert_eq!(hamming_distance(0b101010, 0b010101), 6);
        assert_eq!(
            hamming_distance(0b1010101010101010, 0b0101010101010101),
            16
        );
        assert_eq!(hamming_distance(0, u64::MAX), 64);
    }

    #[test]
    fn hamming_is_symmetric() {
        let pairs = [(1u64, 7u64), (0xdead_beef, 0xfeed_face), (0, 12345)];
        for (a, b) in pairs {
            assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
        }
    }

    #[test]
    fn empty_text_hashes_to_zero() {
        assert_eq!(word_gen().hash(""), 0);
        assert_eq!(word_gen().hash("  ,,, !!"), 0);
    }

    #[test]
    fn single_feature_equals_its_fnv_hash() {
        // One feature of weight 1: every accumulator is ±1, so the vote
        // reproduces the feature hash exactly.
        assert_eq!(word_gen().hash("hello"), fnv1a64(b"hello"));
    }

    #[test]
    fn non_zero_for_ordinary_text() {
        assert_ne!(word_gen().hash("Hello world"), 0);
        let ngram = SimHashGenerator::new(Box::new(NgramFeatureSet::new(3, 1)));
        assert_ne!(ngram.hash("Hello world"), 0);
    }

    #[test]
    fn deterministic() {
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(word_gen().hash(text), word_gen().hash(text));
    }

    #[test]
    fn golden_fingerprints() {
        // Pinned so that indexes written by older builds keep matching.
        let g = word_gen();
        assert_eq!(
            g.hash("The quick brown fox jumps over the lazy dog"),
            14607312263354641902
        );
        assert_eq!(
            g.hash("The quick brown fox jumps over the lazy cat"),
            14335952792544732526
        );
    }

    #[test]
    fn golden_ngram_fingerprint_over_multibyte_text() {
        // Trigram windows cut through the accented characters; the vote runs
        // over the raw window bytes.
        let g = SimHashGenerator::new(FeatureConfig::ngram(3, 1).build());
        assert_eq!(g.hash("café naïve résumé"), 5168442531788751844);
    }

    #[test]
    fn same_feature_multiset_same_hash() {
        let g = word_gen();
        // Reordering and punctuation do not change the word multiset.
        assert_eq!(g.hash("dog lazy the"), g.hash("The, lazy... DOG!"));
    }

    #[test]
    fn different_texts_differ() {
        let g = word_gen();
        let a = g.hash("The quick brown fox jumps over the lazy dog");
        let b = g.hash("A completely different text that should produce a different hash");
        assert_ne!(a, b);
    }

    #[test]
    fn one_word_change_stays_close() {
        let g = word_gen();
        let a = g.hash("The quick brown fox jumps over the lazy dog");
        let b = g.hash("The quick brown fox jumps over the lazy cat");
        assert!(
            hamming_distance(a, b) < 32,
            "distance {} should be well under half the bits",
            hamming_distance(a, b)
        );
    }

    #[test]
    fn weights_shift_the_vote() {
        struct Weighted;
        impl FeatureSet for Weighted {
            fn features(&self, _text: &str) -> Vec<Feature> {
                vec![
                    Feature {
                        text: b"heavy".to_vec(),
                        weight: 10,
                    },
                    Feature {
                        text: b"light".to_vec(),
                        weight: 1,
                    },
                ]
            }
        }
        let g = SimHashGenerator::new(Box::new(Weighted));
        assert_eq!(g.hash("anything"), fnv1a64(b"heavy"));
    }

    #[test]
    fn hash_bytes_tolerates_invalid_utf8() {
        let g = SimHashGenerator::new(FeatureConfig::default().build());
        let data = [b'o', b'k', b' ', 0xff, 0xfe, b' ', b'x'];
        assert_eq!(g.hash_bytes(&data), g.hash_bytes(&data));
    }
}
