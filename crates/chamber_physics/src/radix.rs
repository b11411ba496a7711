//! Stable LSD counting-radix sort of `u32` keys carrying `u32` payloads.
//!
//! Four 8-bit passes cover a full cell hash: O(N) per pass, no comparisons.
//! Each pass histograms one digit, prefix-sums the 256 buckets and scatters
//! keys and payloads together into a scratch buffer whose role is then
//! swapped with the input. Passes whose digit is identical for every key are
//! skipped, which is common because the top bits of a cell hash are unused.

use chamber_core::{RADIX_BUCKETS, RADIX_DIGIT_BITS, RADIX_PASSES};

const MASK: u32 = (RADIX_BUCKETS - 1) as u32;

/// Reusable scratch buffers for [`RadixSorter::sort`]
#[derive(Debug, Default)]
pub struct RadixSorter {
    keys: Vec<u32>,
    payloads: Vec<u32>,
}

impl RadixSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort `keys` ascending, permuting `payloads` alongside.
    ///
    /// Equal keys keep their relative order. Both vectors must have the same
    /// length; the scratch buffers grow to match and are kept for reuse.
    pub fn sort(&mut self, keys: &mut Vec<u32>, payloads: &mut Vec<u32>) {
        assert_eq!(keys.len(), payloads.len(), "keys and payloads must pair up");
        let n = keys.len();
        if n < 2 {
            return;
        }
        self.keys.resize(n, 0);
        self.payloads.resize(n, 0);

        let mut sums = [0usize; RADIX_BUCKETS];
        for pass in 0..RADIX_PASSES {
            let shift = pass * RADIX_DIGIT_BITS;

            sums.fill(0);
            for &key in keys.iter() {
                sums[((key >> shift) & MASK) as usize] += 1;
            }
            if sums.iter().any(|&count| count == n) {
                continue;
            }

            let mut total = 0;
            for bucket in sums.iter_mut() {
                let count = *bucket;
                *bucket = total;
                total += count;
            }

            for (&key, &payload) in keys.iter().zip(payloads.iter()) {
                let bucket = &mut sums[((key >> shift) & MASK) as usize];
                self.keys[*bucket] = key;
                self.payloads[*bucket] = payload;
                *bucket += 1;
            }

            std::mem::swap(keys, &mut self.keys);
            std::mem::swap(payloads, &mut self.payloads);
        }
    }
}

/// One-shot sort with throwaway scratch buffers
pub fn radix_sort(keys: &mut Vec<u32>, payloads: &mut Vec<u32>) {
    RadixSorter::new().sort(keys, payloads);
}
