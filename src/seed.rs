/// Seeds live in [0, 2^31-2]; Flux rejects anything wider.
const SEED_MODULUS: u64 = (1 << 31) - 1;

/// Prime stride keeping adjacent indices visually decorrelated while the set
/// as a whole stays a reproducible family.
const ITEM_SEED_STRIDE: u64 = 137;

/// Base seed for a whole request: character-code sum of
/// `"{prompt}-{style}-{timestamp}"` reduced mod 2^31-1. No randomness.
pub fn derive_base_seed(prompt: &str, style: &str, timestamp: i64) -> u32 {
    let identity = format!("{prompt}-{style}-{timestamp}");
    let sum = identity
        .chars()
        .fold(0u64, |acc, c| (acc + c as u64) % SEED_MODULUS);
    sum as u32
}

/// Seed for one item of the set.
pub fn derive_item_seed(base_seed: u32, index: usize) -> u32 {
    ((base_seed as u64 + index as u64 * ITEM_SEED_STRIDE) % SEED_MODULUS) as u32
}
