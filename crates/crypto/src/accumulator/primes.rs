// Path: crates/crypto/src/accumulator/primes.rs
//! Deterministic hash-to-prime.
//!
//! Maps arbitrary byte strings onto odd 256-bit primes by hashing with
//! SHA-256 and searching upward from the digest. The search is fully
//! deterministic: the same input always yields the same prime, which is what
//! lets a device re-derive its own prime from its public key.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::algorithms::hash::sha256;
use crate::error::AccumulatorError;

use super::Trapdoor;

/// Upper bound on candidates tested before `hash_to_prime` gives up.
pub const MAX_PRIME_ATTEMPTS: u32 = 10_000;

/// Fixed Miller-Rabin bases: the first 64 primes.
///
/// 64 rounds push the composite-acceptance probability below 2^-128, and
/// fixed bases keep the search deterministic across processes.
const MILLER_RABIN_BASES: [u32; 64] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293,
    307, 311,
];

/// Miller-Rabin primality test over the fixed base set.
pub fn is_probable_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    let n_minus_one = n - BigUint::one();

    // Factor n - 1 as d * 2^s with d odd.
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'bases: for base in MILLER_RABIN_BASES {
        let a = BigUint::from(base);
        if a >= *n {
            // n is small enough to compare against the base directly.
            if (n % &a).is_zero() && *n != a {
                return false;
            }
            continue;
        }
        if (n % &a).is_zero() {
            return *n == a;
        }

        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Deterministically maps `input` to an odd prime.
///
/// The SHA-256 digest of the input, with its low bit forced on, seeds an
/// incremental search in steps of two. Fails with
/// [`AccumulatorError::HashToPrimeExhausted`] if no prime is found within
/// [`MAX_PRIME_ATTEMPTS`] candidates (cryptographically unreachable for
/// honest inputs; the bound exists so malformed parameter sets cannot spin
/// forever).
pub fn hash_to_prime(input: &[u8]) -> Result<BigUint, AccumulatorError> {
    search(input, None)
}

/// Like [`hash_to_prime`], but additionally requires the prime to be coprime
/// to the trapdoor, so its modular inverse exists for O(1) removal. All
/// device primes are derived through this variant.
pub fn hash_to_prime_coprime(
    input: &[u8],
    trapdoor: &Trapdoor,
) -> Result<BigUint, AccumulatorError> {
    search(input, Some(trapdoor))
}

fn search(input: &[u8], trapdoor: Option<&Trapdoor>) -> Result<BigUint, AccumulatorError> {
    let digest = sha256(input);
    let mut candidate = BigUint::from_bytes_be(&digest) | BigUint::one();
    let step = BigUint::from(2u32);

    for _ in 0..MAX_PRIME_ATTEMPTS {
        let coprime_ok = match trapdoor {
            Some(t) => candidate.gcd(&t.lambda).is_one(),
            None => true,
        };
        if coprime_ok && is_probable_prime(&candidate) {
            return Ok(candidate);
        }
        candidate += &step;
    }
    Err(AccumulatorError::HashToPrimeExhausted {
        attempts: MAX_PRIME_ATTEMPTS,
    })
}
