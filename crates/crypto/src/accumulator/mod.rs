// Path: crates/crypto/src/accumulator/mod.rs
//! The RSA accumulator engine.
//!
//! A commitment to a set of primes: `A = g^(p1 * p2 * ... * pk) mod N`.
//! Every operation here is a deterministic function of `(N, g, lambda,
//! inputs)`: no I/O, no hidden state. All values are normalized to
//! `[0, N)`, and the 256-byte big-endian [`RootBytes`] encoding is the only
//! representation that crosses the chain and storage boundaries.

mod primes;

pub use primes::{hash_to_prime, hash_to_prime_coprime, is_probable_prime, MAX_PRIME_ATTEMPTS};

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use zeroize::Zeroizing;

use revid_types::app::RootBytes;
use revid_types::ACCUMULATOR_BYTES;

use crate::algorithms::hash::keccak256;
use crate::error::AccumulatorError;

/// The Carmichael totient of the modulus: the trapdoor.
///
/// Knowing it allows computing modular inverses of member primes and
/// therefore O(1) removal. It lives only in gateway process memory: the
/// `Debug` impl redacts it, it is never serialized, and the hex loading path
/// zeroizes its intermediate buffers.
pub struct Trapdoor {
    lambda: BigUint,
}

impl Trapdoor {
    /// Wraps a trapdoor value. Rejects zero.
    pub fn new(lambda: BigUint) -> Result<Self, AccumulatorError> {
        if lambda.is_zero() {
            return Err(AccumulatorError::InvalidParameter(
                "trapdoor must be positive".to_string(),
            ));
        }
        Ok(Self { lambda })
    }

    /// Parses a trapdoor from hex (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, AccumulatorError> {
        let bytes = Zeroizing::new(
            revid_types::codec::decode_hex_loose(s)
                .map_err(|e| AccumulatorError::InvalidParameter(e.to_string()))?,
        );
        Self::new(BigUint::from_bytes_be(&bytes))
    }

    /// True if `value` has a modular inverse under this trapdoor.
    pub fn is_coprime(&self, value: &BigUint) -> bool {
        value.gcd(&self.lambda).is_one()
    }
}

impl core::fmt::Debug for Trapdoor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Trapdoor(<redacted>)")
    }
}

/// The public accumulator parameters `(N, g)`.
///
/// Immutable once loaded; all engine operations hang off this struct.
#[derive(Clone, Debug)]
pub struct RsaParams {
    modulus: BigUint,
    generator: BigUint,
}

impl RsaParams {
    /// Builds a parameter set, validating basic well-formedness.
    pub fn new(modulus: BigUint, generator: BigUint) -> Result<Self, AccumulatorError> {
        if modulus <= BigUint::from(3u32) {
            return Err(AccumulatorError::InvalidParameter(
                "modulus must exceed 3".to_string(),
            ));
        }
        if generator < BigUint::from(2u32) || generator >= modulus {
            return Err(AccumulatorError::InvalidParameter(
                "generator must lie in [2, N)".to_string(),
            ));
        }
        Ok(Self { modulus, generator })
    }

    /// Parses parameters from hex strings (with or without `0x`).
    pub fn from_hex(modulus_hex: &str, generator_hex: &str) -> Result<Self, AccumulatorError> {
        let n = revid_types::codec::decode_hex_loose(modulus_hex)
            .map_err(|e| AccumulatorError::InvalidParameter(format!("modulus: {e}")))?;
        let g = revid_types::codec::decode_hex_loose(generator_hex)
            .map_err(|e| AccumulatorError::InvalidParameter(format!("generator: {e}")))?;
        Self::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&g))
    }

    /// The modulus `N`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The generator `g`, which is also the empty-set accumulator.
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    fn check_element(&self, name: &str, value: &BigUint) -> Result<(), AccumulatorError> {
        if value.is_zero() || *value >= self.modulus {
            return Err(AccumulatorError::InvalidParameter(format!(
                "{name} must lie in (0, N)"
            )));
        }
        Ok(())
    }

    fn check_exponent(&self, name: &str, value: &BigUint) -> Result<(), AccumulatorError> {
        if *value < BigUint::from(2u32) {
            return Err(AccumulatorError::InvalidParameter(format!(
                "{name} must be at least 2"
            )));
        }
        Ok(())
    }

    /// Folds one new member into the accumulator: `A^p mod N`.
    pub fn add(&self, acc: &BigUint, prime: &BigUint) -> Result<BigUint, AccumulatorError> {
        self.check_element("accumulator", acc)?;
        self.check_exponent("prime", prime)?;
        Ok(acc.modpow(prime, &self.modulus))
    }

    /// Recomputes the accumulator for a whole set: `g^(∏ primes) mod N`.
    ///
    /// Used for cold-start reconstruction and order-independence checks.
    /// The empty set accumulates to `g`.
    pub fn recompute_root(&self, primes: &[BigUint]) -> Result<BigUint, AccumulatorError> {
        let mut acc = self.generator.clone();
        for prime in primes {
            self.check_exponent("prime", prime)?;
            acc = acc.modpow(prime, &self.modulus);
        }
        Ok(acc)
    }

    /// The membership witness for `target`: `g^(∏ primes \ {target}) mod N`.
    ///
    /// `target` must be a member of `primes`. Exactly one occurrence is
    /// excluded from the product.
    pub fn witness(
        &self,
        primes: &[BigUint],
        target: &BigUint,
    ) -> Result<BigUint, AccumulatorError> {
        if !primes.contains(target) {
            return Err(AccumulatorError::InvalidParameter(
                "target prime is not in the accumulated set".to_string(),
            ));
        }
        let mut excluded_once = false;
        let mut acc = self.generator.clone();
        for prime in primes {
            if !excluded_once && prime == target {
                excluded_once = true;
                continue;
            }
            self.check_exponent("prime", prime)?;
            acc = acc.modpow(prime, &self.modulus);
        }
        Ok(acc)
    }

    /// Membership check: `witness^prime mod N == root`.
    ///
    /// Out-of-range inputs simply fail verification; all inputs here are
    /// public, so no constant-time handling is needed.
    pub fn verify(&self, witness: &BigUint, prime: &BigUint, root: &BigUint) -> bool {
        if witness.is_zero() || *witness >= self.modulus || *prime < BigUint::from(2u32) {
            return false;
        }
        witness.modpow(prime, &self.modulus) == *root
    }

    /// Removes one member in O(1) using the trapdoor:
    /// `A^(p^-1 mod lambda) mod N`.
    ///
    /// Requires `gcd(p, lambda) == 1`. Also the witness-recomputation
    /// primitive: removing a device's own prime from the current root yields
    /// exactly that device's fresh witness.
    pub fn trapdoor_remove(
        &self,
        acc: &BigUint,
        prime: &BigUint,
        trapdoor: &Trapdoor,
    ) -> Result<BigUint, AccumulatorError> {
        self.check_element("accumulator", acc)?;
        self.check_exponent("prime", prime)?;
        let inverse = prime
            .modinv(&trapdoor.lambda)
            .ok_or(AccumulatorError::NotCoprime)?;
        Ok(acc.modpow(&inverse, &self.modulus))
    }

    /// Removes a batch of members with a single inversion and modexp:
    /// `A^((∏ P)^-1 mod lambda) mod N`.
    ///
    /// Semantically equivalent to sequential [`Self::trapdoor_remove`] calls
    /// in any order, at half the modexp count.
    pub fn trapdoor_batch_remove(
        &self,
        acc: &BigUint,
        primes: &[BigUint],
        trapdoor: &Trapdoor,
    ) -> Result<BigUint, AccumulatorError> {
        self.check_element("accumulator", acc)?;
        if primes.is_empty() {
            return Err(AccumulatorError::InvalidParameter(
                "batch removal requires at least one prime".to_string(),
            ));
        }
        let mut product = BigUint::one();
        for prime in primes {
            self.check_exponent("prime", prime)?;
            product = (product * prime) % &trapdoor.lambda;
        }
        let inverse = product
            .modinv(&trapdoor.lambda)
            .ok_or(AccumulatorError::NotCoprime)?;
        Ok(acc.modpow(&inverse, &self.modulus))
    }

    /// Updates a holder's witness after another member was added:
    /// `w^p_new mod N`.
    pub fn refresh_witness_on_add(
        &self,
        witness: &BigUint,
        new_prime: &BigUint,
    ) -> Result<BigUint, AccumulatorError> {
        self.add(witness, new_prime)
    }

    /// Updates a holder's witness after another member was removed, without
    /// the trapdoor (the Wesolowski shortcut).
    ///
    /// With Bezout coefficients `a*p_self + b*p_removed = 1`, the refreshed
    /// witness is `w^b * A_new^a mod N`. The gateway itself prefers
    /// [`Self::trapdoor_remove`] on the new root (lambda is local); this path
    /// is what witness holders without the trapdoor use.
    pub fn refresh_witness_on_remove(
        &self,
        witness: &BigUint,
        self_prime: &BigUint,
        removed_prime: &BigUint,
        new_root: &BigUint,
    ) -> Result<BigUint, AccumulatorError> {
        self.check_element("witness", witness)?;
        self.check_element("new root", new_root)?;
        self.check_exponent("self prime", self_prime)?;
        self.check_exponent("removed prime", removed_prime)?;

        let ext = BigInt::from(self_prime.clone()).extended_gcd(&BigInt::from(removed_prime.clone()));
        if !ext.gcd.is_one() {
            return Err(AccumulatorError::InvalidParameter(
                "member primes must be pairwise coprime".to_string(),
            ));
        }
        let w_part = self.modpow_signed(witness, &ext.y)?;
        let a_part = self.modpow_signed(new_root, &ext.x)?;
        Ok((w_part * a_part) % &self.modulus)
    }

    /// `base^exp mod N` for a possibly negative exponent; negative exponents
    /// go through the inverse of the base, which exists for every element of
    /// the accumulator's subgroup.
    fn modpow_signed(&self, base: &BigUint, exp: &BigInt) -> Result<BigUint, AccumulatorError> {
        if exp.sign() == Sign::Minus {
            let inverse = base
                .modinv(&self.modulus)
                .ok_or(AccumulatorError::NotCoprime)?;
            Ok(inverse.modpow(exp.magnitude(), &self.modulus))
        } else {
            Ok(base.modpow(exp.magnitude(), &self.modulus))
        }
    }

    /// Encodes an element into the fixed 256-byte big-endian wire form.
    pub fn encode_element(&self, value: &BigUint) -> Result<RootBytes, AccumulatorError> {
        self.check_element("element", value)?;
        let bytes = value.to_bytes_be();
        if bytes.len() > ACCUMULATOR_BYTES {
            return Err(AccumulatorError::InvalidParameter(
                "element exceeds the 256-byte wire width".to_string(),
            ));
        }
        let mut out = [0u8; ACCUMULATOR_BYTES];
        let start = ACCUMULATOR_BYTES - bytes.len();
        if let Some(tail) = out.get_mut(start..) {
            tail.copy_from_slice(&bytes);
        }
        Ok(RootBytes(out))
    }

    /// Decodes the wire form back into an element, enforcing `(0, N)`.
    pub fn decode_element(&self, root: &RootBytes) -> Result<BigUint, AccumulatorError> {
        let value = BigUint::from_bytes_be(&root.0);
        self.check_element("element", &value)?;
        Ok(value)
    }
}

/// Keccak-256 of a root's wire encoding, the contract's chain-link token.
pub fn commitment_hash(root: &RootBytes) -> [u8; 32] {
    keccak256(root.as_ref())
}

/// Parses a prime supplied by a caller, accepting decimal or `0x`-prefixed
/// hex. Callers normalize; the gateway only ever compares canonical values.
pub fn parse_prime(s: &str) -> Result<BigUint, AccumulatorError> {
    let trimmed = s.trim();
    let parsed = if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        BigUint::parse_bytes(hex_digits.as_bytes(), 16)
    } else {
        BigUint::parse_bytes(trimmed.as_bytes(), 10)
    };
    parsed.ok_or_else(|| {
        AccumulatorError::InvalidParameter(format!("unparseable prime '{trimmed}'"))
    })
}

#[cfg(test)]
mod tests;
