// Path: crates/crypto/src/accumulator/tests/mod.rs
use super::*;

/// Toy parameter set used throughout: N = 209 (= 11 * 19), g = 4,
/// lambda(209) = lcm(10, 18) = 90. Small enough to check by hand, large
/// enough to exercise every code path.
fn toy_params() -> RsaParams {
    RsaParams::new(BigUint::from(209u32), BigUint::from(4u32)).unwrap()
}

fn toy_trapdoor() -> Trapdoor {
    Trapdoor::new(BigUint::from(90u32)).unwrap()
}

fn p(v: u32) -> BigUint {
    BigUint::from(v)
}

#[test]
fn test_three_device_enrollment_chain() {
    let params = toy_params();

    // Primes 13, 17, 23, each coprime to lambda = 90.
    let a1 = params.add(params.generator(), &p(13)).unwrap();
    assert_eq!(a1, p(9));
    let a2 = params.add(&a1, &p(17)).unwrap();
    assert_eq!(a2, p(169));
    let a3 = params.add(&a2, &p(23)).unwrap();
    assert_eq!(a3, p(196));

    // Witnesses at A3, checked against the hand-computed values.
    let set = vec![p(13), p(17), p(23)];
    let w13 = params.witness(&set, &p(13)).unwrap();
    assert_eq!(w13, p(180));
    assert!(params.verify(&w13, &p(13), &a3));

    let w17 = params.witness(&set, &p(17)).unwrap();
    assert_eq!(w17, p(168));
    assert!(params.verify(&w17, &p(17), &a3));

    let w23 = params.witness(&set, &p(23)).unwrap();
    assert_eq!(w23, p(169));
    assert!(params.verify(&w23, &p(23), &a3));
}

#[test]
fn test_witness_verifies_for_every_member() {
    let params = toy_params();
    let set = vec![p(7), p(13), p(17), p(23)];
    let root = params.recompute_root(&set).unwrap();
    for member in &set {
        let w = params.witness(&set, member).unwrap();
        assert!(params.verify(&w, member, &root));
    }
}

#[test]
fn test_add_is_order_independent() {
    let params = toy_params();
    let orderings: [[u32; 3]; 3] = [[13, 17, 23], [23, 13, 17], [17, 23, 13]];
    let mut roots = Vec::new();
    for ordering in orderings {
        let mut acc = params.generator().clone();
        for prime in ordering {
            acc = params.add(&acc, &p(prime)).unwrap();
        }
        roots.push(acc);
    }
    assert_eq!(roots[0], roots[1]);
    assert_eq!(roots[1], roots[2]);
    assert_eq!(
        roots[0],
        params.recompute_root(&[p(13), p(17), p(23)]).unwrap()
    );
}

#[test]
fn test_trapdoor_remove_inverts_add() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();
    let base = params.recompute_root(&[p(13), p(23)]).unwrap();
    let with_17 = params.add(&base, &p(17)).unwrap();
    let removed = params.trapdoor_remove(&with_17, &p(17), &trapdoor).unwrap();
    assert_eq!(removed, base);
}

#[test]
fn test_trapdoor_revocation_scenario() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();

    // Revoke prime 17 from A3 = 196: modinv(17, 90) = 53, 196^53 mod 209 = 168.
    let a3 = p(196);
    let a3_prime = params.trapdoor_remove(&a3, &p(17), &trapdoor).unwrap();
    assert_eq!(a3_prime, p(168));

    // Survivor 13's fresh witness is 4^23 mod 209.
    let w13 = params.witness(&[p(13), p(23)], &p(13)).unwrap();
    assert_eq!(w13, p(4).modpow(&p(23), &p(209)));
    assert!(params.verify(&w13, &p(13), &a3_prime));

    // The revoked device's old witness (168) no longer verifies:
    // 168^17 mod 209 = 196, not 168.
    assert!(!params.verify(&p(168), &p(17), &a3_prime));
}

#[test]
fn test_trapdoor_remove_rejects_non_coprime() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();
    // 3 is prime but shares a factor with lambda = 90.
    let err = params
        .trapdoor_remove(&p(196), &p(3), &trapdoor)
        .unwrap_err();
    assert!(matches!(err, AccumulatorError::NotCoprime));
}

#[test]
fn test_batch_remove_matches_sequential_in_any_order() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();
    let root = params
        .recompute_root(&[p(7), p(13), p(17), p(23)])
        .unwrap();

    let batched = params
        .trapdoor_batch_remove(&root, &[p(17), p(23)], &trapdoor)
        .unwrap();

    let step1 = params.trapdoor_remove(&root, &p(23), &trapdoor).unwrap();
    let sequential = params.trapdoor_remove(&step1, &p(17), &trapdoor).unwrap();
    assert_eq!(batched, sequential);

    let step1_rev = params.trapdoor_remove(&root, &p(17), &trapdoor).unwrap();
    let sequential_rev = params
        .trapdoor_remove(&step1_rev, &p(23), &trapdoor)
        .unwrap();
    assert_eq!(batched, sequential_rev);
    assert_eq!(batched, params.recompute_root(&[p(7), p(13)]).unwrap());
}

#[test]
fn test_refresh_witness_on_add_law() {
    let params = toy_params();
    let set = vec![p(13), p(17)];
    let old_root = params.recompute_root(&set).unwrap();
    let w13 = params.witness(&set, &p(13)).unwrap();

    let new_root = params.add(&old_root, &p(23)).unwrap();
    let w13_new = params.refresh_witness_on_add(&w13, &p(23)).unwrap();
    assert!(params.verify(&w13_new, &p(13), &new_root));
}

#[test]
fn test_refresh_witness_on_remove_bezout_matches_trapdoor() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();
    let set = vec![p(13), p(17), p(23)];
    let root = params.recompute_root(&set).unwrap();
    let w13_old = params.witness(&set, &p(13)).unwrap();

    // Revoke 17; the holder of 13 refreshes without the trapdoor.
    let new_root = params.trapdoor_remove(&root, &p(17), &trapdoor).unwrap();
    let w13_bezout = params
        .refresh_witness_on_remove(&w13_old, &p(13), &p(17), &new_root)
        .unwrap();
    assert!(params.verify(&w13_bezout, &p(13), &new_root));

    // The gateway's trapdoor recomputation yields the same witness.
    let w13_trapdoor = params.trapdoor_remove(&new_root, &p(13), &trapdoor).unwrap();
    assert_eq!(w13_bezout, w13_trapdoor);
}

#[test]
fn test_verify_rejects_out_of_range_inputs() {
    let params = toy_params();
    let root = p(196);
    assert!(!params.verify(&BigUint::zero(), &p(13), &root));
    assert!(!params.verify(&p(209), &p(13), &root));
    assert!(!params.verify(&p(180), &BigUint::one(), &root));
}

#[test]
fn test_add_validates_inputs() {
    let params = toy_params();
    assert!(matches!(
        params.add(&BigUint::zero(), &p(13)),
        Err(AccumulatorError::InvalidParameter(_))
    ));
    assert!(matches!(
        params.add(&p(250), &p(13)),
        Err(AccumulatorError::InvalidParameter(_))
    ));
    assert!(matches!(
        params.add(&p(4), &BigUint::one()),
        Err(AccumulatorError::InvalidParameter(_))
    ));
}

#[test]
fn test_element_encoding_roundtrips() {
    let params = toy_params();
    let value = p(196);
    let encoded = params.encode_element(&value).unwrap();
    assert_eq!(encoded.as_ref().len(), ACCUMULATOR_BYTES);
    // Big-endian: the value occupies the trailing bytes.
    assert_eq!(encoded.as_ref()[ACCUMULATOR_BYTES - 1], 196);
    assert!(encoded.as_ref()[..ACCUMULATOR_BYTES - 1].iter().all(|&b| b == 0));
    assert_eq!(params.decode_element(&encoded).unwrap(), value);
}

#[test]
fn test_element_decoding_enforces_range() {
    let params = toy_params();
    assert!(params.decode_element(&RootBytes::ZERO).is_err());

    let mut over = [0u8; ACCUMULATOR_BYTES];
    over[ACCUMULATOR_BYTES - 1] = 0xd2; // 210 >= N
    assert!(params.decode_element(&RootBytes(over)).is_err());
}

#[test]
fn test_commitment_hash_is_keccak_of_encoding() {
    let params = toy_params();
    let encoded = params.encode_element(&p(196)).unwrap();
    assert_eq!(
        commitment_hash(&encoded),
        crate::algorithms::hash::keccak256(encoded.as_ref())
    );
}

#[test]
fn test_parse_prime_accepts_decimal_and_hex() {
    assert_eq!(parse_prime("23").unwrap(), p(23));
    assert_eq!(parse_prime("0x17").unwrap(), p(23));
    assert_eq!(parse_prime(" 13 ").unwrap(), p(13));
    assert!(parse_prime("not-a-number").is_err());
    assert!(parse_prime("-5").is_err());
}

#[test]
fn test_hash_to_prime_feeds_the_engine() {
    let params = toy_params();
    let trapdoor = toy_trapdoor();
    let prime = hash_to_prime_coprime(b"sensor-board-rev-b", &trapdoor).unwrap();
    assert!(trapdoor.is_coprime(&prime));

    let root = params.add(params.generator(), &prime).unwrap();
    // The enrolling device's first witness is the pre-add accumulator.
    assert!(params.verify(params.generator(), &prime, &root));
}
