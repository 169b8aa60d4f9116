#![cfg(all(feature = "es256", feature = "es384", feature = "es512"))]

use cose::{
    algorithm::{Algorithm, A128GCM, EDDSA, ES256, ES384, ES512, HMAC_256_256},
    algorithm::InvalidAlgorithm,
    ecdsa::{Es256Signer, Es384Signer, Es512Signer},
    hash::UnsupportedHash,
    header::{Headers, Label, Value},
    is_sign1_message, sign1, verify1, verify1_detached, MalformedMessage, Sign1Message, SignError,
    Signer, VerifyError,
};
use proptest::prelude::*;
use signature::rand_core::CryptoRngCore;
use std::cell::Cell;
use testresult::TestResult;

/// Counts calls and never produces a real signature.
struct CountingSigner {
    algorithm: Algorithm,
    calls: Cell<usize>,
}

impl CountingSigner {
    fn new(algorithm: Algorithm) -> Self {
        CountingSigner {
            algorithm,
            calls: Cell::new(0),
        }
    }
}

impl Signer for CountingSigner {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(
        &self,
        _rng: &mut impl CryptoRngCore,
        _digest: &[u8],
    ) -> Result<Vec<u8>, signature::Error> {
        self.calls.set(self.calls.get() + 1);
        Ok(vec![0; 64])
    }
}

#[test]
fn es512_concrete_scenario() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es512Signer::random(&mut rng);
    let verifier = signer.verifier();

    let mut headers = Headers::new();
    headers.protected.insert(Label::Algorithm, -36);

    let bytes = sign1(headers, Some(vec![0x00, 0x01]), &[], &signer, &mut rng)?;
    assert!(!bytes.is_empty());
    assert!(is_sign1_message(&bytes));

    let message = verify1(&bytes, &[], &verifier)?;
    assert_eq!(message.payload, Some(vec![0x00, 0x01]));
    assert_eq!(message.signature.as_ref().map(Vec::len), Some(132));

    let stranger = Es512Signer::random(&mut rng).verifier();
    let err = verify1(&bytes, &[], &stranger).unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)));
    assert!(err.is_bad_signature());
    Ok(())
}

#[test]
fn every_bundled_curve_round_trips() -> TestResult {
    let mut rng = rand::thread_rng();

    let es256 = Es256Signer::random(&mut rng);
    let bytes = sign1(Headers::with_algorithm(ES256), Some(b"a".to_vec()), b"x", &es256, &mut rng)?;
    verify1(&bytes, b"x", &es256.verifier())?;

    let es384 = Es384Signer::random(&mut rng);
    let bytes = sign1(Headers::with_algorithm(ES384), Some(b"b".to_vec()), b"y", &es384, &mut rng)?;
    verify1(&bytes, b"y", &es384.verifier())?;
    Ok(())
}

#[test]
fn detached_payload() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);
    let verifier = signer.verifier();

    let bytes = sign1(Headers::with_algorithm(ES256), None, &[], &signer, &mut rng)?;
    let message = verify1(&bytes, &[], &verifier)?;
    assert_eq!(message.payload, None);

    // Signed over the empty placeholder, so only the empty payload matches.
    verify1_detached(&bytes, &[], &[], &verifier)?;
    let err = verify1_detached(&bytes, b"late payload", &[], &verifier).unwrap_err();
    assert!(err.is_bad_signature());
    Ok(())
}

#[test]
fn detached_payload_supplied_out_of_band() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);
    let verifier = signer.verifier();

    let mut message = Sign1Message::new();
    message.headers.set_algorithm(ES256);
    message.payload = Some(b"content".to_vec());
    message.sign(&mut rng, &[], &signer)?;
    message.payload = None;
    let bytes = message.to_cbor()?;

    verify1_detached(&bytes, b"content", &[], &verifier)?;
    assert!(verify1(&bytes, &[], &verifier).is_err());
    Ok(())
}

#[test]
fn second_layer_algorithms_are_refused_when_signing() {
    let mut rng = rand::thread_rng();

    for alg in [HMAC_256_256, A128GCM] {
        let signer = CountingSigner::new(alg);
        let err = sign1(Headers::with_algorithm(alg), Some(vec![1]), &[], &signer, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            SignError::InvalidAlgorithm(InvalidAlgorithm::OutOfRange(_))
        ));
        assert_eq!(signer.calls.get(), 0);
    }
}

#[test]
fn second_layer_algorithms_are_refused_when_verifying() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);

    // Hand-built envelope declaring alg 5 with a signature over it.
    let mut message = Sign1Message::new();
    message.headers.protected.insert(Label::Algorithm, 5);
    message.payload = Some(vec![1]);
    message.signature = Some(vec![0; 64]);
    let bytes = message.to_cbor()?;

    let err = verify1(&bytes, &[], &signer.verifier()).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::InvalidAlgorithm(InvalidAlgorithm::OutOfRange(5))
    ));
    Ok(())
}

#[test]
fn capability_mismatch_makes_no_provider_call() {
    let mut rng = rand::thread_rng();
    let signer = CountingSigner::new(ES384);

    let err = sign1(Headers::with_algorithm(ES512), Some(vec![1]), &[], &signer, &mut rng)
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "signer of type ES384 cannot generate a signature of type ES512"
    );
    assert_eq!(signer.calls.get(), 0);
}

#[test]
fn verifier_mismatch() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);
    let bytes = sign1(Headers::with_algorithm(ES256), Some(vec![1]), &[], &signer, &mut rng)?;

    let other = Es384Signer::random(&mut rng).verifier();
    let err = verify1(&bytes, &[], &other).unwrap_err();
    assert!(matches!(err, VerifyError::AlgorithmMismatch { .. }));
    Ok(())
}

#[test]
fn alg_only_in_unprotected_is_refused() {
    let mut rng = rand::thread_rng();
    let signer = CountingSigner::new(ES256);

    let mut headers = Headers::new();
    headers.unprotected.insert(Label::Algorithm, ES256.id());

    let err = sign1(headers, Some(vec![1]), &[], &signer, &mut rng).unwrap_err();
    assert!(matches!(
        err,
        SignError::InvalidAlgorithm(InvalidAlgorithm::Unprotected)
    ));
    assert_eq!(signer.calls.get(), 0);
}

#[test]
fn eddsa_needs_a_provider_that_hashes_itself() {
    let mut rng = rand::thread_rng();
    let signer = CountingSigner::new(EDDSA);

    let err = sign1(Headers::with_algorithm(EDDSA), Some(vec![1]), &[], &signer, &mut rng)
        .unwrap_err();
    assert!(matches!(
        err,
        SignError::UnsupportedHash(UnsupportedHash::NoPrehash(_))
    ));
}

#[test]
fn other_shapes_are_not_sign1() {
    let verifier = Es256Signer::random(&mut rand::thread_rng()).verifier();

    // COSE_Mac0
    let err = verify1(&[0xd1, 0x84, 0x41, 0xa0, 0xa0, 0xf6, 0x40], &[], &verifier).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::NotASign1Message(MalformedMessage::UnexpectedTag(17))
    ));

    // An integer
    let err = verify1(&[0x01], &[], &verifier).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::NotASign1Message(MalformedMessage::NotAnArray)
    ));

    // Empty input
    assert!(matches!(
        verify1(&[], &[], &verifier),
        Err(VerifyError::NotASign1Message(_))
    ));
}

#[test]
fn unprotected_headers_survive_the_wire() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);

    let mut headers = Headers::with_algorithm(ES256);
    headers.protected.insert(Label::ContentType, "application/cbor");
    headers.unprotected.insert(Label::KeyId, b"11".to_vec());
    headers.unprotected.insert("note", Value::Array(vec![Value::Int(1), Value::Null]));

    let bytes = sign1(headers.clone(), Some(vec![1]), &[], &signer, &mut rng)?;
    let message = verify1(&bytes, &[], &signer.verifier())?;
    assert_eq!(message.headers, headers);
    Ok(())
}

#[test]
fn signing_twice_verifies_both_times() -> TestResult {
    let mut rng = rand::thread_rng();
    let signer = Es256Signer::random(&mut rng);
    let verifier = signer.verifier();

    let mut message = Sign1Message::new();
    message.headers.set_algorithm(ES256);
    message.payload = Some(b"again".to_vec());

    message.sign(&mut rng, &[], &signer)?;
    message.verify(&[], &verifier)?;
    message.sign(&mut rng, &[], &signer)?;
    message.verify(&[], &verifier)?;
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn round_trip_and_tamper(
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        aad in proptest::collection::vec(any::<u8>(), 0..16),
        flip in any::<prop::sample::Index>(),
    ) {
        let mut rng = rand::thread_rng();
        let signer = Es256Signer::random(&mut rng);
        let verifier = signer.verifier();

        let bytes = sign1(Headers::with_algorithm(ES256), Some(payload.clone()), &aad, &signer, &mut rng).unwrap();
        prop_assert!(verify1(&bytes, &aad, &verifier).is_ok());

        // Different external data
        let mut other_aad = aad.clone();
        other_aad.push(0);
        prop_assert!(verify1(&bytes, &other_aad, &verifier).unwrap_err().is_bad_signature());

        if !aad.is_empty() {
            let mut flipped = aad.clone();
            flipped[flip.index(aad.len())] ^= 0x01;
            prop_assert!(verify1(&bytes, &flipped, &verifier).unwrap_err().is_bad_signature());
        }

        // Different payload
        if !payload.is_empty() {
            let mut tampered = payload.clone();
            tampered[flip.index(payload.len())] ^= 0x01;
            prop_assert!(verify1_detached(&bytes, &tampered, &aad, &verifier).unwrap_err().is_bad_signature());
        }

        // Different protected bucket
        let mut message = Sign1Message::from_cbor(&bytes).unwrap();
        message.headers.protected.insert(Label::ContentType, 0);
        prop_assert!(message.verify(&aad, &verifier).unwrap_err().is_bad_signature());
    }
}
