use fle_envelope::{Aead256CbcHmac, IvStrategy, ProtectedDataEncryptionKey};

fn aead_with_key(seed: u8) -> Aead256CbcHmac {
    let raw_dek = [seed; 32];
    Aead256CbcHmac::new(ProtectedDataEncryptionKey::derive(&raw_dek))
}

#[test]
fn roundtrip_randomized() {
    let aead = aead_with_key(1);
    let plaintext = b"hello field-level encryption";
    let ct = aead.encrypt(plaintext, IvStrategy::Random).unwrap();
    let pt = aead.decrypt(&ct).unwrap();
    assert_eq!(&pt, plaintext);
}

#[test]
fn roundtrip_deterministic() {
    let aead = aead_with_key(2);
    let plaintext = b"a@example.com";
    let ct = aead.encrypt(plaintext, IvStrategy::DeterministicFromMac).unwrap();
    let pt = aead.decrypt(&ct).unwrap();
    assert_eq!(&pt, plaintext);
}

#[test]
fn roundtrip_empty_plaintext() {
    let aead = aead_with_key(3);
    let ct = aead.encrypt(b"", IvStrategy::Random).unwrap();
    let pt = aead.decrypt(&ct).unwrap();
    assert_eq!(pt, b"");
}

#[test]
fn roundtrip_large_plaintext() {
    let aead = aead_with_key(4);
    let plaintext = vec![0xABu8; 65536];
    let ct = aead.encrypt(&plaintext, IvStrategy::Random).unwrap();
    let pt = aead.decrypt(&ct).unwrap();
    assert_eq!(pt, plaintext);
}

#[test]
fn deterministic_mode_is_stable_across_calls() {
    let aead = aead_with_key(5);
    let ct1 = aead.encrypt(b"same input", IvStrategy::DeterministicFromMac).unwrap();
    let ct2 = aead.encrypt(b"same input", IvStrategy::DeterministicFromMac).unwrap();
    assert_eq!(ct1, ct2);
}

#[test]
fn randomized_mode_varies_across_calls() {
    let aead = aead_with_key(6);
    let ct1 = aead.encrypt(b"same input", IvStrategy::Random).unwrap();
    let ct2 = aead.encrypt(b"same input", IvStrategy::Random).unwrap();
    assert_ne!(ct1, ct2);
}

#[test]
fn tampered_ciphertext_fails_integrity() {
    let aead = aead_with_key(7);
    let mut ct = aead.encrypt(b"sensitive", IvStrategy::Random).unwrap();
    let last = ct.len() - 1;
    ct[last] ^= 0xFF;
    assert!(aead.decrypt(&ct).is_err());
}

#[test]
fn truncated_ciphertext_fails_integrity() {
    let aead = aead_with_key(8);
    let ct = aead.encrypt(b"sensitive", IvStrategy::Random).unwrap();
    let truncated = &ct[..ct.len() - 5];
    assert!(aead.decrypt(truncated).is_err());
}

#[test]
fn wrong_key_fails_integrity() {
    let aead_a = aead_with_key(9);
    let aead_b = aead_with_key(10);
    let ct = aead_a.encrypt(b"sensitive", IvStrategy::Random).unwrap();
    assert!(aead_b.decrypt(&ct).is_err());
}
