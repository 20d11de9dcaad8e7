mod fixtures;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fixtures::cipher;
use shroud_vault::prelude::*;
use shroud_vault::{IV_LEN, TAG_LEN};

#[test]
fn blob_is_base64_of_iv_ciphertext_and_tag() {
    let blob = cipher("alice").seal_bytes(b"twelve bytes").unwrap();
    let raw = STANDARD.decode(blob.as_str()).unwrap();
    assert_eq!(raw.len(), IV_LEN + 12 + TAG_LEN);
}

#[test]
fn a_different_secret_fails_authentication() {
    let blob = cipher("alice").seal_bytes(b"secret").unwrap();
    let err = cipher("mallory").open_bytes(blob.as_str()).unwrap_err();
    assert!(matches!(err, VaultError::Authentication { .. }), "got {err:?}");
}

#[test]
fn a_different_salt_fails_authentication() {
    let other = Cipher::builder()
        .derive("alice", "YW5vdGhlci1zYWx0", fixtures::TEST_PARAMS)
        .unwrap()
        .build()
        .unwrap();
    let blob = cipher("alice").seal_bytes(b"secret").unwrap();
    assert_eq!(other.open_bytes(blob.as_str()).unwrap_err().kind(), "Authentication");
}

#[test]
fn a_flipped_ciphertext_bit_fails_authentication() {
    let cipher = cipher("alice");
    let blob = cipher.seal_bytes(b"secret").unwrap();
    let mut raw = STANDARD.decode(blob.as_str()).unwrap();
    raw[IV_LEN] ^= 0x01;

    let err = cipher.open_bytes(&STANDARD.encode(raw)).unwrap_err();
    assert_eq!(err.kind(), "Authentication");
}

#[test]
fn a_truncated_blob_is_malformed() {
    let short = STANDARD.encode([0u8; IV_LEN + TAG_LEN - 1]);
    let err = cipher("alice").open_bytes(&short).unwrap_err();
    assert_eq!(err.kind(), "MalformedBlob");
}

#[test]
fn non_base64_text_is_malformed() {
    let err = cipher("alice").open_bytes("***not base64***").unwrap_err();
    assert_eq!(err.kind(), "MalformedBlob");
}

#[test]
fn empty_secret_is_rejected() {
    let err = Cipher::builder().derive("", "salt", fixtures::TEST_PARAMS).unwrap_err();
    assert_eq!(err.kind(), "InvalidConfiguration");
}

#[test]
fn zero_iterations_are_rejected() {
    let err = Cipher::builder().derive("alice", "salt", KdfParams::new(0)).unwrap_err();
    assert_eq!(err.kind(), "InvalidConfiguration");
}

#[test]
fn raw_key_and_derived_key_share_the_blob_format() {
    let a = Cipher::builder().raw_key([7u8; 32]).build().unwrap();
    let b = Cipher::builder().raw_key([7u8; 32]).build().unwrap();
    let blob = a.seal_bytes(b"shared").unwrap();
    assert_eq!(&**b.open_bytes(blob.as_str()).unwrap(), b"shared");
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn debug_output_does_not_leak_key_bytes() {
    let rendered = format!("{:?}", cipher("alice"));
    assert!(rendered.starts_with("Cipher"));
    assert!(rendered.contains("fingerprint"));
}
