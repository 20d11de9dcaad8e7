use shroud_vault::prelude::*;

/// Work factor low enough to keep the suite fast.
pub const TEST_PARAMS: KdfParams = KdfParams::new(64);

/// Builds a cipher from `secret` with a fixed salt.
/// # Panics
/// * If the cipher cannot be built.
#[must_use]
pub fn cipher(secret: &str) -> Cipher {
    Cipher::builder()
        .derive(secret, "dGVzdC1zYWx0LTE2Ynl0ZQ==", TEST_PARAMS)
        .unwrap()
        .build()
        .expect("Cipher setup failed")
}
