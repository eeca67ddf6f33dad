// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use host_protocol::{CIPHER_BLOCK_SIZE, DIGEST_LEN};
use sha2::{Digest, Sha256};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// Padding appended to images that are not a whole number of cipher blocks.
const PAD: u8 = 0xFF;

/// A firmware image as the bootloader stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedImage {
    /// AES-128-CBC ciphertext, zero IV
    pub body: Vec<u8>,
    /// SHA-256 of the padded plaintext
    pub digest: [u8; DIGEST_LEN],
}

impl ProtectedImage {
    /// The digest the way it travels in an update request.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Pads `plain` to the cipher block size, hashes and encrypts it.
pub fn protect(plain: &[u8], key: &[u8; 16]) -> ProtectedImage {
    let mut body = plain.to_vec();
    body.resize(plain.len().next_multiple_of(CIPHER_BLOCK_SIZE), PAD);
    let digest: [u8; DIGEST_LEN] = Sha256::digest(&body).into();

    let mut cipher = Aes128CbcEnc::new(&(*key).into(), &[0u8; CIPHER_BLOCK_SIZE].into());
    for block in body.chunks_exact_mut(CIPHER_BLOCK_SIZE) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    tracing::debug!(len = body.len(), digest = %hex::encode(digest), "image protected");
    ProtectedImage { body, digest }
}
