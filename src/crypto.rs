use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;

/// Derive a stable 32-byte key from the process-wide secret. Rotating the
/// secret invalidates every stored blob.
fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Encrypt plaintext with AES-256-CBC under a fresh random IV.
/// Returns base64(IV || ciphertext).
pub fn encrypt(plaintext: &str, secret: &str) -> String {
    let key = derive_key(secret);
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut blob = iv.to_vec();
    blob.extend_from_slice(&ciphertext);
    BASE64.encode(blob)
}

/// Decrypt a blob produced by [`encrypt`]. Malformed input is an error,
/// never a panic.
pub fn decrypt(blob: &str, secret: &str) -> Result<String, String> {
    let raw = BASE64
        .decode(blob.trim())
        .map_err(|e| format!("Invalid base64: {e}"))?;
    if raw.len() <= IV_LEN {
        return Err("Ciphertext too short".to_string());
    }

    let key = derive_key(secret);
    let (iv, ciphertext) = raw.split_at(IV_LEN);

    let plaintext = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|e| format!("Invalid key or IV: {e}"))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| "Decryption failed".to_string())?;

    String::from_utf8(plaintext).map_err(|e| format!("Invalid UTF-8: {e}"))
}
