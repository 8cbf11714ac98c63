// ============================================================================
// PI-PAYMENTS - StrKey Encoding/Decoding
// ============================================================================
// Pi uses Stellar's "StrKey" format for wallet credentials:
// base32(version byte + 32 key bytes + CRC16 checksum), no padding.
//
// Public account ids start with 'G', private seeds start with 'S'.
// Both are always exactly 56 characters long.
// ============================================================================

use crate::error::PaymentError;
use crate::Result;

/// Version byte for G... account ids (6 << 3)
const VERSION_ACCOUNT_ID: u8 = 48;

/// Version byte for S... private seeds (18 << 3)
const VERSION_SEED: u8 = 144;

/// Encoded length of any StrKey credential.
pub const STRKEY_LEN: usize = 56;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Encode raw Ed25519 public key bytes as a G... account id.
pub fn encode_public_key(key_bytes: &[u8; 32]) -> String {
    encode(VERSION_ACCOUNT_ID, key_bytes)
}

/// Decode a G... account id to raw Ed25519 public key bytes.
pub fn decode_public_key(address: &str) -> Result<[u8; 32]> {
    decode(VERSION_ACCOUNT_ID, 'G', address)
        .map_err(|reason| PaymentError::InvalidAddress(format!("{}: {}", address, reason)))
}

/// Encode raw Ed25519 secret key bytes as an S... private seed.
pub fn encode_secret_seed(seed_bytes: &[u8; 32]) -> String {
    encode(VERSION_SEED, seed_bytes)
}

/// Decode an S... private seed to raw Ed25519 secret key bytes.
///
/// The seed must start with 'S', be exactly 56 characters, and carry a
/// valid checksum. Any other shape is an `InvalidSeedFormat` error.
pub fn decode_secret_seed(seed: &str) -> Result<[u8; 32]> {
    decode(VERSION_SEED, 'S', seed).map_err(PaymentError::InvalidSeedFormat)
}

// ============================================================================
// CODEC
// ============================================================================

fn encode(version: u8, key_bytes: &[u8; 32]) -> String {
    // payload: version byte + key + little-endian CRC16 over the first 33 bytes
    let mut payload = Vec::with_capacity(35);
    payload.push(version);
    payload.extend_from_slice(key_bytes);

    let checksum = crc16(&payload);
    payload.push((checksum & 0xFF) as u8);
    payload.push((checksum >> 8) as u8);

    base32_encode(&payload)
}

fn decode(version: u8, sentinel: char, encoded: &str) -> std::result::Result<[u8; 32], String> {
    if !encoded.starts_with(sentinel) {
        return Err(format!("must start with '{}'", sentinel));
    }
    if encoded.len() != STRKEY_LEN {
        return Err(format!("expected {} characters, got {}", STRKEY_LEN, encoded.len()));
    }

    let decoded = base32_decode(encoded)?;
    if decoded.len() != 35 {
        return Err("invalid decoded length".to_string());
    }
    if decoded[0] != version {
        return Err("invalid version byte".to_string());
    }

    let stored_checksum = (decoded[33] as u16) | ((decoded[34] as u16) << 8);
    if stored_checksum != crc16(&decoded[0..33]) {
        return Err("checksum mismatch".to_string());
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded[1..33]);
    Ok(key_bytes)
}

// ============================================================================
// BASE32 (RFC 4648 alphabet, no padding)
// ============================================================================

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

fn base32_encode(data: &[u8]) -> String {
    let mut result = String::new();
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            result.push(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        result.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }

    result
}

fn base32_decode(encoded: &str) -> std::result::Result<Vec<u8>, String> {
    let mut result = Vec::new();
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for c in encoded.chars() {
        let value = match c {
            'A'..='Z' => (c as u8) - b'A',
            '2'..='7' => (c as u8) - b'2' + 26,
            _ => return Err(format!("invalid base32 character '{}'", c)),
        };
        buffer = (buffer << 5) | (value as u64);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            result.push(((buffer >> bits) & 0xFF) as u8);
        }
    }

    Ok(result)
}

// ============================================================================
// CRC16-CCITT (XModem variant)
// ============================================================================

fn crc16(data: &[u8]) -> u16 {
    const POLY: u16 = 0x1021;
    let mut crc: u16 = 0;

    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_roundtrip() {
        let key = [7u8; 32];
        let address = encode_public_key(&key);
        assert!(address.starts_with('G'));
        assert_eq!(address.len(), STRKEY_LEN);
        assert_eq!(decode_public_key(&address).unwrap(), key);
    }

    #[test]
    fn test_secret_seed_roundtrip() {
        let secret = [42u8; 32];
        let seed = encode_secret_seed(&secret);
        assert!(seed.starts_with('S'));
        assert_eq!(seed.len(), STRKEY_LEN);
        assert_eq!(decode_secret_seed(&seed).unwrap(), secret);
    }

    #[test]
    fn test_seed_wrong_sentinel() {
        // A valid account id is not a valid seed
        let address = encode_public_key(&[1u8; 32]);
        let err = decode_secret_seed(&address).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSeedFormat(_)));
    }

    #[test]
    fn test_seed_wrong_length() {
        assert!(matches!(
            decode_secret_seed("SABC"),
            Err(PaymentError::InvalidSeedFormat(_))
        ));
        let long = format!("{}AA", encode_secret_seed(&[3u8; 32]));
        assert!(decode_secret_seed(&long).is_err());
    }

    #[test]
    fn test_seed_lowercase_rejected() {
        let seed = encode_secret_seed(&[9u8; 32]).to_lowercase();
        assert!(decode_secret_seed(&seed).is_err());
    }

    #[test]
    fn test_seed_corrupted_checksum() {
        let mut seed: Vec<char> = encode_secret_seed(&[5u8; 32]).chars().collect();
        // Flip one character in the key portion
        let i = 10;
        seed[i] = if seed[i] == 'A' { 'B' } else { 'A' };
        let corrupted: String = seed.into_iter().collect();
        assert!(decode_secret_seed(&corrupted).is_err());
    }

    #[test]
    fn test_address_format() {
        let address = encode_public_key(&[0u8; 32]);
        assert!(address.starts_with('G'));
        assert_eq!(address.len(), STRKEY_LEN);
        assert!(address
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_invalid_address() {
        assert!(decode_public_key("GAAAA").is_err());
        let seed = encode_secret_seed(&[1u8; 32]);
        assert!(decode_public_key(&seed).is_err());
    }
}
