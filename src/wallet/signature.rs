//! ECDSA signatures over P-256
//!
//! Signatures travel as hex of a DER-style encoding
//! `0x30 len 0x02 lenR R 0x02 lenS S`. Only low-S signatures are produced
//! or accepted.

use crate::error::{LedgerError, Result, SignatureFormatError};
use crate::utils::{ecdsa_p256_sha256_sign, ecdsa_p256_sha256_verify, hex_decode, hex_encode};
use crate::wallet::keys::{KeyPair, PublicKey};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Smallest buffer the parser will look at
pub const MIN_SIGNATURE_LEN: usize = 8;

const SCALAR_LEN: usize = 32;

const P256_ORDER: [u8; SCALAR_LEN] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x51,
];

static CURVE_ORDER: Lazy<BigUint> = Lazy::new(|| BigUint::from_bytes_be(&P256_ORDER));
static HALF_ORDER: Lazy<BigUint> = Lazy::new(|| CURVE_ORDER.clone() >> 1usize);

/// Curve order n of P-256
pub fn curve_order() -> &'static BigUint {
    &CURVE_ORDER
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

impl Signature {
    /// Both scalars must be non-zero and fit in 32 bytes.
    pub fn new(r: BigUint, s: BigUint) -> std::result::Result<Signature, SignatureFormatError> {
        if r.bits() == 0 {
            return Err(SignatureFormatError::NonPositiveR);
        }
        if s.bits() == 0 {
            return Err(SignatureFormatError::NonPositiveS);
        }
        if r.bits() > (SCALAR_LEN * 8) as u64 {
            return Err(SignatureFormatError::BogusRLength);
        }
        if s.bits() > (SCALAR_LEN * 8) as u64 {
            return Err(SignatureFormatError::BogusSLength);
        }
        Ok(Signature { r, s })
    }

    pub fn get_r(&self) -> &BigUint {
        &self.r
    }

    pub fn get_s(&self) -> &BigUint {
        &self.s
    }

    pub fn is_low_s(&self) -> bool {
        self.s <= *HALF_ORDER
    }

    /// Replaces s with n - s when s is above n/2
    pub fn normalize_s(self) -> Signature {
        if self.is_low_s() || self.s >= *CURVE_ORDER {
            return self;
        }
        Signature {
            s: CURVE_ORDER.clone() - &self.s,
            r: self.r,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let r = canonical_int(&self.r);
        let s = canonical_int(&self.s);
        // Each scalar is at most 33 bytes so every length fits in one byte
        let mut out = Vec::with_capacity(6 + r.len() + s.len());
        out.push(0x30);
        out.push((4 + r.len() + s.len()) as u8);
        out.push(0x02);
        out.push(r.len() as u8);
        out.extend_from_slice(&r);
        out.push(0x02);
        out.push(s.len() as u8);
        out.extend_from_slice(&s);
        out
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.serialize())
    }

    /// Strict parse of the DER-style encoding.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Signature, SignatureFormatError> {
        if bytes.len() < MIN_SIGNATURE_LEN {
            return Err(SignatureFormatError::TooShort);
        }
        if bytes[0] != 0x30 {
            return Err(SignatureFormatError::NoHeaderMagic);
        }

        let total = bytes[1] as usize + 2;
        if total > bytes.len() || total < MIN_SIGNATURE_LEN {
            return Err(SignatureFormatError::BadLength);
        }
        if total < bytes.len() {
            return Err(SignatureFormatError::TrailingBytes);
        }

        if bytes[2] != 0x02 {
            return Err(SignatureFormatError::NoFirstIntMarker);
        }
        let r_len = bytes[3] as usize;
        // Room must remain for the S marker, its length and one S byte
        if r_len == 0 || r_len > total - 4 - 3 {
            return Err(SignatureFormatError::BogusRLength);
        }
        let mut index = 4;
        let r = BigUint::from_bytes_be(&bytes[index..index + r_len]);
        index += r_len;

        if bytes[index] != 0x02 {
            return Err(SignatureFormatError::NoSecondIntMarker);
        }
        index += 1;
        let s_len = bytes[index] as usize;
        index += 1;
        if s_len == 0 || s_len > total - index {
            return Err(SignatureFormatError::BogusSLength);
        }
        let s = BigUint::from_bytes_be(&bytes[index..index + s_len]);
        index += s_len;

        if index != total {
            return Err(SignatureFormatError::BadFinalLength {
                parsed: index - 2,
                declared: total - 2,
            });
        }

        Signature::new(r, s)
    }

    pub fn from_hex(text: &str) -> Result<Signature> {
        let bytes = hex_decode(text).map_err(|_| SignatureFormatError::NotHex)?;
        Ok(Signature::parse(&bytes)?)
    }

    /// Checks the signature over `message` against `public_key`.
    ///
    /// Scalars outside [1, n-1] and high-S values never verify.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        if self.r >= *CURVE_ORDER || self.s >= *CURVE_ORDER {
            return false;
        }
        if !self.is_low_s() {
            return false;
        }
        let fixed = match self.to_fixed() {
            Some(fixed) => fixed,
            None => return false,
        };
        ecdsa_p256_sha256_verify(public_key.as_bytes(), &fixed, message)
    }

    fn to_fixed(&self) -> Option<Vec<u8>> {
        let mut fixed = left_pad(&self.r.to_bytes_be())?;
        fixed.extend(left_pad(&self.s.to_bytes_be())?);
        Some(fixed)
    }
}

/// Signs `message` and normalizes the result to low-S
pub fn sign(message: &[u8], key_pair: &KeyPair) -> Result<Signature> {
    let fixed = ecdsa_p256_sha256_sign(key_pair.get_pkcs8(), message)?;
    if fixed.len() != 2 * SCALAR_LEN {
        return Err(LedgerError::Crypto(format!(
            "unexpected fixed signature length {}",
            fixed.len()
        )));
    }
    let r = BigUint::from_bytes_be(&fixed[..SCALAR_LEN]);
    let s = BigUint::from_bytes_be(&fixed[SCALAR_LEN..]);
    Ok(Signature::new(r, s)?.normalize_s())
}

fn canonical_int(value: &BigUint) -> Vec<u8> {
    let mut bytes = value.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0x00);
    }
    bytes
}

fn left_pad(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() > SCALAR_LEN {
        return None;
    }
    let mut padded = vec![0u8; SCALAR_LEN - bytes.len()];
    padded.extend_from_slice(bytes);
    Some(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(bytes: &[u8]) -> SignatureFormatError {
        Signature::parse(bytes).unwrap_err()
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let key_pair = KeyPair::generate().unwrap();
        let signature = sign(b"some transaction id", &key_pair).unwrap();
        assert!(signature.is_low_s());
        assert!(signature.verify(b"some transaction id", key_pair.get_public_key()));

        let parsed = Signature::parse(&signature.serialize()).unwrap();
        assert_eq!(parsed, signature);
        assert_eq!(Signature::from_hex(&signature.to_hex()).unwrap(), signature);
    }

    #[test]
    fn test_every_bit_flip_of_message_fails() {
        let key_pair = KeyPair::generate().unwrap();
        let message = b"abc".to_vec();
        let signature = sign(&message, &key_pair).unwrap();
        for byte in 0..message.len() {
            for bit in 0..8 {
                let mut mutated = message.clone();
                mutated[byte] ^= 1 << bit;
                assert!(!signature.verify(&mutated, key_pair.get_public_key()));
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let signature = sign(b"m", &signer).unwrap();
        assert!(!signature.verify(b"m", other.get_public_key()));
    }

    #[test]
    fn test_high_s_twin_is_rejected() {
        let key_pair = KeyPair::generate().unwrap();
        let signature = sign(b"m", &key_pair).unwrap();
        let high = Signature::new(
            signature.get_r().clone(),
            curve_order().clone() - signature.get_s(),
        )
        .unwrap();
        assert!(!high.is_low_s());
        assert!(!high.verify(b"m", key_pair.get_public_key()));
        assert_eq!(high.normalize_s(), signature);
    }

    #[test]
    fn test_out_of_range_scalars_are_rejected() {
        let key_pair = KeyPair::generate().unwrap();
        let signature = sign(b"m", &key_pair).unwrap();
        let bad = Signature::new(curve_order().clone(), signature.get_s().clone()).unwrap();
        assert!(!bad.verify(b"m", key_pair.get_public_key()));
    }

    #[test]
    fn test_canonical_encoding_pads_high_bit() {
        let signature = Signature::new(BigUint::from(0x80u8), BigUint::from(1u8)).unwrap();
        assert_eq!(
            signature.serialize(),
            vec![0x30, 0x07, 0x02, 0x02, 0x00, 0x80, 0x02, 0x01, 0x01]
        );
    }

    #[test]
    fn test_parser_error_kinds() {
        assert_eq!(parse_err(&[0x30, 0x01]), SignatureFormatError::TooShort);
        assert_eq!(
            parse_err(&[0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]),
            SignatureFormatError::NoHeaderMagic
        );
        assert_eq!(
            parse_err(&[0x30, 0x10, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]),
            SignatureFormatError::BadLength
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x00]),
            SignatureFormatError::TrailingBytes
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x03, 0x01, 0x01, 0x02, 0x01, 0x01]),
            SignatureFormatError::NoFirstIntMarker
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x00, 0x01, 0x02, 0x01, 0x01]),
            SignatureFormatError::BogusRLength
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x02, 0x01, 0x02, 0x01, 0x01]),
            SignatureFormatError::BogusRLength
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x03, 0x01, 0x01]),
            SignatureFormatError::NoSecondIntMarker
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x02, 0x01]),
            SignatureFormatError::BogusSLength
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x00, 0x01]),
            SignatureFormatError::BogusSLength
        );
        assert_eq!(
            parse_err(&[0x30, 0x07, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x00]),
            SignatureFormatError::BadFinalLength {
                parsed: 6,
                declared: 7
            }
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01]),
            SignatureFormatError::NonPositiveR
        );
        assert_eq!(
            parse_err(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00]),
            SignatureFormatError::NonPositiveS
        );
    }

    #[test]
    fn test_from_hex_rejects_non_hex() {
        assert_eq!(
            Signature::from_hex("not hex"),
            Err(LedgerError::SignatureFormat(SignatureFormatError::NotHex))
        );
    }
}
