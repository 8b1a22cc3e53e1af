use crate::error::{LedgerError, Result};
use crate::utils::{ecdsa_p256_public_key, hex_decode, hex_encode, new_key_pair};
use std::fmt;
use zeroize::Zeroizing;

/// Length of an uncompressed P-256 point: 0x04 || X || Y
pub const PUBLIC_KEY_LEN: usize = 65;

/// An uncompressed P-256 public key. Its lowercase hex form is the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
            return Err(LedgerError::Crypto(format!(
                "expected a {PUBLIC_KEY_LEN}-byte uncompressed point, got {} bytes",
                bytes.len()
            )));
        }
        Ok(PublicKey {
            bytes: bytes.to_vec(),
        })
    }

    /// Parses an address back into its point
    pub fn from_address(address: &str) -> Result<PublicKey> {
        let bytes = hex_decode(address)
            .map_err(|e| LedgerError::Crypto(format!("invalid address {address}: {e}")))?;
        PublicKey::from_bytes(&bytes)
    }

    pub fn to_address(&self) -> String {
        hex_encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

/// A signing key held as PKCS#8 plus its public point.
///
/// The PKCS#8 buffer is wiped on drop.
#[derive(Clone)]
pub struct KeyPair {
    pkcs8: Zeroizing<Vec<u8>>,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let pkcs8 = new_key_pair()?;
        KeyPair::from_pkcs8(&pkcs8)
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<KeyPair> {
        let public_key = PublicKey::from_bytes(&ecdsa_p256_public_key(pkcs8)?)?;
        Ok(KeyPair {
            pkcs8: Zeroizing::new(pkcs8.to_vec()),
            public_key,
        })
    }

    /// Reads the hex text stored in a key file
    pub fn from_pkcs8_hex(text: &str) -> Result<KeyPair> {
        let pkcs8 = Zeroizing::new(
            hex_decode(text.trim())
                .map_err(|e| LedgerError::KeyStore(format!("key material is not hex: {e}")))?,
        );
        KeyPair::from_pkcs8(&pkcs8)
            .map_err(|e| LedgerError::KeyStore(format!("key material is not a P-256 key: {e}")))
    }

    pub fn to_pkcs8_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex_encode(&self.pkcs8))
    }

    pub fn get_public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn get_address(&self) -> String {
        self.public_key.to_address()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}
