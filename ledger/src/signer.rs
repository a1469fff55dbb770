//! secp256k1 transaction signing key.

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use zeroize::Zeroizing;

use crate::{Address, LedgerError};

/// A recoverable signature over a 32-byte prehash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id, 0 or 1.
    pub recovery_id: u8,
}

/// The operator account that signs contract calls.
///
/// The key material is zeroized on drop; `Debug` shows only the address.
pub struct LedgerSigner {
    key: SigningKey,
    address: Address,
}

impl LedgerSigner {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(private_key: &Zeroizing<String>) -> Result<Self, LedgerError> {
        let digits = private_key.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, bytes.as_mut())
            .map_err(|_| LedgerError::Signing("private key must be 32 hex-encoded bytes".into()))?;
        Self::from_bytes(bytes.as_ref())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| LedgerError::Signing(format!("invalid private key: {e}")))?;
        let public = PublicKey::from(key.verifying_key());
        let address = Address::from_public_key(public.to_encoded_point(false).as_bytes())?;
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }

    pub fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, LedgerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| LedgerError::Signing(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl std::fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
