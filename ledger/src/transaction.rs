//! Legacy (type 0) transactions with EIP-155 replay protection.

use votekiosk_crypto::keccak256;
use votekiosk_types::TxHash;

use crate::rlp::{encode_bytes, encode_list, encode_uint, encode_uint_bytes};
use crate::{Address, LedgerError, LedgerSigner};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: TxHash,
}

impl LegacyTransaction {
    fn common_fields(&self) -> Vec<Vec<u8>> {
        vec![
            encode_uint(self.nonce as u128),
            encode_uint(self.gas_price),
            encode_uint(self.gas_limit as u128),
            encode_bytes(self.to.as_bytes()),
            encode_uint(self.value),
            encode_bytes(&self.data),
        ]
    }

    /// RLP of the nine-field EIP-155 signing payload.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.common_fields();
        fields.push(encode_uint(self.chain_id as u128));
        fields.push(encode_uint(0));
        fields.push(encode_uint(0));
        encode_list(&fields)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    pub fn sign(&self, signer: &LedgerSigner) -> Result<SignedTransaction, LedgerError> {
        let signature = signer.sign_prehash(&self.signing_hash())?;
        let v = u128::from(signature.recovery_id) + u128::from(self.chain_id) * 2 + 35;

        let mut fields = self.common_fields();
        fields.push(encode_uint(v));
        fields.push(encode_uint_bytes(&signature.r));
        fields.push(encode_uint_bytes(&signature.s));
        let raw = encode_list(&fields);
        let hash = TxHash::new(keccak256(&raw));
        Ok(SignedTransaction { raw, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
    use zeroize::Zeroizing;

    /// The worked example from EIP-155.
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
            chain_id: 1,
        }
    }

    #[test]
    fn signing_payload_matches_eip155_example() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn signature_recovers_to_signer() {
        let signer = LedgerSigner::from_hex(&Zeroizing::new("46".repeat(32))).unwrap();
        let tx = eip155_example();
        let sig = signer.sign_prehash(&tx.signing_hash()).unwrap();

        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&sig.r);
        bytes[32..].copy_from_slice(&sig.s);
        let signature = Signature::from_slice(&bytes).unwrap();
        let recid = RecoveryId::from_byte(sig.recovery_id).unwrap();
        let recovered =
            VerifyingKey::recover_from_prehash(&tx.signing_hash(), &signature, recid).unwrap();
        assert_eq!(&recovered, signer.verifying_key());
    }

    #[test]
    fn signed_transaction_carries_eip155_v() {
        let signer = LedgerSigner::from_hex(&Zeroizing::new("46".repeat(32))).unwrap();
        let tx = eip155_example();
        let signed = tx.sign(&signer).unwrap();

        let shared_len: usize = tx.common_fields().iter().map(Vec::len).sum();
        // two-byte list prefix (0xf8, len), the six shared fields, then v
        assert_eq!(signed.raw[0], 0xf8);
        assert!(matches!(signed.raw[2 + shared_len], 0x25 | 0x26));
        assert_eq!(signed.hash, TxHash::new(keccak256(&signed.raw)));
    }
}
