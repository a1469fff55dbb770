//! Contract ABI encoding for the election contract's methods.

use votekiosk_crypto::keccak256;

use crate::LedgerError;

pub const ADD_CANDIDATES: &str = "addCandidates(string[])";
pub const COMMIT_VOTE_FOR: &str = "commitVoteFor(bytes32,string,string)";
pub const START_REVEAL_PHASE: &str = "startRevealPhase()";
pub const REVEAL_VOTE: &str = "revealVote(bytes32,string,string)";
pub const END_ELECTION: &str = "endElection()";
pub const CHECK_IF_VOTED: &str = "checkIfVoted(string)";
pub const GET_RESULTS: &str = "getResults()";

const WORD: usize = 32;

/// A call argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Bytes32([u8; 32]),
    String(String),
    StringArray(Vec<String>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        !matches!(self, Self::Bytes32(_))
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_tokens(args));
    out
}

fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend(uint_word((head_len + tail.len()) as u64));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }
    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Bytes32(bytes) => bytes.to_vec(),
        Token::String(s) => {
            let mut out = uint_word(s.len() as u64).to_vec();
            out.extend_from_slice(s.as_bytes());
            out.resize(WORD + padded_len(s.len()), 0);
            out
        }
        Token::StringArray(items) => {
            let mut out = uint_word(items.len() as u64).to_vec();
            let inner: Vec<Token> = items.iter().cloned().map(Token::String).collect();
            out.extend(encode_tokens(&inner));
            out
        }
    }
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

// -- decoding ---------------------------------------------------------------

/// `base + extra`, or an ABI error when a reply offset overflows.
fn offset_add(base: usize, extra: usize) -> Result<usize, LedgerError> {
    base.checked_add(extra)
        .ok_or_else(|| LedgerError::Abi(format!("offset {base} + {extra} out of range")))
}

/// Offset of the `index`-th word after `base`.
fn word_after(base: usize, index: usize) -> Result<usize, LedgerError> {
    let rel = index
        .checked_mul(WORD)
        .ok_or_else(|| LedgerError::Abi(format!("word index {index} out of range")))?;
    offset_add(base, rel)
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], LedgerError> {
    data.get(offset..offset_add(offset, WORD)?)
        .ok_or_else(|| LedgerError::Abi(format!("output too short for word at {offset}")))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, LedgerError> {
    let value = read_u64(data, offset)?;
    usize::try_from(value).map_err(|_| LedgerError::Abi(format!("offset {value} out of range")))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64, LedgerError> {
    let word = word_at(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Abi("integer does not fit in 64 bits".into()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

fn read_string(data: &[u8], offset: usize) -> Result<String, LedgerError> {
    let len = read_usize(data, offset)?;
    let start = offset_add(offset, WORD)?;
    let bytes = data
        .get(start..offset_add(start, len)?)
        .ok_or_else(|| LedgerError::Abi("string runs past end of output".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| LedgerError::Abi(e.to_string()))
}

/// Decode a single `bool` return value.
pub fn decode_bool(data: &[u8]) -> Result<bool, LedgerError> {
    match read_u64(data, 0)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LedgerError::Abi(format!("invalid bool word {other}"))),
    }
}

/// Decode the `(string[], uint256[])` pair returned by `getResults()`.
pub fn decode_results(data: &[u8]) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
    let names_at = read_usize(data, 0)?;
    let counts_at = read_usize(data, WORD)?;

    let name_count = read_usize(data, names_at)?;
    let names_base = offset_add(names_at, WORD)?;
    let mut names = Vec::with_capacity(name_count.min(1024));
    for i in 0..name_count {
        let rel = read_usize(data, word_after(names_base, i)?)?;
        names.push(read_string(data, offset_add(names_base, rel)?)?);
    }

    let count_len = read_usize(data, counts_at)?;
    let mut counts = Vec::with_capacity(count_len.min(1024));
    for i in 0..count_len {
        counts.push(read_u64(data, word_after(counts_at, i + 1)?)?);
    }

    Ok((names, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("baz(uint32,bool)")), "cdcd77c0");
    }

    #[test]
    fn no_argument_call_is_selector_only() {
        assert_eq!(encode_call(START_REVEAL_PHASE, &[]).len(), 4);
    }

    #[test]
    fn string_layout() {
        let data = encode_tokens(&[Token::String("Qm123".into())]);
        assert_eq!(data.len(), 3 * WORD);
        assert_eq!(read_usize(&data, 0).unwrap(), 32);
        assert_eq!(read_string(&data, 32).unwrap(), "Qm123");
    }

    #[test]
    fn commit_call_layout() {
        let data = encode_tokens(&[
            Token::Bytes32([0xaa; 32]),
            Token::String("Qm123".into()),
            Token::String("V1".into()),
        ]);
        assert_eq!(&data[..32], &[0xaa; 32]);
        assert_eq!(read_usize(&data, 32).unwrap(), 96);
        assert_eq!(read_usize(&data, 64).unwrap(), 160);
        assert_eq!(read_string(&data, 96).unwrap(), "Qm123");
        assert_eq!(read_string(&data, 160).unwrap(), "V1");
    }

    #[test]
    fn string_array_offsets_are_relative_to_array_body() {
        let data = encode_tokens(&[Token::StringArray(vec!["1".into(), "2".into()])]);
        // head offset, then length, then two element offsets
        assert_eq!(read_usize(&data, 0).unwrap(), 32);
        assert_eq!(read_usize(&data, 32).unwrap(), 2);
        assert_eq!(read_usize(&data, 64).unwrap(), 64);
        assert_eq!(read_usize(&data, 96).unwrap(), 128);
        assert_eq!(read_string(&data, 64 + 64).unwrap(), "1");
        assert_eq!(read_string(&data, 64 + 128).unwrap(), "2");
    }

    #[test]
    fn decodes_results_pair() {
        let mut data = Vec::new();
        data.extend(uint_word(64));
        // names array: len 2 at 64, offsets, strings
        let names = encode_token(&Token::StringArray(vec!["Ada".into(), "Bob".into()]));
        data.extend(uint_word(64 + names.len() as u64));
        data.extend(names);
        data.extend(uint_word(2));
        data.extend(uint_word(5));
        data.extend(uint_word(7));

        let (names, counts) = decode_results(&data).unwrap();
        assert_eq!(names, vec!["Ada", "Bob"]);
        assert_eq!(counts, vec![5, 7]);
    }

    #[test]
    fn out_of_range_offsets_are_abi_errors() {
        let mut data = Vec::new();
        data.extend(uint_word(u64::MAX - 8));
        data.extend(uint_word(64));
        assert!(matches!(decode_results(&data), Err(LedgerError::Abi(_))));

        // a string length that would run past usize::MAX
        let mut data = Vec::new();
        data.extend(uint_word(u64::MAX));
        assert!(matches!(read_string(&data, 0), Err(LedgerError::Abi(_))));

        // a names element offset pointing far past the reply
        let mut data = Vec::new();
        data.extend(uint_word(64));
        data.extend(uint_word(64));
        data.extend(uint_word(1));
        data.extend(uint_word(u64::MAX - 40));
        assert!(matches!(decode_results(&data), Err(LedgerError::Abi(_))));
    }

    #[test]
    fn bool_and_truncation() {
        assert!(decode_bool(&uint_word(1)).unwrap());
        assert!(!decode_bool(&uint_word(0)).unwrap());
        assert!(decode_bool(&[0u8; 4]).is_err());
    }
}
