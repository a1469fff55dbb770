use proptest::prelude::*;

use votekiosk_crypto::{hash_vote, verify_vote};
use votekiosk_types::{CandidateId, Salt};

proptest! {
    /// Every commitment opens with the candidate and salt it was made from.
    #[test]
    fn commitment_opens(candidate in any::<u32>(), bytes in prop::array::uniform16(any::<u8>())) {
        let salt = Salt::from_bytes(&bytes).unwrap();
        let hash = hash_vote(CandidateId::new(candidate), &salt);
        prop_assert!(verify_vote(&hash, CandidateId::new(candidate), &salt));
    }

    /// A different candidate never opens someone else's commitment.
    #[test]
    fn altered_candidate_rejected(
        candidate in any::<u32>(),
        other in any::<u32>(),
        bytes in prop::array::uniform16(any::<u8>()),
    ) {
        prop_assume!(candidate != other);
        let salt = Salt::from_bytes(&bytes).unwrap();
        let hash = hash_vote(CandidateId::new(candidate), &salt);
        prop_assert!(!verify_vote(&hash, CandidateId::new(other), &salt));
    }

    /// A different salt never opens the commitment.
    #[test]
    fn altered_salt_rejected(
        candidate in any::<u32>(),
        a in prop::array::uniform16(any::<u8>()),
        b in prop::array::uniform16(any::<u8>()),
    ) {
        prop_assume!(a != b);
        let salt_a = Salt::from_bytes(&a).unwrap();
        let salt_b = Salt::from_bytes(&b).unwrap();
        let hash = hash_vote(CandidateId::new(candidate), &salt_a);
        prop_assert!(!verify_vote(&hash, CandidateId::new(candidate), &salt_b));
    }
}
