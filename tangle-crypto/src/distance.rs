//! The autopeering distance metric: `U256(sha256(salt || candidateId)) XOR
//! U256(selfId)`. Smaller is closer. Deterministic and identical on every
//! node so that two peers agree on each other's distance.

use crate::hash::digest;
use crate::identity::Identifier;
use crate::salt::Salt;
use primitive_types::U256;

/// Compute the distance of `candidate` from `subject` under `salt`.
///
/// `subject` is whoever's perspective the distance is computed from: when a
/// node ranks candidates for its own chosen-neighbor set, `subject` is the
/// node itself and `salt` is its public salt. When a node evaluates an
/// inbound request, `subject` is again the node itself but `salt` is its
/// private salt and `candidate` is the requester.
pub fn distance(subject: &Identifier, salt: &Salt, candidate: &Identifier) -> U256 {
    let mut preimage = Vec::with_capacity(salt.bytes.len() + candidate.as_ref().len());
    preimage.extend_from_slice(&salt.bytes);
    preimage.extend_from_slice(candidate.as_ref());

    let hashed = digest::<32>(&preimage);
    let candidate_component = U256::from_big_endian(hashed.as_ref());

    // subject is 20 bytes, hashed is 32: zero-extend subject into a
    // 32-byte big-endian buffer so the XOR operates on equal widths.
    let mut subject_bytes = [0u8; 32];
    subject_bytes[12..].copy_from_slice(subject.as_ref());

    candidate_component ^ U256::from_big_endian(&subject_bytes)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::hash::digest;
    use quickcheck_macros::quickcheck;
    use std::time::Duration;

    fn subject() -> Identifier {
        digest(b"fixed-subject")
    }

    fn fixed_salt() -> Salt {
        Salt {
            bytes: [9u8; 20],
            expires_at: std::time::SystemTime::now() + Duration::from_secs(60),
        }
    }

    /// Testable property 8: for a fixed `(selfId, salt)`, distance is
    /// deterministic for any candidate, however it is derived.
    #[quickcheck]
    fn distance_is_deterministic_for_arbitrary_candidates(candidate: Vec<u8>) -> bool {
        let subject = subject();
        let salt = fixed_salt();
        let candidate_id: Identifier = digest(&candidate);
        distance(&subject, &salt, &candidate_id) == distance(&subject, &salt, &candidate_id)
    }

    /// Testable property 8: the distance ranking over arbitrary candidates is
    /// transitive, i.e. it is a genuine total order rather than an ad-hoc
    /// comparator that could cycle.
    #[quickcheck]
    fn distance_order_is_transitive(a: Vec<u8>, b: Vec<u8>, c: Vec<u8>) -> bool {
        let subject = subject();
        let salt = fixed_salt();
        let da = distance(&subject, &salt, &digest(&a));
        let db = distance(&subject, &salt, &digest(&b));
        let dc = distance(&subject, &salt, &digest(&c));

        !(da <= db && db <= dc) || da <= dc
    }
}
