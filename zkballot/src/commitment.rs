use crate::*;
use ark_ff::UniformRand;
use rand::{CryptoRng, RngCore};

/// Commit to a candidate choice: `H(candidate_id, salt)`
pub fn compute_commitment(candidate_id: u64, salt: &Fq) -> Result<Fq, Error> {
    poseidon_hash(&[Fq::from(candidate_id), *salt])
}

/// Check that `(candidate_id, salt)` opens `commitment`
pub fn verify_commitment(candidate_id: u64, salt: &Fq, commitment: &Fq) -> bool {
    match compute_commitment(candidate_id, salt) {
        Ok(expected) => expected == *commitment,
        Err(_) => false,
    }
}

/// Hash a ballot's ciphertexts in slot order: `H(c1x_0, c1y_0, c2x_0, c2y_0, c1x_1, ...)`
pub fn compute_ciphertext_hash(ciphertexts: &[Ciphertext]) -> Result<Fq, Error> {
    if ciphertexts.len() > MAX_CANDIDATES {
        return Err(Error::UnsupportedCandidateCount(ciphertexts.len()));
    }
    let flat: Vec<Fq> = ciphertexts
        .iter()
        .flat_map(|ct| ct.to_field_elements())
        .collect();
    poseidon_hash(&flat)
}

/// A uniformly random commitment salt
pub fn random_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Fq {
    Fq::rand(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    #[test]
    fn commitment_binds_candidate_and_salt() {
        let mut rng = rand::thread_rng();
        let salt = random_salt(&mut rng);
        let commitment = compute_commitment(2, &salt).unwrap();

        assert!(verify_commitment(2, &salt, &commitment));
        assert!(!verify_commitment(1, &salt, &commitment));
        assert!(!verify_commitment(2, &(salt + Fq::from(1u64)), &commitment));
    }

    #[test]
    fn random_openings_never_collide() {
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let candidate = rng.gen_range(0..MAX_CANDIDATES as u64);
            let salt = random_salt(&mut rng);
            let commitment = compute_commitment(candidate, &salt).unwrap();
            assert!(seen.insert(fq_to_bytes(&commitment)));
        }

        // One salt reused across every candidate still yields distinct commitments
        let salt = random_salt(&mut rng);
        for candidate in 0..MAX_CANDIDATES as u64 {
            let commitment = compute_commitment(candidate, &salt).unwrap();
            assert!(seen.insert(fq_to_bytes(&commitment)));
        }
        assert_eq!(seen.len(), 10_000 + MAX_CANDIDATES);
    }

    #[test]
    fn ciphertext_hash_is_order_sensitive() {
        let keys = KeyPair::from_secret(Scalar::from(77u64));
        let a = encrypt(1, &keys.public, &Scalar::from(3u64));
        let b = encrypt(0, &keys.public, &Scalar::from(4u64));

        let ab = compute_ciphertext_hash(&[a, b]).unwrap();
        assert_eq!(ab, compute_ciphertext_hash(&[a, b]).unwrap());
        assert_ne!(ab, compute_ciphertext_hash(&[b, a]).unwrap());
    }

    #[test]
    fn too_many_slots_is_rejected() {
        let ct = Ciphertext::zero();
        let slots = vec![ct; MAX_CANDIDATES + 1];
        assert!(matches!(
            compute_ciphertext_hash(&slots),
            Err(Error::UnsupportedCandidateCount(_))
        ));
        assert!(compute_ciphertext_hash(&slots[..MAX_CANDIDATES]).is_ok());
    }
}
