//! Traits at the boundary between the tree builder and its cryptographic collaborators
use crate::common::{Hash, LeafIndex, SecurityLevel, Seed, Trit, HASH_TRINARY_SIZE};
use crate::errors::{DerivationError, SpongeError};

/// Absorb/squeeze hash construction over trits.
///
/// A sponge is a single-use session: once it has been squeezed, any further
/// `absorb` or `squeeze` fails with `SpongeError::AlreadySqueezed`. Instances are
/// never shared between concurrent tasks; every task creates its own with `default()`.
pub trait Sponge: Default + Send {
    /// Feed `trits` into the sponge. May be called several times.
    fn absorb(&mut self, trits: &[Trit]) -> Result<(), SpongeError>;
    /// Extract `len` trits of output, ending the session.
    fn squeeze(&mut self, len: usize) -> Result<Vec<Trit>, SpongeError>;

    /// Squeeze exactly one hash.
    fn squeeze_hash(&mut self) -> Result<Hash, SpongeError> {
        let trits = self.squeeze(HASH_TRINARY_SIZE)?;
        if trits.len() != HASH_TRINARY_SIZE {
            return Err(SpongeError::InvalidOutputLength(trits.len()));
        }
        if let Some(&t) = trits.iter().find(|t| !(-1..=1).contains(*t)) {
            return Err(SpongeError::InvalidTrit(t));
        }
        let mut out = [0; HASH_TRINARY_SIZE];
        out.copy_from_slice(&trits);
        Ok(Hash(out))
    }
}

/// Deterministic function turning a seed and an index into a one-time-signature address.
///
/// Implementations must be pure: the same inputs always give the same address, and
/// calls for different indices can run concurrently without shared mutable state.
pub trait AddressDerivation: Sync {
    /// Derive the address of the key at `index`.
    fn derive(
        &self,
        seed: &Seed,
        index: LeafIndex,
        level: SecurityLevel,
    ) -> Result<Hash, DerivationError>;
}

impl<F> AddressDerivation for F
where
    F: Fn(&Seed, LeafIndex, SecurityLevel) -> Result<Hash, DerivationError> + Sync,
{
    fn derive(
        &self,
        seed: &Seed,
        index: LeafIndex,
        level: SecurityLevel,
    ) -> Result<Hash, DerivationError> {
        self(seed, index, level)
    }
}
