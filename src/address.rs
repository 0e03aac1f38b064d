//! Winternitz one-time-signature address derivation.
//!
//! For a given seed, index and security level the address is computed as:
//!
//! 1. subseed = H(seed + index), where the index is added in balanced ternary;
//! 2. the private key is H(subseed) squeezed to `level * KEY_FRAGMENT_SIZE` trits;
//! 3. every key segment is hashed `CHAIN_LENGTH` times, and the chained segments
//!    of one fragment are hashed together into a fragment digest;
//! 4. the address is the hash of all fragment digests.
//!
//! Each step uses a fresh sponge, so derivations for different indices share no state.
use crate::common::{add_index, Hash, LeafIndex, SecurityLevel, Seed, Trit, HASH_TRINARY_SIZE};
use crate::errors::DerivationError;
use crate::sponge::{digest, ShakeSponge};
use crate::traits::{AddressDerivation, Sponge};
use std::marker::PhantomData;
use zeroize::Zeroizing;

/// Number of key segments in one fragment.
pub const SEGMENTS_PER_FRAGMENT: usize = 27;
/// Trits of private key per security level.
pub const KEY_FRAGMENT_SIZE: usize = SEGMENTS_PER_FRAGMENT * HASH_TRINARY_SIZE;
/// Number of hash iterations applied to every key segment to obtain its public part.
pub const CHAIN_LENGTH: usize = 26;

/// Address derivation over the sponge `S`.
pub struct WotsAddress<S = ShakeSponge> {
    sponge: PhantomData<fn() -> S>,
}

impl<S> std::fmt::Debug for WotsAddress<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WotsAddress")
    }
}

impl<S> Default for WotsAddress<S> {
    fn default() -> Self {
        WotsAddress {
            sponge: PhantomData,
        }
    }
}

impl<S: Sponge> WotsAddress<S> {
    /// Create the derivation function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subseed of the key at `index`.
    pub fn subseed(seed: &Seed, index: LeafIndex) -> Result<Zeroizing<Vec<Trit>>, DerivationError> {
        let mut input = Zeroizing::new(seed.as_trits().to_vec());
        add_index(&mut input, index);

        let mut sponge = S::default();
        sponge.absorb(&input)?;
        Ok(Zeroizing::new(sponge.squeeze(HASH_TRINARY_SIZE)?))
    }

    /// Expand a subseed into the private key of the given security level.
    pub fn private_key(
        subseed: &[Trit],
        level: SecurityLevel,
    ) -> Result<Zeroizing<Vec<Trit>>, DerivationError> {
        let mut sponge = S::default();
        sponge.absorb(subseed)?;
        Ok(Zeroizing::new(
            sponge.squeeze(level.fragments() * KEY_FRAGMENT_SIZE)?,
        ))
    }

    /// Public digests of a private key, one hash per key fragment.
    pub fn digests(key: &[Trit]) -> Result<Vec<Trit>, DerivationError> {
        if key.is_empty() || key.len() % KEY_FRAGMENT_SIZE != 0 {
            return Err(DerivationError::Other(format!(
                "private key of {} trits is not a whole number of fragments",
                key.len()
            )));
        }

        let mut out = Vec::with_capacity(key.len() / SEGMENTS_PER_FRAGMENT);
        for fragment in key.chunks(KEY_FRAGMENT_SIZE) {
            let mut chained = Zeroizing::new(fragment.to_vec());
            for segment in chained.chunks_mut(HASH_TRINARY_SIZE) {
                for _ in 0..CHAIN_LENGTH {
                    let next = digest::<S>(segment)?;
                    segment.copy_from_slice(next.as_trits());
                }
            }
            out.extend_from_slice(digest::<S>(&chained)?.as_trits());
        }

        Ok(out)
    }
}

impl<S: Sponge> AddressDerivation for WotsAddress<S> {
    fn derive(
        &self,
        seed: &Seed,
        index: LeafIndex,
        level: SecurityLevel,
    ) -> Result<Hash, DerivationError> {
        let subseed = Self::subseed(seed, index)?;
        let key = Self::private_key(&subseed, level)?;
        let digests = Self::digests(&key)?;
        Ok(digest::<S>(&digests)?)
    }
}
