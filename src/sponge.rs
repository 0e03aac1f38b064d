//! SHAKE256 sponge over trits, and the pairwise node combination used by the tree.
//!
//! Trits are absorbed in chunks of `HASH_TRINARY_SIZE`. Each chunk is packed five
//! trits per byte (49 bytes per chunk) before it enters the Keccak state. Output is
//! read from the SHAKE256 XOF: bytes below 243 expand into five trits, larger bytes
//! are skipped so the squeezed trits stay uniform.
use crate::common::{byte_to_trits, Hash, Trit, HASH_TRINARY_SIZE};
use crate::errors::SpongeError;
use crate::traits::Sponge;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

/// Bytes used to encode one chunk of `HASH_TRINARY_SIZE` trits.
const PACKED_CHUNK_SIZE: usize = (HASH_TRINARY_SIZE + 4) / 5;

enum State {
    Absorbing(Shake256),
    Squeezed,
}

/// Sponge backed by SHAKE256.
pub struct ShakeSponge {
    state: State,
}

impl Default for ShakeSponge {
    fn default() -> Self {
        ShakeSponge {
            state: State::Absorbing(Shake256::default()),
        }
    }
}

impl std::fmt::Debug for ShakeSponge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Absorbing(_) => "absorbing",
            State::Squeezed => "squeezed",
        };
        f.debug_struct("ShakeSponge").field("state", &state).finish()
    }
}

fn pack_chunk(chunk: &[Trit]) -> Result<[u8; PACKED_CHUNK_SIZE], SpongeError> {
    let mut out = [0u8; PACKED_CHUNK_SIZE];
    for (dst, group) in out.iter_mut().zip(chunk.chunks(5)) {
        let mut v = 0u8;
        for &t in group.iter().rev() {
            if !(-1..=1).contains(&t) {
                return Err(SpongeError::InvalidTrit(t));
            }
            v = v * 3 + (t + 1) as u8;
        }
        *dst = v;
    }
    Ok(out)
}

impl Sponge for ShakeSponge {
    fn absorb(&mut self, trits: &[Trit]) -> Result<(), SpongeError> {
        let hasher = match &mut self.state {
            State::Absorbing(hasher) => hasher,
            State::Squeezed => return Err(SpongeError::AlreadySqueezed),
        };
        if trits.is_empty() || trits.len() % HASH_TRINARY_SIZE != 0 {
            return Err(SpongeError::InvalidInputLength(trits.len()));
        }

        // Validate everything before touching the state.
        let packed = trits
            .chunks(HASH_TRINARY_SIZE)
            .map(pack_chunk)
            .collect::<Result<Vec<_>, _>>()?;
        for chunk in packed.iter() {
            hasher.update(chunk);
        }
        Ok(())
    }

    fn squeeze(&mut self, len: usize) -> Result<Vec<Trit>, SpongeError> {
        if len == 0 || len % HASH_TRINARY_SIZE != 0 {
            return Err(SpongeError::InvalidOutputLength(len));
        }
        let hasher = match std::mem::replace(&mut self.state, State::Squeezed) {
            State::Absorbing(hasher) => hasher,
            State::Squeezed => return Err(SpongeError::AlreadySqueezed),
        };

        let mut reader = hasher.finalize_xof();
        let mut out = Vec::with_capacity(len + 5);
        let mut buf = [0u8; 64];
        while out.len() < len {
            reader.read(&mut buf);
            out.extend(buf.iter().filter_map(|&b| byte_to_trits(b)).flatten());
        }
        out.truncate(len);

        Ok(out)
    }
}

/// Hash two sibling nodes into their parent: a fresh sponge absorbs `left`, then
/// `right`, and squeezes one hash. The order of the children matters.
pub fn combine<S: Sponge>(left: &Hash, right: &Hash) -> Result<Hash, SpongeError> {
    let mut sponge = S::default();
    sponge.absorb(left.as_trits())?;
    sponge.absorb(right.as_trits())?;
    sponge.squeeze_hash()
}

/// Hash an arbitrary multiple of `HASH_TRINARY_SIZE` trits into one hash.
pub fn digest<S: Sponge>(trits: &[Trit]) -> Result<Hash, SpongeError> {
    let mut sponge = S::default();
    sponge.absorb(trits)?;
    sponge.squeeze_hash()
}
