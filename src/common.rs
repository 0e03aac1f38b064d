//! Structures common to tree construction: trits, hashes, seeds and parameters.
use crate::errors::Error;
use rand_core::{CryptoRng, RngCore};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde_enabled")]
use {
    serde::{Deserialize, Serialize},
    serde_with::{DeserializeFromStr, SerializeDisplay},
};

/// A balanced ternary digit, one of `-1`, `0` or `1`.
pub type Trit = i8;

/// Position of a one-time-signature key, and of its address in the leaf layer.
pub type LeafIndex = u64;

/// Number of trits in a hash.
pub const HASH_TRINARY_SIZE: usize = 243;
/// Number of trytes in a hash.
pub const HASH_TRYTE_SIZE: usize = HASH_TRINARY_SIZE / 3;
/// Largest depth accepted by the tree builder.
pub const MAX_DEPTH: usize = 32;

const TRYTE_ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Fixed-length ternary digest exchanged between the layers of the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(SerializeDisplay, DeserializeFromStr))]
pub struct Hash(pub(crate) [Trit; HASH_TRINARY_SIZE]);

impl Hash {
    /// Hash with every trit set to zero.
    pub const NULL: Hash = Hash([0; HASH_TRINARY_SIZE]);

    /// Tries to convert a slice of trits into `Self`.
    ///
    /// # Errors
    /// The function fails if
    /// * `trits.len()` is not `HASH_TRINARY_SIZE`
    /// * a value is not a valid trit
    pub fn from_trits(trits: &[Trit]) -> Result<Self, Error> {
        if trits.len() != HASH_TRINARY_SIZE {
            return Err(Error::InvalidHashSize(trits.len()));
        }
        check_trits(trits)?;

        let mut out = [0; HASH_TRINARY_SIZE];
        out.copy_from_slice(trits);
        Ok(Hash(out))
    }

    /// Parses the 81 tryte representation of a hash.
    pub fn from_trytes(trytes: &str) -> Result<Self, Error> {
        let mut out = [0; HASH_TRINARY_SIZE];
        trytes_to_trits(trytes, &mut out)?;
        Ok(Hash(out))
    }

    /// Return `Self` as its trit representation.
    pub fn as_trits(&self) -> &[Trit] {
        &self.0
    }

    /// Encodes the hash as 81 trytes.
    pub fn to_trytes(&self) -> String {
        trits_to_trytes(&self.0)
    }
}

impl AsRef<[Trit]> for Hash {
    fn as_ref(&self) -> &[Trit] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_trytes())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_trytes())
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_trytes(s)
    }
}

/// Root entropy from which every one-time-signature key is derived. The trits are
/// overwritten with zeroes when the seed is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([Trit; HASH_TRINARY_SIZE]);

impl Seed {
    /// Byte representation size of a `Seed`, in trits.
    pub const SIZE: usize = HASH_TRINARY_SIZE;

    /// Creates a `Seed` from a slice of trits.
    pub fn from_trits(trits: &[Trit]) -> Result<Self, Error> {
        if trits.len() != Self::SIZE {
            return Err(Error::InvalidHashSize(trits.len()));
        }
        check_trits(trits)?;

        let mut out = [0; Self::SIZE];
        out.copy_from_slice(trits);
        Ok(Seed(out))
    }

    /// Parses a seed given as 81 trytes.
    pub fn from_trytes(trytes: &str) -> Result<Self, Error> {
        let mut seed = Seed([0; Self::SIZE]);
        trytes_to_trits(trytes, &mut seed.0)?;
        Ok(seed)
    }

    /// Draws a uniformly distributed seed from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = Seed([0; Self::SIZE]);
        let mut filled = 0;
        let mut buf = [0u8; 64];

        while filled < Self::SIZE {
            rng.fill_bytes(&mut buf);
            for &b in buf.iter() {
                if filled >= Self::SIZE {
                    break;
                }
                if let Some(trits) = byte_to_trits(b) {
                    let take = (Self::SIZE - filled).min(trits.len());
                    seed.0[filled..filled + take].copy_from_slice(&trits[..take]);
                    filled += take;
                }
            }
        }
        buf.zeroize();

        seed
    }

    /// Return the seed as trits.
    pub fn as_trits(&self) -> &[Trit] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Security level of the derived keys. Each level adds one key fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub enum SecurityLevel {
    /// One key fragment.
    Low = 1,
    /// Two key fragments.
    Medium = 2,
    /// Three key fragments.
    High = 3,
}

impl SecurityLevel {
    /// Number of key fragments derived for this level.
    pub fn fragments(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(SecurityLevel::Low),
            2 => Ok(SecurityLevel::Medium),
            3 => Ok(SecurityLevel::High),
            other => Err(Error::InvalidSecurityLevel(other)),
        }
    }
}

/// Structure that represents the depth of the binary tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Depth(pub usize);

impl Depth {
    /// Compute the number of leaves of a tree with the given `Depth`.
    ///
    /// # Errors
    /// Fails with `InvalidDepth` if the depth exceeds `MAX_DEPTH` or `2^depth`
    /// does not fit in a `usize`.
    pub fn leaf_count(self) -> Result<usize, Error> {
        if self.0 > MAX_DEPTH {
            return Err(Error::InvalidDepth(self.0));
        }
        u32::try_from(self.0)
            .ok()
            .and_then(|shift| 1usize.checked_shl(shift))
            .ok_or(Error::InvalidDepth(self.0))
    }
}

/// Checks that every value of `trits` is a valid trit.
pub(crate) fn check_trits(trits: &[Trit]) -> Result<(), Error> {
    match trits.iter().find(|t| !(-1..=1).contains(*t)) {
        Some(&t) => Err(Error::InvalidTrit(t)),
        None => Ok(()),
    }
}

/// Maps a byte below 243 onto five trits; larger bytes are rejected so the
/// resulting trits stay uniformly distributed.
pub(crate) fn byte_to_trits(b: u8) -> Option<[Trit; 5]> {
    if b >= 243 {
        return None;
    }
    let mut v = b;
    let mut out = [0; 5];
    for t in out.iter_mut() {
        *t = (v % 3) as Trit - 1;
        v /= 3;
    }
    Some(out)
}

/// Adds `index` onto `trits` in balanced ternary. A carry out of the last trit is dropped.
pub(crate) fn add_index(trits: &mut [Trit], index: LeafIndex) {
    let mut value = index;
    let mut carry: Trit = 0;

    for t in trits.iter_mut() {
        if value == 0 && carry == 0 {
            break;
        }

        let digit = match value % 3 {
            2 => {
                value = value / 3 + 1;
                -1
            }
            r => {
                value /= 3;
                r as Trit
            }
        };

        let sum = *t + digit + carry;
        let (trit, next) = match sum {
            s if s > 1 => (s - 3, 1),
            s if s < -1 => (s + 3, -1),
            s => (s, 0),
        };
        *t = trit;
        carry = next;
    }
}

fn trits_to_trytes(trits: &[Trit]) -> String {
    trits
        .chunks(3)
        .map(|c| {
            let value = c[0] + 3 * c[1] + 9 * c[2];
            let idx = if value < 0 { value + 27 } else { value };
            TRYTE_ALPHABET[idx as usize] as char
        })
        .collect()
}

fn trytes_to_trits(trytes: &str, out: &mut [Trit]) -> Result<(), Error> {
    let chars = trytes.chars().count();
    if chars * 3 != out.len() {
        return Err(Error::InvalidTryteCount(chars));
    }

    for (c, dst) in trytes.chars().zip(out.chunks_mut(3)) {
        let idx = TRYTE_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(Error::InvalidTryte(c))? as i8;
        let mut value = if idx > 13 { idx - 27 } else { idx };

        for t in dst.iter_mut() {
            let mut r = value % 3;
            value /= 3;
            if r > 1 {
                r -= 3;
                value += 1;
            } else if r < -1 {
                r += 3;
                value -= 1;
            }
            *t = r;
        }
    }

    Ok(())
}
