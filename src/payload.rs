use bytes::Bytes;
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters the pool is drawn from: digits plus lower and upper case ASCII letters.
pub const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const DEFAULT_POOL_SIZE: usize = 10 << 20;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("view of {requested} bytes does not fit in a pool of {pool} bytes")]
    ViewTooLarge { requested: usize, pool: usize },
}

/// Pre-generated random bytes that records are sliced out of.
///
/// Generating fresh random bytes for every record is too slow at high rates, so
/// keys and values are overlapping windows into this one buffer instead. Fine
/// for load generation, useless for anything that needs real randomness.
#[derive(Debug, Clone)]
pub struct RandomPool {
    data: Bytes,
}

impl RandomPool {
    /// Fill `size` bytes, each sampled uniformly from [`ALPHABET`].
    pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let data: Vec<u8> = rng.sample_iter(Alphanumeric).take(size).collect();
        Self {
            data: Bytes::from(data),
        }
    }

    /// Reproducible pool for a given seed.
    pub fn with_seed(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::generate(size, &mut rng)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Largest view this pool can serve.
    pub fn max_view(&self) -> usize {
        self.data.len().saturating_sub(1)
    }

    /// Random contiguous `n`-byte window, starting in `[0, len - n)`.
    pub fn view<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<&[u8], PoolError> {
        let start = self.view_offset(n, rng)?;
        Ok(&self.data[start..start + n])
    }

    pub(crate) fn view_offset<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<usize, PoolError> {
        if n >= self.data.len() {
            return Err(PoolError::ViewTooLarge {
                requested: n,
                pool: self.data.len(),
            });
        }
        Ok(rng.random_range(0..self.data.len() - n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn pool_uses_alphabet_only() {
        let pool = RandomPool::generate(4096, &mut rng());
        assert_eq!(pool.len(), 4096);
        assert!(pool.as_bytes().iter().all(|b| ALPHABET.contains(b)));
    }

    #[test]
    fn same_seed_same_pool() {
        let a = RandomPool::with_seed(1024, 42);
        let b = RandomPool::with_seed(1024, 42);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn view_has_requested_length_and_stays_in_bounds() {
        let mut r = rng();
        for size in [2usize, 3, 17, 512] {
            let pool = RandomPool::generate(size, &mut r);
            for n in 0..size {
                for _ in 0..20 {
                    let off = pool.view_offset(n, &mut r).unwrap();
                    assert!(off + n <= size, "offset {off} n {n} size {size}");
                    let v = pool.view(n, &mut r).unwrap();
                    assert_eq!(v.len(), n);
                    assert!(v.iter().all(|b| ALPHABET.contains(b)));
                }
            }
        }
    }

    #[test]
    fn view_is_a_window_of_the_pool() {
        let mut r = rng();
        let pool = RandomPool::generate(256, &mut r);
        let v = pool.view(16, &mut r).unwrap();
        assert!(pool.as_bytes().windows(16).any(|w| w == v));
    }

    #[test]
    fn oversized_view_fails() {
        let mut r = rng();
        let pool = RandomPool::generate(8, &mut r);
        for n in [8usize, 9, 1000] {
            assert_eq!(
                pool.view(n, &mut r),
                Err(PoolError::ViewTooLarge { requested: n, pool: 8 })
            );
        }
        let empty = RandomPool::generate(0, &mut r);
        assert!(empty.is_empty());
        assert!(empty.view(0, &mut r).is_err());
    }
}
