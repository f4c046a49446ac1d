use rand::{rngs::StdRng, Rng, SeedableRng};

/// Chooses which slot to evict when every slot is in use.
///
/// Victims are chosen without any recency or frequency signal, so an
/// implementation only needs to return an index below `slots`.
pub trait Evictor {
    fn victim(&mut self, slots: usize) -> usize;
}

/// Uniform random eviction over all slots.
#[derive(Debug, Clone)]
pub struct RandomEviction<R = StdRng> {
    rng: R,
}

impl RandomEviction {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R> RandomEviction<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R> Evictor for RandomEviction<R>
where
    R: Rng,
{
    fn victim(&mut self, slots: usize) -> usize {
        self.rng.gen_range(0..slots)
    }
}

impl<F> Evictor for F
where
    F: FnMut(usize) -> usize,
{
    fn victim(&mut self, slots: usize) -> usize {
        self(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::{Evictor, RandomEviction};

    #[test]
    fn seeded_is_reproducible() {
        let mut a = RandomEviction::seeded(42);
        let mut b = RandomEviction::seeded(42);
        let xs: Vec<_> = (0..32).map(|_| a.victim(8)).collect();
        let ys: Vec<_> = (0..32).map(|_| b.victim(8)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&x| x < 8));
    }

    #[test]
    fn closures_pick_victims() {
        let mut next = 0;
        let mut round_robin = |slots: usize| {
            next = (next + 1) % slots;
            next
        };
        assert_eq!(Evictor::victim(&mut round_robin, 3), 1);
        assert_eq!(Evictor::victim(&mut round_robin, 3), 2);
        assert_eq!(Evictor::victim(&mut round_robin, 3), 0);
    }
}
