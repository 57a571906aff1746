//! Seeded RNG streams segregated by game domain.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::minigames::MinigameId;

/// Deterministic bundle of RNG streams, one per randomised domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    puzzle: CountingRng<ChaCha20Rng>,
    memory: CountingRng<ChaCha20Rng>,
    ghost: CountingRng<ChaCha20Rng>,
    diary: CountingRng<ChaCha20Rng>,
    account: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            puzzle: CountingRng::new(derive_stream_seed(seed, b"puzzle")),
            memory: CountingRng::new(derive_stream_seed(seed, b"memory")),
            ghost: CountingRng::new(derive_stream_seed(seed, b"ghost")),
            diary: CountingRng::new(derive_stream_seed(seed, b"diary")),
            account: CountingRng::new(derive_stream_seed(seed, b"account")),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream feeding a minigame's round generators.
    pub fn game(&mut self, game: MinigameId) -> &mut CountingRng<ChaCha20Rng> {
        match game {
            MinigameId::ShadowPuzzle => &mut self.puzzle,
            MinigameId::MemoryCandle => &mut self.memory,
            MinigameId::TapGhost => &mut self.ghost,
        }
    }

    /// Fresh generator owned by a single round, forked from the game stream.
    pub fn fork_round(&mut self, game: MinigameId) -> ChaCha20Rng {
        let round_seed = self.game(game).next_u64();
        ChaCha20Rng::seed_from_u64(round_seed)
    }

    pub fn diary(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.diary
    }

    pub fn account(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.account
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so this never falls back in practice.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
