use std::sync::OnceLock;

// Deterministic key tables behind OnceLock so every thread and every test
// sees the same hashes.
static PIECE_KEYS: OnceLock<[[u64; 64]; 12]> = OnceLock::new();
static CASTLE_KEYS: OnceLock<[u64; 64]> = OnceLock::new();
static EN_PASSANT_KEYS: OnceLock<[u64; 8]> = OnceLock::new();
static TURN_KEY: OnceLock<u64> = OnceLock::new();

// Small xorshift PRNG, seeded with a fixed constant
struct Prng {
    state: u32,
}

impl Prng {
    fn new(seed: u32) -> Self {
        Prng { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    fn next_u64(&mut self) -> u64 {
        let n1 = self.next_u32() as u64;
        let n2 = self.next_u32() as u64;
        let n3 = self.next_u32() as u64;
        let n4 = self.next_u32() as u64;
        n1 | (n2 << 16) | (n3 << 32) | (n4 << 48)
    }
}

// A single gate so a second caller blocks until every table is published.
pub fn init_zobrist() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        build_zobrist_tables();
    });
}

fn build_zobrist_tables() {
    let mut rng = Prng::new(1070372);

    let mut piece_keys = [[0; 64]; 12];
    for piece in 0..12 {
        for sq in 0..64 {
            piece_keys[piece][sq] = rng.next_u64();
        }
    }
    let _ = PIECE_KEYS.set(piece_keys);

    // One key per potential castle rook square
    let mut castle_keys = [0; 64];
    for sq in 0..64 {
        castle_keys[sq] = rng.next_u64();
    }
    let _ = CASTLE_KEYS.set(castle_keys);

    let mut ep_keys = [0; 8];
    for file in 0..8 {
        ep_keys[file] = rng.next_u64();
    }
    let _ = EN_PASSANT_KEYS.set(ep_keys);

    let _ = TURN_KEY.set(rng.next_u64());
}

#[inline(always)]
pub fn piece_key(piece: usize, sq: u8) -> u64 {
    PIECE_KEYS.get().expect("Zobrist not init")[piece][sq as usize]
}

#[inline(always)]
pub fn castle_key(sq: u8) -> u64 {
    CASTLE_KEYS.get().expect("Zobrist not init")[sq as usize]
}

#[inline(always)]
pub fn en_passant_key(file: u8) -> u64 {
    EN_PASSANT_KEYS.get().expect("Zobrist not init")[file as usize]
}

#[inline(always)]
pub fn turn_key() -> u64 {
    *TURN_KEY.get().expect("Zobrist not init")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic_and_distinct() {
        init_zobrist();
        assert_eq!(piece_key(0, 0), piece_key(0, 0));
        assert_ne!(piece_key(0, 0), piece_key(0, 1));
        assert_ne!(piece_key(0, 0), piece_key(1, 0));
        assert_ne!(turn_key(), 0);
        assert_ne!(en_passant_key(0), en_passant_key(7));
        assert_ne!(castle_key(0), castle_key(63));
    }
}
