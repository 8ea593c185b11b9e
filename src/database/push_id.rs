//! Time-ordered push ids
//!
//! 20 characters: 8 encode the millisecond timestamp, 12 are random. Ids
//! created in the same millisecond reuse the previous random part plus one,
//! so ids from one generator sort strictly in creation order.

use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

/// Alphabet in ASCII order so lexicographic order matches numeric order
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug, Default)]
struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// Generator for unique, creation-ordered keys
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an id for the current time
    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    /// Generate an id for the given unix time in milliseconds
    pub fn next_id_at(&self, millis: i64) -> String {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if millis == state.last_millis {
            increment(&mut state.last_random);
        } else {
            state.last_random = random_digits();
        }
        state.last_millis = millis;

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time_digits = [0u8; TIME_CHARS];
        let mut remaining = millis.max(0) as u64;
        for digit in time_digits.iter_mut().rev() {
            *digit = (remaining % 64) as u8;
            remaining /= 64;
        }
        for digit in time_digits.iter().chain(state.last_random.iter()) {
            id.push(PUSH_CHARS[*digit as usize] as char);
        }
        id
    }
}

/// 12 base-64 digits from a v4 uuid (256 is a multiple of 64, so no bias)
fn random_digits() -> [u8; RANDOM_CHARS] {
    let bytes = Uuid::new_v4().into_bytes();
    let mut digits = [0u8; RANDOM_CHARS];
    for (digit, byte) in digits.iter_mut().zip(bytes.iter()) {
        *digit = byte % 64;
    }
    // Top bit of the first digit cleared so a same-millisecond increment never
    // has to carry out of the random part
    digits[0] &= 0x1f;
    digits
}

/// Add one to a base-64 digit string, carrying leftwards
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_have_expected_shape() {
        let generator = PushIdGenerator::new();
        let id = generator.next_id();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn same_millisecond_ids_are_strictly_increasing() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..1000).map(|_| generator.next_id_at(1_700_000_000_000)).collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| id[..8] == ids[0][..8]));
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let generator = PushIdGenerator::new();
        let earlier = generator.next_id_at(1_700_000_000_000);
        let later = generator.next_id_at(1_700_000_000_001);
        assert!(earlier < later);
    }

    #[test]
    fn timestamp_prefix_is_base64_of_millis() {
        let generator = PushIdGenerator::new();
        assert_eq!(&generator.next_id_at(0)[..8], "--------");
        assert_eq!(&generator.next_id_at(64)[..8], "------0-");
    }

    #[test]
    fn ids_are_unique_across_generators() {
        let a = PushIdGenerator::new();
        let b = PushIdGenerator::new();
        let ids: HashSet<String> = (0..200)
            .flat_map(|_| [a.next_id(), b.next_id()])
            .collect();
        assert_eq!(ids.len(), 400);
    }
}
