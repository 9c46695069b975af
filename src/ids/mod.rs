//! Identifier generation.
//!
//! Two schemes: compact random ids for records (codes, user ids) and
//! pronounceable ids for uploads, built from shuffled word cycles so
//! consecutive ids never repeat until the cycle wraps.

use rand::seq::SliceRandom;
use rand::Rng;

/// Digits for the compact id encoding
pub const ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// List lengths are pairwise coprime (47, 48, 49) so the lockstep
// cycles visit every combination before the sequence repeats.
const ADJECTIVES: &[&str] = &[
    "Amber", "Ancient", "Bold", "Brave", "Bright", "Brisk", "Calm", "Clever",
    "Cosmic", "Crimson", "Curious", "Daring", "Dusty", "Eager", "Early",
    "Fancy", "Fierce", "Frosty", "Gentle", "Giant", "Golden", "Happy",
    "Hidden", "Humble", "Icy", "Jolly", "Keen", "Lively", "Lucky", "Mellow",
    "Mighty", "Misty", "Noble", "Polite", "Proud", "Quiet", "Rapid",
    "Rustic", "Silent", "Silver", "Sleepy", "Smooth", "Sturdy", "Sunny",
    "Swift", "Violet", "Witty",
];

const NOUNS: &[&str] = &[
    "Anchor", "Badger", "Beacon", "Bridge", "Camera", "Candle", "Canyon",
    "Castle", "Comet", "Compass", "Cricket", "Falcon", "Feather", "Fiddle",
    "Galaxy", "Garden", "Glacier", "Hammer", "Harbor", "Heron", "Island",
    "Kettle", "Lantern", "Magnet", "Marble", "Meadow", "Mirror", "Nebula",
    "Orchard", "Otter", "Parrot", "Pebble", "Pepper", "Piano", "Pigeon",
    "Prairie", "Rabbit", "Raven", "River", "Saddle", "Sparrow", "Spruce",
    "Thicket", "Tiger", "Trumpet", "Tunnel", "Walnut", "Willow",
];

const VERBS: &[&str] = &[
    "Ambles", "Bakes", "Beams", "Bounces", "Builds", "Carves", "Chants",
    "Climbs", "Crawls", "Dances", "Dashes", "Digs", "Dives", "Drifts",
    "Drums", "Flies", "Floats", "Gallops", "Gazes", "Glides", "Glows",
    "Hops", "Hums", "Jumps", "Leaps", "Marches", "Paints", "Ponders",
    "Prances", "Rambles", "Rests", "Rises", "Roams", "Rolls", "Sails",
    "Sings", "Skates", "Sketches", "Slides", "Spins", "Sprints", "Strolls",
    "Swims", "Twirls", "Waddles", "Wanders", "Waves", "Whistles", "Yawns",
];

/// Encode a number over the given digit set, most significant first
fn to_base(mut number: u32, alphabet: &[char]) -> String {
    let base = alphabet.len() as u32;
    if number == 0 {
        return alphabet[0].to_string();
    }
    let mut digits = Vec::new();
    while number > 0 {
        digits.push(alphabet[(number % base) as usize]);
        number /= base;
    }
    digits.iter().rev().collect()
}

/// Compact random id: three numbers in 0..=1024 encoded over a freshly
/// shuffled alphabet
pub fn random_id() -> String {
    let mut rng = rand::thread_rng();
    let mut alphabet: Vec<char> = ALPHABET.chars().collect();
    alphabet.shuffle(&mut rng);
    (0..3)
        .map(|_| to_base(rng.gen_range(0..=1024), &alphabet))
        .collect()
}

/// Pronounceable id generator: AdjectiveNounVerb.
///
/// Each word list is shuffled once, then consumed as a lockstep cycle.
/// The sequence repeats after the least common multiple of the list
/// lengths; the embedded lists make that the full combination count.
pub struct PronounceableIds {
    adjectives: Vec<&'static str>,
    nouns: Vec<&'static str>,
    verbs: Vec<&'static str>,
    position: [usize; 3],
}

impl PronounceableIds {
    pub fn new() -> Self {
        Self::with_words(ADJECTIVES.to_vec(), NOUNS.to_vec(), VERBS.to_vec())
    }

    /// Build over custom word lists; lists must be non-empty
    pub fn with_words(
        mut adjectives: Vec<&'static str>,
        mut nouns: Vec<&'static str>,
        mut verbs: Vec<&'static str>,
    ) -> Self {
        let mut rng = rand::thread_rng();
        adjectives.shuffle(&mut rng);
        nouns.shuffle(&mut rng);
        verbs.shuffle(&mut rng);
        Self {
            adjectives,
            nouns,
            verbs,
            position: [0; 3],
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!(
            "{}{}{}",
            self.adjectives[self.position[0]],
            self.nouns[self.position[1]],
            self.verbs[self.position[2]]
        );
        self.position[0] = (self.position[0] + 1) % self.adjectives.len();
        self.position[1] = (self.position[1] + 1) % self.nouns.len();
        self.position[2] = (self.position[2] + 1) % self.verbs.len();
        id
    }

    /// Number of distinct ids the word lists can produce
    pub fn combinations(&self) -> u64 {
        self.adjectives.len() as u64 * self.nouns.len() as u64 * self.verbs.len() as u64
    }
}

impl Default for PronounceableIds {
    fn default() -> Self {
        Self::new()
    }
}
