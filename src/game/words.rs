use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::settings::{Difficulty, GameSettings};

pub const WORD_OPTION_COUNT: usize = 3;

const EASY_WORDS: &[&str] = &[
    "Apple", "Sun", "House", "Tree", "Car", "Book", "Chair", "Fish", "Bird", "Moon",
    "Ball", "Smile", "Cloud", "Star", "Cat", "Dog", "Hat", "Eye", "Mouth", "Door",
];

const MEDIUM_WORDS: &[&str] = &[
    "Pizza", "Ice Cream", "Boat", "Plane", "Clock", "Phone", "Computer", "Guitar",
    "Robot", "Alien", "Ghost", "Spider", "Turtle", "Rabbit", "Duck", "Horse",
    "Camera", "Watch", "Lamp", "Shoes",
];

const HARD_WORDS: &[&str] = &[
    "Astronaut", "Playground", "Waterfall", "Hurricane", "Hospital", "Library",
    "Dragon", "Unicorn", "Dinosaur", "Pyramid", "Sphinx", "Volcano", "Tornado",
    "Cactus", "Kangaroo", "Octopus", "Penguin", "Giraffe", "Zebra", "Elephant",
];

pub fn tier(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Easy => EASY_WORDS,
        Difficulty::Medium => MEDIUM_WORDS,
        Difficulty::Hard => HARD_WORDS,
    }
}

/// Draw the three candidate words offered to the drawer: two sampled from
/// the room's tier (custom words take priority in that pool), plus one from
/// the Hard tier so every turn has at least one ambitious option. The final
/// order is shuffled so the hard word's position gives nothing away.
pub fn word_options<R: Rng>(settings: &GameSettings, rng: &mut R) -> Vec<String> {
    let mut pool: Vec<String> = settings.custom_word_list();
    pool.extend(tier(settings.difficulty).iter().map(|w| w.to_string()));

    let mut options: Vec<String> = pool
        .choose_multiple(rng, WORD_OPTION_COUNT - 1)
        .cloned()
        .collect();

    let hard: Vec<String> = HARD_WORDS
        .iter()
        .map(|w| w.to_string())
        .filter(|w| !options.contains(w))
        .collect();
    if let Some(word) = hard.choose(rng) {
        options.push(word.clone());
    }

    options.shuffle(rng);
    options
}
