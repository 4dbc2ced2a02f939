use serde::{Deserialize, Serialize};

pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 10;
pub const MIN_DRAW_TIME: u32 = 15;
pub const MAX_DRAW_TIME: u32 = 180;
pub const MAX_CUSTOM_WORDS_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Per-room game configuration, adjustable by the host while in the lobby.
/// Out-of-range values from the client clamp to the nearest bound rather
/// than rejecting the whole update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub rounds: u32,
    pub draw_time: u32,
    pub difficulty: Difficulty,
    /// Comma separated extra words, prepended to the word pool.
    pub custom_words: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rounds: 3,
            draw_time: 60,
            difficulty: Difficulty::Medium,
            custom_words: String::new(),
        }
    }
}

impl GameSettings {
    /// Clamp every field into its valid range and sanitize the custom word
    /// list. Called on every `update_settings` intent before the settings
    /// are stored.
    pub fn sanitized(mut self) -> Self {
        self.rounds = self.rounds.clamp(MIN_ROUNDS, MAX_ROUNDS);
        self.draw_time = self.draw_time.clamp(MIN_DRAW_TIME, MAX_DRAW_TIME);

        self.custom_words = ammonia::clean(&self.custom_words)
            .chars()
            .take(MAX_CUSTOM_WORDS_LEN)
            .collect();
        self
    }

    /// Custom words as a cleaned list, empty entries removed.
    pub fn custom_word_list(&self) -> Vec<String> {
        self.custom_words
            .split(',')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = GameSettings::default();
        assert_eq!(s.rounds, 3);
        assert_eq!(s.draw_time, 60);
        assert_eq!(s.difficulty, Difficulty::Medium);
        assert!(s.custom_words.is_empty());
    }

    #[test]
    fn test_clamps_out_of_range_values() {
        let s = GameSettings {
            rounds: 99,
            draw_time: 5,
            difficulty: Difficulty::Hard,
            custom_words: String::new(),
        }
        .sanitized();

        assert_eq!(s.rounds, MAX_ROUNDS);
        assert_eq!(s.draw_time, MIN_DRAW_TIME);
        assert_eq!(s.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_custom_words_truncated_and_sanitized() {
        let s = GameSettings {
            custom_words: format!("<script>x</script>cat,{}", "a".repeat(600)),
            ..GameSettings::default()
        }
        .sanitized();

        assert!(s.custom_words.len() <= MAX_CUSTOM_WORDS_LEN);
        assert!(!s.custom_words.contains("<script>"));
    }

    #[test]
    fn test_custom_word_list_skips_empty_entries() {
        let s = GameSettings {
            custom_words: "cat, dog ,, bird,".to_string(),
            ..GameSettings::default()
        };
        assert_eq!(s.custom_word_list(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn test_settings_wire_format() {
        let json = r#"{"rounds":5,"drawTime":90,"difficulty":"Easy","customWords":"cat"}"#;
        let s: GameSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.rounds, 5);
        assert_eq!(s.draw_time, 90);
        assert_eq!(s.difficulty, Difficulty::Easy);
        assert_eq!(s.custom_words, "cat");
    }
}
