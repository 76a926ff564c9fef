//! Password strength scoring
//!
//! Deterministic point score for a candidate password. The score selects
//! which password-check action gets recorded.

use serde::Serialize;

use crate::karma::ActionType;

/// Highest score `assess` can return
pub const MAX_STRENGTH_SCORE: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthRating {
    VeryWeak,
    Weak,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrengthReport {
    pub score: u8,
    pub max_score: u8,
    pub rating: StrengthRating,
    pub action: ActionType,
}

impl StrengthReport {
    /// Ledger annotation for the recorded check
    pub fn details(&self) -> String {
        format!("Password strength: {}/{}", self.score, self.max_score)
    }
}

pub fn assess(password: &str) -> StrengthReport {
    let length = password.chars().count();
    let mut score = 0u8;

    if length >= 8 {
        score += 2;
    }
    if length >= 12 {
        score += 2;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 2;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 2;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 2;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 3;
    }

    let action = if score >= 10 {
        ActionType::PasswordCheckStrong
    } else if score >= 7 {
        ActionType::PasswordCheckMedium
    } else {
        ActionType::PasswordCheckWeak
    };

    let rating = match score {
        10.. => StrengthRating::VeryStrong,
        7..=9 => StrengthRating::Strong,
        4..=6 => StrengthRating::Weak,
        _ => StrengthRating::VeryWeak,
    };

    StrengthReport {
        score,
        max_score: MAX_STRENGTH_SCORE,
        rating,
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_lowercase_is_weak() {
        let report = assess("abc");
        assert_eq!(report.score, 2);
        assert_eq!(report.rating, StrengthRating::VeryWeak);
        assert_eq!(report.action, ActionType::PasswordCheckWeak);
    }

    #[test]
    fn test_mixed_case_with_digit_is_medium() {
        // length 9 (+2), upper (+2), lower (+2), digit (+2)
        let report = assess("Password1");
        assert_eq!(report.score, 8);
        assert_eq!(report.rating, StrengthRating::Strong);
        assert_eq!(report.action, ActionType::PasswordCheckMedium);
    }

    #[test]
    fn test_everything_scores_max() {
        let report = assess("Sup3r$ecretPass");
        assert_eq!(report.score, MAX_STRENGTH_SCORE);
        assert_eq!(report.rating, StrengthRating::VeryStrong);
        assert_eq!(report.action, ActionType::PasswordCheckStrong);
        assert_eq!(report.details(), "Password strength: 13/13");
    }

    #[test]
    fn test_symbols_and_unicode_count_as_special() {
        assert_eq!(assess("!").score, 3);
        assert_eq!(assess("é").score, 3);
        assert_eq!(assess("").score, 0);
    }

    #[test]
    fn test_length_counts_characters() {
        // 8 multi-byte characters: length bonus plus the special bonus
        assert_eq!(assess("éééééééé").score, 5);
    }
}
