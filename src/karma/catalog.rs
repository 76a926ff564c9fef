//! Action Catalog
//!
//! Compiled-in table of scored security actions. Good practices earn points,
//! risky behavior costs them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::karma::KarmaError;

/// A scored security action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PasswordCheckWeak,
    PasswordCheckMedium,
    PasswordCheckStrong,
    MfaEnabled,
    PhishingQuizPassed,
    SecurityUpdate,
    TwoFactorSetup,
    BackupCreated,
    RiskyBehavior,
}

impl ActionType {
    pub const ALL: [ActionType; 9] = [
        ActionType::PasswordCheckWeak,
        ActionType::PasswordCheckMedium,
        ActionType::PasswordCheckStrong,
        ActionType::MfaEnabled,
        ActionType::PhishingQuizPassed,
        ActionType::SecurityUpdate,
        ActionType::TwoFactorSetup,
        ActionType::BackupCreated,
        ActionType::RiskyBehavior,
    ];

    /// Catalog key, as stored in the ledger
    pub fn key(&self) -> &'static str {
        match self {
            ActionType::PasswordCheckWeak => "password_check_weak",
            ActionType::PasswordCheckMedium => "password_check_medium",
            ActionType::PasswordCheckStrong => "password_check_strong",
            ActionType::MfaEnabled => "mfa_enabled",
            ActionType::PhishingQuizPassed => "phishing_quiz_passed",
            ActionType::SecurityUpdate => "security_update",
            ActionType::TwoFactorSetup => "two_factor_setup",
            ActionType::BackupCreated => "backup_created",
            ActionType::RiskyBehavior => "risky_behavior",
        }
    }

    /// Point delta applied to the account score
    pub fn points(&self) -> i64 {
        match self {
            ActionType::PasswordCheckWeak => 2,
            ActionType::PasswordCheckMedium => 5,
            ActionType::PasswordCheckStrong => 10,
            ActionType::MfaEnabled => 20,
            ActionType::PhishingQuizPassed => 8,
            ActionType::SecurityUpdate => 5,
            ActionType::TwoFactorSetup => 20,
            ActionType::BackupCreated => 15,
            ActionType::RiskyBehavior => -10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionType::PasswordCheckWeak => "Weak password check",
            ActionType::PasswordCheckMedium => "Medium password check",
            ActionType::PasswordCheckStrong => "Strong password check",
            ActionType::MfaEnabled => "MFA enabled",
            ActionType::PhishingQuizPassed => "Phishing quiz passed",
            ActionType::SecurityUpdate => "Security update applied",
            ActionType::TwoFactorSetup => "Two-factor setup",
            ActionType::BackupCreated => "Backup created",
            ActionType::RiskyBehavior => "Risky behavior",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ActionType {
    type Err = KarmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|action| action.key() == s)
            .ok_or_else(|| KarmaError::UnknownAction(s.to_string()))
    }
}

/// One row of the catalog listing
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub action_type: ActionType,
    pub points: i64,
    pub label: &'static str,
}

/// Look up the point delta for a catalog key
pub fn points_for(action_type: &str) -> Result<i64, KarmaError> {
    action_type.parse::<ActionType>().map(|action| action.points())
}

/// Full catalog in declaration order
pub fn catalog() -> Vec<CatalogEntry> {
    ActionType::ALL
        .into_iter()
        .map(|action| CatalogEntry {
            action_type: action,
            points: action.points(),
            label: action.label(),
        })
        .collect()
}

/// Every valid catalog key
pub fn valid_actions() -> Vec<&'static str> {
    ActionType::ALL.iter().map(|action| action.key()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_table() {
        assert_eq!(points_for("password_check_weak").unwrap(), 2);
        assert_eq!(points_for("password_check_medium").unwrap(), 5);
        assert_eq!(points_for("password_check_strong").unwrap(), 10);
        assert_eq!(points_for("mfa_enabled").unwrap(), 20);
        assert_eq!(points_for("phishing_quiz_passed").unwrap(), 8);
        assert_eq!(points_for("security_update").unwrap(), 5);
        assert_eq!(points_for("two_factor_setup").unwrap(), 20);
        assert_eq!(points_for("backup_created").unwrap(), 15);
        assert_eq!(points_for("risky_behavior").unwrap(), -10);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = points_for("not_a_real_action").unwrap_err();
        assert!(matches!(err, KarmaError::UnknownAction(ref key) if key == "not_a_real_action"));

        // Keys are exact, no case folding
        assert!(points_for("MFA_ENABLED").is_err());
        assert!(points_for("").is_err());
    }

    #[test]
    fn test_serde_uses_catalog_keys() {
        for action in ActionType::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.key()));
        }
    }

    #[test]
    fn test_catalog_listing() {
        let entries = catalog();
        assert_eq!(entries.len(), 9);
        assert_eq!(valid_actions().len(), 9);
        assert!(entries.iter().any(|e| e.points < 0));
    }
}
