//! Backup lifecycle state interpreter.
//!
//! A backup contract exposes a state code, the time of its last state change,
//! the waiting window of the pending action and its creation time. This module
//! turns those raw fields into the timestamps and flags shown to users.
//!
//! | state | meaning |
//! |---|---|
//! | 0 | initialized, nothing pending |
//! | 1 | restore initiated |
//! | 2 | revocation initiated |
//! | 3 | restored (terminal) |
//! | 4 | revoked (terminal) |

use crate::error::{Result, TezoroError};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-chain backup state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BackupState {
    /// Deployed, no pending action
    Initialized = 0,
    /// Restore process initiated
    RestoreInitiated = 1,
    /// Revocation process initiated
    RevocationInitiated = 2,
    /// Tokens restored to beneficiaries
    Restored = 3,
    /// Backup revoked by the owner
    Revoked = 4,
}

/// Coarse lifecycle phase; exactly one applies to every state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackupPhase {
    /// Nothing has been initiated
    NeverStarted,
    /// Restore pending
    RestorePath,
    /// Revocation pending
    RevocationPath,
    /// Restored or revoked
    Terminal,
}

impl BackupState {
    /// Numeric code as stored on chain
    pub fn code(self) -> u8 {
        self as u8
    }

    /// No owner-initiated transition is possible from here
    pub fn is_terminal(self) -> bool {
        self.code() >= 3
    }

    /// Lifecycle phase of this state
    pub fn phase(self) -> BackupPhase {
        match self {
            BackupState::Initialized => BackupPhase::NeverStarted,
            BackupState::RestoreInitiated => BackupPhase::RestorePath,
            BackupState::RevocationInitiated => BackupPhase::RevocationPath,
            BackupState::Restored | BackupState::Revoked => BackupPhase::Terminal,
        }
    }
}

impl TryFrom<u8> for BackupState {
    type Error = TezoroError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(BackupState::Initialized),
            1 => Ok(BackupState::RestoreInitiated),
            2 => Ok(BackupState::RevocationInitiated),
            3 => Ok(BackupState::Restored),
            4 => Ok(BackupState::Revoked),
            other => Err(TezoroError::UnknownBackupState(u64::from(other))),
        }
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupState::Initialized => write!(f, "initialized"),
            BackupState::RestoreInitiated => write!(f, "restore initiated"),
            BackupState::RevocationInitiated => write!(f, "revocation initiated"),
            BackupState::Restored => write!(f, "restored"),
            BackupState::Revoked => write!(f, "revoked"),
        }
    }
}

/// Fields read from a backup contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBackupState {
    /// State code
    pub state: u8,
    /// Last state change (unix seconds)
    pub timestamp: u64,
    /// Waiting window of the pending action (seconds)
    pub delay: u64,
    /// Creation time (unix seconds)
    pub init_timestamp: u64,
    /// Backup owner
    pub owner: Address,
    /// Backed-up token
    pub token_address: Address,
}

impl RawBackupState {
    /// Typed state, failing on unknown codes
    pub fn backup_state(&self) -> Result<BackupState> {
        BackupState::try_from(self.state)
    }
}

/// Caller-facing view of a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupView {
    /// Typed state
    pub state: BackupState,
    /// Backed-up token
    pub token_address: Address,
    /// Backup owner
    pub from: Address,
    /// Creation time
    pub created_at: u64,
    /// Restore initiation time of a restored backup, 0 otherwise
    pub restore_timestamp: u64,
    /// Restore initiation time of a pending restore, 0 otherwise
    pub restore_initiated_timestamp: u64,
    /// Revocation initiation time of a pending revocation, 0 otherwise
    pub revocation_initiated_timestamp: u64,
    /// Revocation effective time of a pending revocation, 0 otherwise
    pub revocation_timestamp: u64,
    /// Revocation waiting window
    pub revocation_delay_seconds: u64,
    /// Restore waiting window
    pub restore_delay_seconds: u64,
    /// Restored or revoked
    pub is_terminal_state: bool,
    /// Revocation window elapsed while still pending on chain
    pub is_revoked: bool,
    /// Neither terminal nor revoked
    pub is_active: bool,
}

impl BackupView {
    /// Lifecycle phase of the backup
    pub fn phase(&self) -> BackupPhase {
        self.state.phase()
    }
}

/// Interpret raw contract fields at time `now` (unix seconds).
///
/// `revocation_timestamp` is taken from the pending revocation state (2), not
/// from the revoked state (4): the contract's fields never expose the moment a
/// revocation became final.
pub fn derive_backup_view(raw: &RawBackupState, now: u64) -> Result<BackupView> {
    let state = raw.backup_state()?;
    let initiated_at = raw.timestamp.saturating_sub(raw.delay);

    let when = |expected: BackupState, value: u64| if state == expected { value } else { 0 };

    let is_terminal_state = state.is_terminal();
    let is_revoked = state == BackupState::RevocationInitiated && now > raw.timestamp;

    Ok(BackupView {
        state,
        token_address: raw.token_address,
        from: raw.owner,
        created_at: raw.init_timestamp,
        restore_timestamp: when(BackupState::Restored, initiated_at),
        restore_initiated_timestamp: when(BackupState::RestoreInitiated, initiated_at),
        revocation_initiated_timestamp: when(BackupState::RevocationInitiated, initiated_at),
        revocation_timestamp: when(BackupState::RevocationInitiated, raw.timestamp),
        revocation_delay_seconds: raw.delay,
        restore_delay_seconds: raw.delay,
        is_terminal_state,
        is_revoked,
        is_active: !(is_terminal_state || is_revoked),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    fn raw(state: u8, timestamp: u64, delay: u64) -> RawBackupState {
        RawBackupState {
            state,
            timestamp,
            delay,
            init_timestamp: 500,
            owner: Address::repeat_byte(0x0a),
            token_address: Address::repeat_byte(0x0b),
        }
    }

    fn initiated_timestamps(view: &BackupView) -> [u64; 2] {
        [
            view.restore_initiated_timestamp,
            view.revocation_initiated_timestamp,
        ]
    }

    #[test]
    fn test_initialized_has_no_timestamps() {
        let view = derive_backup_view(&raw(0, 1000, 100), 2000).unwrap();

        assert_eq!(view.restore_timestamp, 0);
        assert_eq!(view.restore_initiated_timestamp, 0);
        assert_eq!(view.revocation_initiated_timestamp, 0);
        assert_eq!(view.revocation_timestamp, 0);
        assert!(view.is_active);
        assert!(!view.is_terminal_state);
        assert_eq!(view.phase(), BackupPhase::NeverStarted);
    }

    #[test]
    fn test_restore_pending() {
        let view = derive_backup_view(&raw(1, 1000, 100), 1050).unwrap();

        assert_eq!(view.restore_initiated_timestamp, 900);
        assert_eq!(view.restore_timestamp, 0);
        assert_eq!(view.revocation_initiated_timestamp, 0);
        assert_eq!(view.revocation_timestamp, 0);
        assert!(view.is_active);
        assert_eq!(view.phase(), BackupPhase::RestorePath);
    }

    #[test]
    fn test_revocation_pending_before_window_elapses() {
        let view = derive_backup_view(&raw(2, 1000, 100), 950).unwrap();

        assert_eq!(view.revocation_initiated_timestamp, 900);
        assert_eq!(view.revocation_timestamp, 1000);
        assert_eq!(view.restore_initiated_timestamp, 0);
        assert!(!view.is_revoked);
        assert!(view.is_active);
    }

    // `timestamp` is the end of the revocation window
    #[test_case(900, false ; "at initiation")]
    #[test_case(1000, false ; "at window end")]
    #[test_case(1001, true ; "just after window end")]
    #[test_case(1050, true ; "after window end")]
    fn test_revocation_window_boundary(now: u64, revoked: bool) {
        let view = derive_backup_view(&raw(2, 1000, 100), now).unwrap();
        assert_eq!(view.is_revoked, revoked);
        assert_eq!(view.is_active, !revoked);
    }

    #[test]
    fn test_revocation_effective_after_window_elapses() {
        let view = derive_backup_view(&raw(2, 1000, 100), 1500).unwrap();

        assert!(view.is_revoked);
        assert!(!view.is_active);
        assert!(!view.is_terminal_state);
    }

    #[test]
    fn test_revocation_not_effective_at_exact_deadline() {
        let view = derive_backup_view(&raw(2, 1000, 100), 1000).unwrap();
        assert!(!view.is_revoked);
    }

    #[test]
    fn test_restored_is_terminal() {
        let view = derive_backup_view(&raw(3, 1000, 100), 1050).unwrap();

        assert!(view.is_terminal_state);
        assert!(!view.is_active);
        assert_eq!(view.restore_timestamp, 900);
        assert_eq!(view.restore_initiated_timestamp, 0);
        assert_eq!(view.phase(), BackupPhase::Terminal);
    }

    /// Current behavior: the revocation timestamp comes from the pending state
    /// code 2 and stays 0 once the contract reports the revoked state 4.
    #[test]
    fn test_revoked_state_has_no_revocation_timestamp() {
        let view = derive_backup_view(&raw(4, 1000, 100), 1050).unwrap();

        assert_eq!(view.revocation_timestamp, 0);
        assert_eq!(view.revocation_initiated_timestamp, 0);
        assert!(view.is_terminal_state);
        assert!(!view.is_revoked);
        assert!(!view.is_active);
    }

    #[test_case(5 ; "just above range")]
    #[test_case(42 ; "arbitrary")]
    #[test_case(u8::MAX ; "max")]
    fn test_unknown_state_fails(code: u8) {
        assert_matches!(
            derive_backup_view(&raw(code, 1000, 100), 1050),
            Err(TezoroError::UnknownBackupState(c)) if c == u64::from(code)
        );
    }

    #[test_case(0 ; "initialized")]
    #[test_case(1 ; "restore initiated")]
    #[test_case(2 ; "revocation initiated")]
    #[test_case(3 ; "restored")]
    #[test_case(4 ; "revoked")]
    fn test_at_most_one_initiated_timestamp(code: u8) {
        let view = derive_backup_view(&raw(code, 1000, 100), 1050).unwrap();
        let non_zero = initiated_timestamps(&view)
            .iter()
            .filter(|t| **t != 0)
            .count();
        assert!(non_zero <= 1);
        assert_eq!(view.restore_delay_seconds, 100);
        assert_eq!(view.revocation_delay_seconds, 100);
        assert_eq!(view.created_at, 500);
        assert_eq!(view.from, Address::repeat_byte(0x0a));
        assert_eq!(view.token_address, Address::repeat_byte(0x0b));
    }

    #[test]
    fn test_is_idempotent() {
        let input = raw(2, 1000, 100);
        let first = derive_backup_view(&input, 1200).unwrap();
        let second = derive_backup_view(&input, 1200).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_delay_larger_than_timestamp_saturates() {
        let view = derive_backup_view(&raw(1, 50, 100), 60).unwrap();
        assert_eq!(view.restore_initiated_timestamp, 0);
    }

    #[test]
    fn test_state_codes_round_trip() {
        for code in 0u8..=4 {
            assert_eq!(BackupState::try_from(code).unwrap().code(), code);
        }
        assert!(BackupState::Restored.is_terminal());
        assert!(!BackupState::RevocationInitiated.is_terminal());
        assert_eq!(BackupState::RestoreInitiated.to_string(), "restore initiated");
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = derive_backup_view(&raw(1, 1000, 100), 1050).unwrap();
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["restoreInitiatedTimestamp"], 900);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["createdAt"], 500);
    }
}
