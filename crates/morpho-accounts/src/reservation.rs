// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reservation tokens for the per-user quota slot.

use std::time::Instant;

/// Proof that a user's quota slot is held by exactly one in-flight request.
///
/// The token is deliberately neither `Clone` nor `Copy`: committing consumes
/// it, so a reservation can be released exactly once by its holder. A token
/// that is dropped without a commit leaves the pending entry behind for the
/// watchdog to reap.
#[derive(Debug)]
pub struct ReservationToken {
    id: String,
    user_id: String,
}

impl ReservationToken {
    pub(crate) fn new(user_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Unique identifier of this reservation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The user whose quota slot this token holds.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// The store-side record of a held reservation.
#[derive(Debug)]
pub(crate) struct PendingReservation {
    /// Token id this entry belongs to, so a stale token cannot release a
    /// successor's reservation.
    pub token_id: String,
    pub reserved_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        let a = ReservationToken::new("u1");
        let b = ReservationToken::new("u1");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.user_id(), b.user_id());
    }
}
