//! Self-trade prevention policies and the per-maker decision.
//!
//! The matching engine walks resting orders head-by-head, so the STP check
//! runs against one maker at a time. Takers with
//! [`OwnerTag::ANONYMOUS`](crate::orderbook::order::OwnerTag) bypass the
//! check entirely.

use crate::orderbook::order::OwnerTag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when an incoming order would match a resting order from the
/// same owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelfTradePolicy {
    /// Cancel the resting (oldest) order and keep matching the taker.
    #[default]
    CancelOldest,

    /// Cancel the incoming (newest) order's remainder. Fills already made
    /// against other owners stand; the maker keeps its place.
    CancelNewest,

    /// Terminate the taker with `SelfTradePrevented`. Fills already made
    /// against other owners stand.
    RejectTaker,
}

impl fmt::Display for SelfTradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTradePolicy::CancelOldest => write!(f, "CANCEL_OLDEST"),
            SelfTradePolicy::CancelNewest => write!(f, "CANCEL_NEWEST"),
            SelfTradePolicy::RejectTaker => write!(f, "REJECT_TAKER"),
        }
    }
}

/// Decision for a single taker/maker encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StpAction {
    /// Different owners (or anonymous taker); match normally.
    Match,
    /// Cancel the maker, emit no trade, continue with the next maker.
    CancelMaker,
    /// Stop matching and drop the taker's remainder without error.
    CancelTaker,
    /// Stop matching and surface `SelfTradePrevented` for the remainder.
    RejectTaker,
}

/// Resolves the action for one maker at the head of a level.
#[inline]
pub(crate) fn check_self_trade(
    taker_owner: OwnerTag,
    maker_owner: OwnerTag,
    policy: SelfTradePolicy,
) -> StpAction {
    if !taker_owner.is_tracked() || taker_owner != maker_owner {
        return StpAction::Match;
    }
    match policy {
        SelfTradePolicy::CancelOldest => StpAction::CancelMaker,
        SelfTradePolicy::CancelNewest => StpAction::CancelTaker,
        SelfTradePolicy::RejectTaker => StpAction::RejectTaker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_cancel_oldest() {
        assert_eq!(SelfTradePolicy::default(), SelfTradePolicy::CancelOldest);
    }

    #[test]
    fn test_anonymous_taker_bypasses() {
        let action = check_self_trade(
            OwnerTag::ANONYMOUS,
            OwnerTag::ANONYMOUS,
            SelfTradePolicy::RejectTaker,
        );
        assert_eq!(action, StpAction::Match);
    }

    #[test]
    fn test_different_owners_match() {
        let action = check_self_trade(OwnerTag(1), OwnerTag(2), SelfTradePolicy::CancelOldest);
        assert_eq!(action, StpAction::Match);
    }

    #[test]
    fn test_same_owner_per_policy() {
        let owner = OwnerTag(7);
        assert_eq!(
            check_self_trade(owner, owner, SelfTradePolicy::CancelOldest),
            StpAction::CancelMaker
        );
        assert_eq!(
            check_self_trade(owner, owner, SelfTradePolicy::CancelNewest),
            StpAction::CancelTaker
        );
        assert_eq!(
            check_self_trade(owner, owner, SelfTradePolicy::RejectTaker),
            StpAction::RejectTaker
        );
    }

    #[test]
    fn test_policy_display_matches_config_spelling() {
        assert_eq!(SelfTradePolicy::CancelOldest.to_string(), "CANCEL_OLDEST");
        assert_eq!(SelfTradePolicy::CancelNewest.to_string(), "CANCEL_NEWEST");
        assert_eq!(SelfTradePolicy::RejectTaker.to_string(), "REJECT_TAKER");
    }
}
