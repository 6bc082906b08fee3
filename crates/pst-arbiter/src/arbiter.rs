//! The namespace claim rule.
//!
//! Names without a visible delimiter are first-come, first-served. A name
//! with one (`"bob.alice"`) borrows the authority of its suffix (`"alice"`):
//!
//! | registry entry for suffix | who may claim        |
//! |---------------------------|----------------------|
//! | none                      | the suffix account   |
//! | closed auction            | the high bidder      |
//! | open auction              | nobody               |

use pst_types::AccountName;
use tracing::debug;

use crate::error::{ArbitrationError, ClaimDenial, Result};
use crate::registry::ReservationRegistry;

/// Who may claim a given name, independent of any particular caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimRule {
    /// Any account may claim.
    Open,
    /// Only the account whose name equals the suffix may claim.
    SuffixAccount(AccountName),
    /// Only the winner of the suffix auction may claim.
    AuctionWinner(AccountName),
    /// Nobody may claim while the suffix auction is running.
    AuctionPending(AccountName),
}

impl ClaimRule {
    /// The reason `claimant` is refused under this rule, if any.
    ///
    /// `suffix` is the suffix of the name being claimed.
    pub fn refusal(&self, suffix: AccountName, claimant: &AccountName) -> Option<ClaimDenial> {
        match *self {
            ClaimRule::Open => None,
            ClaimRule::SuffixAccount(account) if account == *claimant => None,
            ClaimRule::SuffixAccount(_) => Some(ClaimDenial::NotSuffixAccount { suffix }),
            ClaimRule::AuctionWinner(high_bidder) if high_bidder == *claimant => None,
            ClaimRule::AuctionWinner(high_bidder) => Some(ClaimDenial::NotHighBidder {
                suffix,
                high_bidder,
            }),
            ClaimRule::AuctionPending(_) => Some(ClaimDenial::AuctionOpen { suffix }),
        }
    }
}

/// Determine the rule governing claims on `name`.
///
/// Consults the registry only when the name has a visible delimiter.
pub fn claim_rule<R>(name: &AccountName, registry: &R) -> Result<ClaimRule>
where
    R: ReservationRegistry + ?Sized,
{
    if !name.has_visible_delimiter() {
        return Ok(ClaimRule::Open);
    }
    let suffix = name.suffix();
    let rule = match registry.lookup(&suffix)? {
        None => ClaimRule::SuffixAccount(suffix),
        Some(bid) if bid.is_closed() => ClaimRule::AuctionWinner(bid.high_bidder),
        Some(_) => ClaimRule::AuctionPending(suffix),
    };
    Ok(rule)
}

/// Decide whether `claimant` may claim `name`.
///
/// Read-only: the registry is queried, never written.
pub fn check_claim<R>(name: &AccountName, claimant: &AccountName, registry: &R) -> Result<()>
where
    R: ReservationRegistry + ?Sized,
{
    let rule = claim_rule(name, registry)?;
    match rule.refusal(name.suffix(), claimant) {
        None => {
            debug!(%name, %claimant, ?rule, "claim permitted");
            Ok(())
        }
        Some(denial) => {
            debug!(%name, %claimant, %denial, "claim denied");
            Err(ArbitrationError::Denied {
                name: *name,
                claimant: *claimant,
                denial,
            })
        }
    }
}
