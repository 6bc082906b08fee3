use std::collections::BTreeSet;

use pst_types::AccountName;

use crate::error::{EngineError, EngineResult};

/// The host's proof of which accounts authorized the current call.
pub trait Authenticator: Send + Sync {
    /// Whether the call carries `account`'s authority.
    fn has_authority(&self, account: &AccountName) -> bool;

    /// Fail with `MissingAuthority` unless the call carries `account`'s
    /// authority.
    fn require_auth(&self, account: &AccountName) -> EngineResult<()> {
        if self.has_authority(account) {
            Ok(())
        } else {
            Err(EngineError::MissingAuthority { account: *account })
        }
    }
}

/// The set of accounts that signed a call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signers(BTreeSet<AccountName>);

impl Signers {
    pub fn new(accounts: impl IntoIterator<Item = AccountName>) -> Self {
        Self(accounts.into_iter().collect())
    }

    /// A call signed by exactly one account.
    pub fn single(account: AccountName) -> Self {
        Self::new([account])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Authenticator for Signers {
    fn has_authority(&self, account: &AccountName) -> bool {
        self.0.contains(account)
    }
}

/// Accepts every account. For hosts that authenticate before calling in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustAll;

impl Authenticator for TrustAll {
    fn has_authority(&self, _account: &AccountName) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn name(s: &str) -> AccountName {
        AccountName::parse(s).unwrap()
    }

    #[test]
    fn signers_authorize_members_only() {
        let signers = Signers::new([name("alice"), name("bob")]);
        signers.require_auth(&name("alice")).unwrap();
        signers.require_auth(&name("bob")).unwrap();

        let err = signers.require_auth(&name("carol")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAuthority);
        assert!(err.to_string().contains("carol"));
    }

    #[test]
    fn empty_signers_authorize_nobody() {
        let signers = Signers::default();
        assert!(signers.is_empty());
        assert!(!signers.has_authority(&name("alice")));
    }

    #[test]
    fn trust_all_authorizes_everyone() {
        TrustAll.require_auth(&name("anyone")).unwrap();
    }
}
