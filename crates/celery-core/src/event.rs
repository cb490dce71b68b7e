//! Notifications emitted by the staking engine for external observers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AccountId, AccountStatus, Amount};

/// Engine-level events. Observers subscribe through an [`EventBus`]; the
/// engine never reads them back.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum StakeEvent {
    /// An account entered a new status.
    AccountStatusChanged {
        account: AccountId,
        status: AccountStatus,
    },
    /// Tokens were pulled from the holder's wallet into the staking pool.
    BalanceIncreasedAndStaked {
        account: AccountId,
        #[bincode(with_serde)]
        amount: Amount,
    },
    /// Vested tokens were released to the holder's wallet.
    PayoutCollected {
        account: AccountId,
        #[bincode(with_serde)]
        amount: Amount,
    },
    /// An early withdrawal was executed. `amount` reached the wallet,
    /// `penalty` was forfeited.
    ForcePayoutExecuted {
        account: AccountId,
        #[bincode(with_serde)]
        amount: Amount,
        #[bincode(with_serde)]
        penalty: Amount,
    },
}

impl StakeEvent {
    pub fn account(&self) -> &AccountId {
        match self {
            Self::AccountStatusChanged { account, .. }
            | Self::BalanceIncreasedAndStaked { account, .. }
            | Self::PayoutCollected { account, .. }
            | Self::ForcePayoutExecuted { account, .. } => account,
        }
    }
}

impl fmt::Display for StakeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountStatusChanged { account, status } => {
                write!(f, "AccountStatus({account}, {})", status.code())
            }
            Self::BalanceIncreasedAndStaked { account, amount } => {
                write!(f, "IncreaseBalanceAndStake({account}, {amount})")
            }
            Self::PayoutCollected { account, amount } => {
                write!(f, "CollectPayout({account}, {amount})")
            }
            Self::ForcePayoutExecuted { account, amount, penalty } => {
                write!(f, "ForcePayout({account}, {amount}, penalty {penalty})")
            }
        }
    }
}

/// Synchronous fan-out bus for [`StakeEvent`]s.
///
/// Listeners run inline on the emitting call; keep them cheap.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&StakeEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StakeEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish(&self, event: &StakeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
