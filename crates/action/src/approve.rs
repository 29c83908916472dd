use crate::{send_and_confirm, Action, FlowError};
use alloy_primitives::{Address, U256};
use balance::BalanceMonitor;
use binding::token::IERC20;
use client::Wallet;
use tracing::info;

/// How much a spender may pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAmount {
    /// `type(uint256).max`, never decremented by the token
    Unlimited,
    Limited(U256),
}

impl ApprovalAmount {
    pub const fn value(&self) -> U256 {
        match self {
            Self::Unlimited => U256::MAX,
            Self::Limited(amount) => *amount,
        }
    }
}

/// ERC20 `approve` of the bank or Permit2.
pub struct ApproveAction<W> {
    wallet: W,
    monitor: BalanceMonitor<W>,
    token: Address,
    spender: Address,
    amount: ApprovalAmount,
}

impl<W> ApproveAction<W>
where
    W: Wallet + Clone,
{
    pub fn new(
        wallet: W,
        monitor: BalanceMonitor<W>,
        token: Address,
        spender: Address,
        amount: ApprovalAmount,
    ) -> Self {
        Self {
            wallet,
            monitor,
            token,
            spender,
            amount,
        }
    }

    /// A limited approval must be covered by the owner's balance.
    async fn preflight(&self) -> Result<(), FlowError> {
        let ApprovalAmount::Limited(amount) = self.amount else {
            return Ok(());
        };

        if amount.is_zero() {
            return Err(FlowError::ZeroAmount);
        }

        let available = self
            .monitor
            .token_balance(self.token, self.wallet.address())
            .await?;
        if available < amount {
            return Err(FlowError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        Ok(())
    }
}

impl<W> Action for ApproveAction<W>
where
    W: Wallet + Clone,
{
    async fn is_ready(&self) -> eyre::Result<bool> {
        match self.preflight().await {
            Ok(()) => Ok(true),
            Err(FlowError::ReadFailure(reason)) => eyre::bail!("Read failed: {}", reason),
            Err(_) => Ok(false),
        }
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        let current = self
            .monitor
            .allowance(self.token, self.wallet.address(), self.spender)
            .await?;
        Ok(current >= self.amount.value())
    }

    async fn execute(&mut self) -> eyre::Result<crate::Result> {
        self.preflight().await?;

        let call = IERC20::approveCall {
            spender: self.spender,
            amount: self.amount.value(),
        };
        let receipt = send_and_confirm(&self.wallet, self.token, call).await?;

        info!(
            token = %self.token,
            spender = %self.spender,
            tx_hash = %receipt.tx_hash,
            "Approval confirmed"
        );

        Ok(receipt.into())
    }

    fn description(&self) -> String {
        match self.amount {
            ApprovalAmount::Unlimited => {
                format!("Approve {} to spend unlimited {}", self.spender, self.token)
            }
            ApprovalAmount::Limited(amount) => {
                format!("Approve {} to spend {} of {}", self.spender, amount, self.token)
            }
        }
    }
}
