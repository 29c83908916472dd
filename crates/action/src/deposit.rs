use crate::{send_and_confirm, Action, FlowError};
use alloy_primitives::{Address, U256};
use balance::BalanceMonitor;
use binding::bank::ITokenBank;
use client::Wallet;
use tracing::info;

/// Plain `TokenBank.deposit` pulling tokens through a prior ERC20 approval.
pub struct DepositAction<W> {
    wallet: W,
    monitor: BalanceMonitor<W>,
    token: Address,
    amount: U256,
    completed: Option<crate::Result>,
}

impl<W> DepositAction<W>
where
    W: Wallet + Clone,
{
    pub const fn new(
        wallet: W,
        monitor: BalanceMonitor<W>,
        token: Address,
        amount: U256,
    ) -> Self {
        Self {
            wallet,
            monitor,
            token,
            amount,
            completed: None,
        }
    }

    /// Check amount, balance and the bank's allowance.
    pub async fn preflight(&self) -> Result<(), FlowError> {
        if self.amount.is_zero() {
            return Err(FlowError::ZeroAmount);
        }

        let owner = self.wallet.address();
        let (balance, allowance) = tokio::try_join!(
            self.monitor.token_balance(self.token, owner),
            self.monitor.allowance(self.token, owner, self.monitor.bank()),
        )?;

        if balance < self.amount {
            return Err(FlowError::InsufficientBalance {
                required: self.amount,
                available: balance,
            });
        }
        if allowance < self.amount {
            return Err(FlowError::InsufficientAllowance {
                required: self.amount,
                available: allowance,
            });
        }

        Ok(())
    }
}

impl<W> Action for DepositAction<W>
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
        Ok(self.completed.is_some())
    }

    async fn execute(&mut self) -> eyre::Result<crate::Result> {
        if self.completed.is_some() {
            eyre::bail!("Deposit already executed")
        }

        self.preflight().await?;

        let call = ITokenBank::depositCall {
            token: self.token,
            amount: self.amount,
        };
        let receipt = send_and_confirm(&self.wallet, self.monitor.bank(), call).await?;

        info!(
            token = %self.token,
            amount = %self.amount,
            tx_hash = %receipt.tx_hash,
            "Deposit confirmed"
        );

        let result = crate::Result::from(receipt);
        self.completed = Some(result);
        Ok(result)
    }

    fn description(&self) -> String {
        format!(
            "Deposit {} of {} into bank {}",
            self.amount,
            self.token,
            self.monitor.bank()
        )
    }
}
