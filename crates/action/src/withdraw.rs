use crate::{send_and_confirm, Action, FlowError};
use alloy_primitives::{Address, U256};
use balance::BalanceMonitor;
use binding::bank::ITokenBank;
use client::Wallet;
use tracing::info;

/// `TokenBank.withdraw` returning custodied tokens to the caller.
pub struct WithdrawAction<W> {
    wallet: W,
    monitor: BalanceMonitor<W>,
    token: Address,
    amount: U256,
    completed: Option<crate::Result>,
}

impl<W> WithdrawAction<W>
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

    pub async fn preflight(&self) -> Result<(), FlowError> {
        if self.amount.is_zero() {
            return Err(FlowError::ZeroAmount);
        }

        let held = self
            .monitor
            .bank_balance(self.token, self.wallet.address())
            .await?;
        if held < self.amount {
            return Err(FlowError::InsufficientBalance {
                required: self.amount,
                available: held,
            });
        }

        Ok(())
    }
}

impl<W> Action for WithdrawAction<W>
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
            eyre::bail!("Withdrawal already executed")
        }

        self.preflight().await?;

        let call = ITokenBank::withdrawCall {
            token: self.token,
            amount: self.amount,
        };
        let receipt = send_and_confirm(&self.wallet, self.monitor.bank(), call).await?;

        info!(
            token = %self.token,
            amount = %self.amount,
            tx_hash = %receipt.tx_hash,
            "Withdrawal confirmed"
        );

        let result = crate::Result::from(receipt);
        self.completed = Some(result);
        Ok(result)
    }

    fn description(&self) -> String {
        format!(
            "Withdraw {} of {} from bank {}",
            self.amount,
            self.token,
            self.monitor.bank()
        )
    }
}
