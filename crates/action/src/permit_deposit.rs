//! Gas-less deposit through a Permit2 signature.
//!
//! One attempt walks the owner through:
//!
//! 1. reading balance and the Permit2 allowance,
//! 2. approving Permit2 once if the allowance is short,
//! 3. signing a `PermitTransferFrom` for the bank,
//! 4. submitting `depositWithPermit2` and waiting for one confirmation,
//! 5. re-reading balances.
//!
//! Each step consumes the previous step's value, so a signature can only be
//! requested after the allowance was checked, and a deposit only submitted
//! with a signature in hand.

use crate::{
    confirm, send_and_confirm, stage::StageTracker, submit, Action, FlowError, Stage,
};
use alloy_primitives::{Address, TxHash, U256};
use balance::{BalanceMonitor, Balances};
use binding::{bank::ITokenBank, token::IERC20};
use client::{Receipt, Wallet};
use config::NetworkConfig;
use permit::{permit2_domain, unix_now, PermitBuilder, PermitRequest, SignedPermit};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};
use tracing::{info, warn};

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOutcome {
    pub token: Address,
    pub amount: U256,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Receipt of the Permit2 approval, when one was needed
    pub approval: Option<Receipt>,
    pub permit: SignedPermit,
    pub before: Balances,
    pub after: Balances,
    /// Whether the refreshed balances moved by exactly `amount`
    pub delta_verified: bool,
}

/// State owned by one attempt.
#[derive(Debug, Clone, Copy)]
struct Attempt {
    token: Address,
    amount: U256,
    owner: Address,
    before: Balances,
}

struct AllowanceChecked {
    attempt: Attempt,
    needs_approval: bool,
}

struct Approved {
    attempt: Attempt,
    approval: Option<Receipt>,
}

struct Signed {
    attempt: Attempt,
    approval: Option<Receipt>,
    permit: SignedPermit,
}

struct Submitted {
    attempt: Attempt,
    approval: Option<Receipt>,
    permit: SignedPermit,
    tx_hash: TxHash,
}

struct Confirmed {
    attempt: Attempt,
    approval: Option<Receipt>,
    permit: SignedPermit,
    receipt: Receipt,
}

/// Releases the in-flight flag when the attempt ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, FlowError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FlowError::AttemptInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Permit2 deposit pipeline for one wallet against one bank.
pub struct PermitDepositFlow<W> {
    wallet: W,
    monitor: BalanceMonitor<W>,
    chain_id: u64,
    permits: PermitBuilder,
    in_flight: AtomicBool,
    stages: Mutex<StageTracker>,
}

impl<W> PermitDepositFlow<W>
where
    W: Wallet + Clone,
{
    pub fn new(wallet: W, network: &NetworkConfig, permits: PermitBuilder) -> Self {
        let monitor = BalanceMonitor::new(wallet.clone(), network.token_bank, network.permit2);
        Self {
            wallet,
            monitor,
            chain_id: network.chain_id,
            permits,
            in_flight: AtomicBool::new(false),
            stages: Mutex::new(StageTracker::default()),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stages().current()
    }

    /// Every stage entered since the flow was created.
    pub fn history(&self) -> Vec<Stage> {
        self.stages().history().to_vec()
    }

    pub const fn bank(&self) -> Address {
        self.monitor.bank()
    }

    /// Check that an attempt could start, without moving through any stage.
    pub async fn preflight(&self, token: Address, amount: U256) -> Result<(), FlowError> {
        self.inspect(token, amount).await.map(|_| ())
    }

    /// Run one attempt to completion.
    ///
    /// On error the flow is left in [`Stage::Failed`]; the next call starts
    /// over from `Idle`.
    pub async fn run(&self, token: Address, amount: U256) -> Result<DepositOutcome, FlowError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let result = self.attempt(token, amount).await;
        if let Err(err) = &result {
            warn!(%token, %amount, stage = %self.stage(), error = %err, "Permit deposit failed");
            self.stages().fail();
        }
        result
    }

    async fn attempt(&self, token: Address, amount: U256) -> Result<DepositOutcome, FlowError> {
        self.stages().begin()?;

        let checked = self.check(token, amount).await?;
        let approved = self.approve(checked).await?;
        let signed = self.sign(approved).await?;
        let submitted = self.submit(signed).await?;
        let confirmed = self.confirm(submitted).await?;
        self.refresh(confirmed).await
    }

    async fn inspect(&self, token: Address, amount: U256) -> Result<AllowanceChecked, FlowError> {
        let actual = self.wallet.chain_id().await?;
        if actual != self.chain_id {
            return Err(FlowError::WrongChain {
                expected: self.chain_id,
                actual,
            });
        }

        if amount.is_zero() {
            return Err(FlowError::ZeroAmount);
        }

        let owner = self.wallet.address();
        let (before, allowance) = tokio::try_join!(
            self.monitor.balances(token, owner),
            self.monitor.allowance(token, owner, self.monitor.permit2()),
        )?;

        if before.token_balance < amount {
            return Err(FlowError::InsufficientBalance {
                required: amount,
                available: before.token_balance,
            });
        }

        Ok(AllowanceChecked {
            attempt: Attempt {
                token,
                amount,
                owner,
                before,
            },
            needs_approval: allowance < amount,
        })
    }

    async fn check(&self, token: Address, amount: U256) -> Result<AllowanceChecked, FlowError> {
        let checked = self.inspect(token, amount).await?;
        info!(
            %token,
            %amount,
            needs_approval = checked.needs_approval,
            "Allowance checked"
        );
        Ok(checked)
    }

    async fn approve(&self, checked: AllowanceChecked) -> Result<Approved, FlowError> {
        let AllowanceChecked {
            attempt,
            needs_approval,
        } = checked;
        if !needs_approval {
            return Ok(Approved {
                attempt,
                approval: None,
            });
        }

        self.advance(Stage::ApprovingOnChain)?;
        let call = IERC20::approveCall {
            spender: self.monitor.permit2(),
            amount: U256::MAX,
        };
        let receipt = send_and_confirm(&self.wallet, attempt.token, call).await?;

        Ok(Approved {
            attempt,
            approval: Some(receipt),
        })
    }

    async fn sign(&self, approved: Approved) -> Result<Signed, FlowError> {
        let Approved { attempt, approval } = approved;
        self.advance(Stage::AwaitingSignature)?;

        let request = PermitRequest {
            owner: attempt.owner,
            token: attempt.token,
            amount: attempt.amount,
            spender: self.monitor.bank(),
        };
        let message = self.permits.build(&request, unix_now())?;
        let domain = permit2_domain(self.chain_id, self.monitor.permit2());
        let signature = self.wallet.sign_typed_data(&message, &domain).await?;

        Ok(Signed {
            attempt,
            approval,
            permit: SignedPermit { message, signature },
        })
    }

    async fn submit(&self, signed: Signed) -> Result<Submitted, FlowError> {
        let Signed {
            attempt,
            approval,
            permit,
        } = signed;
        self.advance(Stage::SubmittingDeposit)?;

        let call = ITokenBank::depositWithPermit2Call {
            token: attempt.token,
            amount: attempt.amount,
            permit: permit.onchain(),
            signature: permit.signature.clone(),
        };
        let tx_hash = submit(&self.wallet, self.monitor.bank(), call).await?;

        Ok(Submitted {
            attempt,
            approval,
            permit,
            tx_hash,
        })
    }

    async fn confirm(&self, submitted: Submitted) -> Result<Confirmed, FlowError> {
        let Submitted {
            attempt,
            approval,
            permit,
            tx_hash,
        } = submitted;
        self.advance(Stage::AwaitingReceipt)?;

        let receipt = confirm(&self.wallet, tx_hash).await?;

        Ok(Confirmed {
            attempt,
            approval,
            permit,
            receipt,
        })
    }

    async fn refresh(&self, confirmed: Confirmed) -> Result<DepositOutcome, FlowError> {
        let Confirmed {
            attempt,
            approval,
            permit,
            receipt,
        } = confirmed;
        self.advance(Stage::Refreshing)?;

        let after = self.monitor.balances(attempt.token, attempt.owner).await?;
        let delta_verified = attempt.before.token_balance.checked_sub(attempt.amount)
            == Some(after.token_balance)
            && attempt.before.bank_balance.checked_add(attempt.amount) == Some(after.bank_balance);
        if !delta_verified {
            // Other transfers may have landed in between; the receipt stands.
            warn!(
                tx_hash = %receipt.tx_hash,
                before = ?attempt.before,
                after = ?after,
                amount = %attempt.amount,
                "Balances did not move by the deposited amount"
            );
        }

        self.advance(Stage::Idle)?;
        info!(
            tx_hash = %receipt.tx_hash,
            token_balance = %after.token_balance,
            bank_balance = %after.bank_balance,
            "Permit deposit complete"
        );

        Ok(DepositOutcome {
            token: attempt.token,
            amount: attempt.amount,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            approval,
            permit,
            before: attempt.before,
            after,
            delta_verified,
        })
    }

    fn advance(&self, next: Stage) -> Result<(), FlowError> {
        self.stages().advance(next)
    }

    fn stages(&self) -> MutexGuard<'_, StageTracker> {
        self.stages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`PermitDepositFlow`] behind the [`Action`] interface.
pub struct PermitDepositAction<W> {
    flow: PermitDepositFlow<W>,
    token: Address,
    amount: U256,
    outcome: Option<DepositOutcome>,
}

impl<W> PermitDepositAction<W>
where
    W: Wallet + Clone,
{
    pub const fn new(flow: PermitDepositFlow<W>, token: Address, amount: U256) -> Self {
        Self {
            flow,
            token,
            amount,
            outcome: None,
        }
    }

    pub const fn outcome(&self) -> Option<&DepositOutcome> {
        self.outcome.as_ref()
    }

    pub const fn flow(&self) -> &PermitDepositFlow<W> {
        &self.flow
    }
}

impl<W> Action for PermitDepositAction<W>
where
    W: Wallet + Clone,
{
    async fn is_ready(&self) -> eyre::Result<bool> {
        match self.flow.preflight(self.token, self.amount).await {
            Ok(()) => Ok(true),
            Err(FlowError::ReadFailure(reason)) => eyre::bail!("Read failed: {}", reason),
            Err(_) => Ok(false),
        }
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        Ok(self.outcome.is_some())
    }

    async fn execute(&mut self) -> eyre::Result<crate::Result> {
        if self.outcome.is_some() {
            eyre::bail!("Permit deposit already executed")
        }

        let outcome = self.flow.run(self.token, self.amount).await?;
        let result = crate::Result {
            tx_hash: outcome.tx_hash,
            block_number: outcome.block_number,
            gas_used: Some(U256::from(outcome.gas_used)),
        };
        self.outcome = Some(outcome);
        Ok(result)
    }

    fn description(&self) -> String {
        format!(
            "Deposit {} of {} into bank {} with a Permit2 signature",
            self.amount,
            self.token,
            self.flow.bank()
        )
    }
}
