use crate::{handler, EntityId, IndexError, Store};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use binding::bank::ITokenBank;

/// Route a bank log to its handler by `topic0`.
///
/// Returns `Ok(None)` for logs that are not one of the five bank events.
pub fn project_log<S: Store>(log: &Log, store: &mut S) -> Result<Option<EntityId>, IndexError> {
    let Some(topic0) = log.topics().first() else {
        return Ok(None);
    };

    let id = match *topic0 {
        t if t == ITokenBank::Deposit::SIGNATURE_HASH => handler::handle_deposit(log, store)?,
        t if t == ITokenBank::DepositWithPermit2::SIGNATURE_HASH => {
            handler::handle_deposit_with_permit2(log, store)?
        }
        t if t == ITokenBank::TokenSupported::SIGNATURE_HASH => {
            handler::handle_token_supported(log, store)?
        }
        t if t == ITokenBank::UserTokenAdded::SIGNATURE_HASH => {
            handler::handle_user_token_added(log, store)?
        }
        t if t == ITokenBank::Withdraw::SIGNATURE_HASH => handler::handle_withdraw(log, store)?,
        _ => return Ok(None),
    };

    Ok(Some(id))
}
