//! One handler per TokenBank event.
//!
//! A handler decodes its log, stamps the block metadata and saves exactly one
//! entity. When any metadata field is absent nothing is saved.

use crate::{
    entity::{Deposit, DepositWithPermit2, TokenSupported, UserTokenAdded, Withdraw},
    Entity, EntityId, EventMeta, IndexError, Store,
};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use binding::bank::ITokenBank;

fn event_meta(log: &Log) -> Result<(EntityId, EventMeta), IndexError> {
    let block_number = log
        .block_number
        .ok_or(IndexError::MissingField("blockNumber"))?;
    let block_timestamp = log
        .block_timestamp
        .ok_or(IndexError::MissingField("blockTimestamp"))?;
    let transaction_hash = log
        .transaction_hash
        .ok_or(IndexError::MissingField("transactionHash"))?;
    let log_index = log.log_index.ok_or(IndexError::MissingField("logIndex"))?;
    let log_index = i32::try_from(log_index).map_err(|_| IndexError::LogIndexOverflow(log_index))?;

    Ok((
        EntityId::new(transaction_hash, log_index),
        EventMeta {
            block_number,
            block_timestamp,
            transaction_hash,
        },
    ))
}

fn decode<E: SolEvent>(log: &Log) -> Result<E, IndexError> {
    log.log_decode::<E>()
        .map(|decoded| decoded.inner.data)
        .map_err(|e| IndexError::Decode(format!("{}: {}", E::SIGNATURE, e)))
}

fn save<S: Store>(store: &mut S, entity: Entity) -> EntityId {
    let id = entity.id();
    store.save(entity);
    id
}

pub fn handle_deposit<S: Store>(log: &Log, store: &mut S) -> Result<EntityId, IndexError> {
    let (id, meta) = event_meta(log)?;
    let event = decode::<ITokenBank::Deposit>(log)?;

    Ok(save(
        store,
        Entity::Deposit(Deposit {
            id,
            user: event.user,
            token: event.token,
            amount: event.amount,
            new_balance: event.newBalance,
            total_deposit: event.totalDeposit,
            meta,
        }),
    ))
}

pub fn handle_deposit_with_permit2<S: Store>(
    log: &Log,
    store: &mut S,
) -> Result<EntityId, IndexError> {
    let (id, meta) = event_meta(log)?;
    let event = decode::<ITokenBank::DepositWithPermit2>(log)?;

    Ok(save(
        store,
        Entity::DepositWithPermit2(DepositWithPermit2 {
            id,
            user: event.user,
            token: event.token,
            amount: event.amount,
            nonce: event.nonce,
            deadline: event.deadline,
            new_balance: event.newBalance,
            total_deposit: event.totalDeposit,
            meta,
        }),
    ))
}

pub fn handle_token_supported<S: Store>(log: &Log, store: &mut S) -> Result<EntityId, IndexError> {
    let (id, meta) = event_meta(log)?;
    let event = decode::<ITokenBank::TokenSupported>(log)?;

    Ok(save(
        store,
        Entity::TokenSupported(TokenSupported {
            id,
            token: event.token,
            token_count: event.tokenCount,
            meta,
        }),
    ))
}

pub fn handle_user_token_added<S: Store>(
    log: &Log,
    store: &mut S,
) -> Result<EntityId, IndexError> {
    let (id, meta) = event_meta(log)?;
    let event = decode::<ITokenBank::UserTokenAdded>(log)?;

    Ok(save(
        store,
        Entity::UserTokenAdded(UserTokenAdded {
            id,
            user: event.user,
            token: event.token,
            user_token_count: event.userTokenCount,
            meta,
        }),
    ))
}

pub fn handle_withdraw<S: Store>(log: &Log, store: &mut S) -> Result<EntityId, IndexError> {
    let (id, meta) = event_meta(log)?;
    let event = decode::<ITokenBank::Withdraw>(log)?;

    Ok(save(
        store,
        Entity::Withdraw(Withdraw {
            id,
            user: event.user,
            token: event.token,
            amount: event.amount,
            new_balance: event.newBalance,
            total_deposit: event.totalDeposit,
            meta,
        }),
    ))
}
