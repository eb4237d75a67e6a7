//! Static fees for the magistrate transaction types.
//!
//! There is no fee market for these types: a transaction must carry exactly the fee the active
//! milestone prescribes. Milestones may override any entry; missing entries fall back to the
//! defaults below. Amounts are in arktoshi (1 token = 100_000_000 arktoshi).

use crate::config::{Milestone, StaticFees};
use crate::core::asset::{Asset, EntityAction};

/// Minimal units per whole token.
pub const ARKTOSHI_PER_TOKEN: u64 = 100_000_000;

pub const BUSINESS_REGISTRATION_FEE: u64 = 50 * ARKTOSHI_PER_TOKEN;
pub const BUSINESS_UPDATE_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;
pub const BUSINESS_RESIGNATION_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;
pub const BRIDGECHAIN_REGISTRATION_FEE: u64 = 50 * ARKTOSHI_PER_TOKEN;
pub const BRIDGECHAIN_UPDATE_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;
pub const BRIDGECHAIN_RESIGNATION_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;
pub const ENTITY_REGISTRATION_FEE: u64 = 50 * ARKTOSHI_PER_TOKEN;
pub const ENTITY_UPDATE_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;
pub const ENTITY_RESIGNATION_FEE: u64 = 5 * ARKTOSHI_PER_TOKEN;

/// Fee-table key for an asset. Entity fees depend on the action, so they get their own keys.
pub fn fee_key(asset: &Asset) -> &'static str {
    match asset {
        Asset::Entity(entity) => match entity.action {
            EntityAction::Register => "entityRegistration",
            EntityAction::Update => "entityUpdate",
            EntityAction::Resign => "entityResignation",
        },
        other => other.transaction_type().key(),
    }
}

/// Hardcoded default for a fee-table key.
pub fn default_static_fee(key: &str) -> Option<u64> {
    let fee = match key {
        "businessRegistration" => BUSINESS_REGISTRATION_FEE,
        "businessUpdate" => BUSINESS_UPDATE_FEE,
        "businessResignation" => BUSINESS_RESIGNATION_FEE,
        "bridgechainRegistration" => BRIDGECHAIN_REGISTRATION_FEE,
        "bridgechainUpdate" => BRIDGECHAIN_UPDATE_FEE,
        "bridgechainResignation" => BRIDGECHAIN_RESIGNATION_FEE,
        "entityRegistration" => ENTITY_REGISTRATION_FEE,
        "entityUpdate" => ENTITY_UPDATE_FEE,
        "entityResignation" => ENTITY_RESIGNATION_FEE,
        _ => return None,
    };
    Some(fee)
}

/// Looks `key` up in `fees`, falling back to the default. Unknown keys resolve to 0.
pub fn resolve_static_fee(fees: &StaticFees, key: &str) -> u64 {
    fees.get(key).or_else(|| default_static_fee(key)).unwrap_or(0)
}

/// Static fee of `asset` under `milestone`.
pub fn static_fee(milestone: &Milestone, asset: &Asset) -> u64 {
    resolve_static_fee(&milestone.fees, fee_key(asset))
}

/// Formats an arktoshi amount as whole tokens with eight decimals.
pub fn format_arktoshi(amount: u64) -> String {
    format!(
        "{}.{:08}",
        amount / ARKTOSHI_PER_TOKEN,
        amount % ARKTOSHI_PER_TOKEN
    )
}
