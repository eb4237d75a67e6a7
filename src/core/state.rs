//! Wallet state: balances, nonces and the typed magistrate attributes, plus the repository
//! abstraction handlers mutate it through.
//!
//! # Determinism
//! Wallets and index entries live in ordered maps, so iteration order (and therefore the state root)
//! depends only on content.
//!
//! # Invariants
//! - A wallet holds at most one business.
//! - An index key maps to every wallet whose indexer yields it; reindexing a wallet only touches its own membership.
//! - `restore(&snapshot())` restores the repository exactly, indexes included.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::asset::{BridgechainRegistrationAsset, BusinessRegistrationAsset, EntityData, EntitySubType, EntityType};
use crate::error::MagistrateError;

/// Compressed public key as lowercase hex.
pub type PublicKey = String;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown wallet index {0}")]
    UnknownIndex(String),

    #[error("Wallet index {0} is already registered")]
    DuplicateIndex(String),

    #[error("Failed to encode wallet state: {0}")]
    Encoding(String),
}

impl From<StateError> for MagistrateError {
    fn from(err: StateError) -> Self {
        MagistrateError::State(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgechainAttributes {
    pub bridgechain_asset: BridgechainRegistrationAsset,
    pub bridgechain_id: u64,
    #[serde(default)]
    pub resigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAttributes {
    pub business_asset: BusinessRegistrationAsset,
    pub business_id: u64,
    #[serde(default)]
    pub resigned: bool,
    /// Keyed by genesis hash.
    #[serde(default)]
    pub bridgechains: BTreeMap<String, BridgechainAttributes>,
}

impl BusinessAttributes {
    pub fn new(business_asset: BusinessRegistrationAsset, business_id: u64) -> Self {
        Self {
            business_asset,
            business_id,
            resigned: false,
            bridgechains: BTreeMap::new(),
        }
    }

    /// Bridgechain with the given numeric id, with its genesis hash.
    pub fn bridgechain_by_id(&self, bridgechain_id: u64) -> Option<(&String, &BridgechainAttributes)> {
        self.bridgechains
            .iter()
            .find(|(_, bridgechain)| bridgechain.bridgechain_id == bridgechain_id)
    }

    pub fn bridgechain_by_id_mut(&mut self, bridgechain_id: u64) -> Option<&mut BridgechainAttributes> {
        self.bridgechains
            .values_mut()
            .find(|bridgechain| bridgechain.bridgechain_id == bridgechain_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAttributes {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub sub_type: EntitySubType,
    pub data: EntityData,
    #[serde(default)]
    pub resigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateAttributes {
    pub username: String,
}

/// Everything the magistrate types read or write on a wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessAttributes>,
    /// Keyed by the id of the registering transaction.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityAttributes>,
    /// Set by the (external) delegate registration type; read by the delegate entity hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<DelegateAttributes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    public_key: PublicKey,
    pub balance: u64,
    pub nonce: u64,
    attributes: WalletAttributes,
}

impl Wallet {
    pub fn new(public_key: impl Into<PublicKey>) -> Self {
        Self {
            public_key: public_key.into(),
            balance: 0,
            nonce: 0,
            attributes: WalletAttributes::default(),
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn attributes(&self) -> &WalletAttributes {
        &self.attributes
    }

    pub fn reset_attributes(&mut self) {
        self.attributes = WalletAttributes::default();
    }

    pub fn has_business(&self) -> bool {
        self.attributes.business.is_some()
    }

    pub fn business(&self) -> Option<&BusinessAttributes> {
        self.attributes.business.as_ref()
    }

    pub fn business_mut(&mut self) -> Option<&mut BusinessAttributes> {
        self.attributes.business.as_mut()
    }

    pub fn set_business(&mut self, business: BusinessAttributes) {
        self.attributes.business = Some(business);
    }

    pub fn forget_business(&mut self) -> Option<BusinessAttributes> {
        self.attributes.business.take()
    }

    pub fn bridgechain(&self, genesis_hash: &str) -> Option<&BridgechainAttributes> {
        self.business()?.bridgechains.get(genesis_hash)
    }

    pub fn entities(&self) -> &BTreeMap<String, EntityAttributes> {
        &self.attributes.entities
    }

    pub fn entity(&self, registration_id: &str) -> Option<&EntityAttributes> {
        self.attributes.entities.get(registration_id)
    }

    pub fn entity_mut(&mut self, registration_id: &str) -> Option<&mut EntityAttributes> {
        self.attributes.entities.get_mut(registration_id)
    }

    pub fn set_entity(&mut self, registration_id: impl Into<String>, entity: EntityAttributes) {
        self.attributes.entities.insert(registration_id.into(), entity);
    }

    pub fn forget_entity(&mut self, registration_id: &str) -> Option<EntityAttributes> {
        self.attributes.entities.remove(registration_id)
    }

    pub fn delegate(&self) -> Option<&DelegateAttributes> {
        self.attributes.delegate.as_ref()
    }

    pub fn set_delegate(&mut self, username: impl Into<String>) {
        self.attributes.delegate = Some(DelegateAttributes {
            username: username.into(),
        });
    }
}

/// Computes the index keys a wallet is reachable under.
pub type Indexer = fn(&Wallet) -> Vec<String>;

/// Capability set handlers use to read and mutate wallets.
pub trait WalletRepository {
    /// Returns the wallet for `public_key`, creating an empty one when absent.
    fn find_by_public_key(&mut self, public_key: &str) -> &mut Wallet;

    fn get(&self, public_key: &str) -> Option<&Wallet>;

    fn has(&self, public_key: &str) -> bool {
        self.get(public_key).is_some()
    }

    /// Recomputes every index entry of the wallet.
    fn reindex(&mut self, public_key: &str);

    fn register_index(&mut self, name: &str, indexer: Indexer) -> Result<(), StateError>;

    fn has_index(&self, name: &str) -> bool;

    /// Distinct wallets present in the index, ordered by public key.
    fn get_index(&self, name: &str) -> Result<Vec<&Wallet>, StateError>;

    /// First holder of `key`, ordered by public key.
    fn find_by_index(&self, name: &str, key: &str) -> Result<Option<&Wallet>, StateError>;

    /// Every wallet holding `key`, ordered by public key.
    fn find_all_by_index(&self, name: &str, key: &str) -> Result<Vec<&Wallet>, StateError>;
}

#[derive(Clone)]
struct WalletIndex {
    indexer: Indexer,
    /// key -> public keys of the wallets holding it
    entries: BTreeMap<String, BTreeSet<PublicKey>>,
    /// public key -> keys it currently owns
    owned: BTreeMap<PublicKey, BTreeSet<String>>,
}

impl fmt::Debug for WalletIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIndex")
            .field("entries", &self.entries)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}

impl WalletIndex {
    fn new(indexer: Indexer) -> Self {
        Self {
            indexer,
            entries: BTreeMap::new(),
            owned: BTreeMap::new(),
        }
    }

    fn index(&mut self, wallet: &Wallet) {
        let public_key = wallet.public_key();
        if let Some(previous) = self.owned.remove(public_key) {
            for key in previous {
                if let Some(holders) = self.entries.get_mut(&key) {
                    holders.remove(public_key);
                    if holders.is_empty() {
                        self.entries.remove(&key);
                    }
                }
            }
        }

        let keys: BTreeSet<String> = (self.indexer)(wallet).into_iter().collect();
        if keys.is_empty() {
            return;
        }
        for key in &keys {
            self.entries
                .entry(key.clone())
                .or_default()
                .insert(public_key.to_string());
        }
        self.owned.insert(public_key.to_string(), keys);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.owned.clear();
    }
}

/// Immutable view of every wallet at one point in time. Creation is an `Arc` clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    wallets: Arc<BTreeMap<PublicKey, Wallet>>,
}

impl WalletSnapshot {
    pub fn get(&self, public_key: &str) -> Option<&Wallet> {
        self.wallets.get(public_key)
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// SHA-256 over every wallet in public-key order.
    pub fn compute_state_root(&self) -> Result<String, StateError> {
        let mut hasher = Sha256::new();
        for wallet in self.wallets.values() {
            let encoded = serde_json::to_vec(wallet).map_err(|e| StateError::Encoding(e.to_string()))?;
            hasher.update(encoded);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Attributes only, keyed by public key. Wallets without attributes are left out.
    pub fn attributes(&self) -> BTreeMap<PublicKey, WalletAttributes> {
        self.wallets
            .iter()
            .filter(|(_, wallet)| *wallet.attributes() != WalletAttributes::default())
            .map(|(key, wallet)| (key.clone(), wallet.attributes().clone()))
            .collect()
    }
}

/// Ordered in-memory wallet store with secondary indexes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletRepository {
    wallets: Arc<BTreeMap<PublicKey, Wallet>>,
    indexes: BTreeMap<String, WalletIndex>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a wallet and indexes it.
    pub fn insert(&mut self, wallet: Wallet) {
        let public_key = wallet.public_key().to_string();
        Arc::make_mut(&mut self.wallets).insert(public_key.clone(), wallet);
        self.reindex(&public_key);
    }

    pub fn set_balance(&mut self, public_key: &str, balance: u64) {
        self.find_by_public_key(public_key).balance = balance;
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            wallets: Arc::clone(&self.wallets),
        }
    }

    /// Replaces every wallet with the snapshot's and rebuilds the indexes.
    pub fn restore(&mut self, snapshot: &WalletSnapshot) {
        self.wallets = Arc::clone(&snapshot.wallets);
        self.rebuild_indexes();
    }

    /// Clears the attributes of every wallet, keeping balances and nonces.
    pub fn reset_attributes(&mut self) {
        for wallet in Arc::make_mut(&mut self.wallets).values_mut() {
            wallet.reset_attributes();
        }
        self.rebuild_indexes();
    }

    fn rebuild_indexes(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
            for wallet in self.wallets.values() {
                index.index(wallet);
            }
        }
    }

    fn index(&self, name: &str) -> Result<&WalletIndex, StateError> {
        self.indexes
            .get(name)
            .ok_or_else(|| StateError::UnknownIndex(name.to_string()))
    }
}

impl WalletRepository for InMemoryWalletRepository {
    fn find_by_public_key(&mut self, public_key: &str) -> &mut Wallet {
        Arc::make_mut(&mut self.wallets)
            .entry(public_key.to_string())
            .or_insert_with(|| Wallet::new(public_key))
    }

    fn get(&self, public_key: &str) -> Option<&Wallet> {
        self.wallets.get(public_key)
    }

    fn reindex(&mut self, public_key: &str) {
        let Some(wallet) = self.wallets.get(public_key) else {
            return;
        };
        for index in self.indexes.values_mut() {
            index.index(wallet);
        }
    }

    fn register_index(&mut self, name: &str, indexer: Indexer) -> Result<(), StateError> {
        if self.indexes.contains_key(name) {
            return Err(StateError::DuplicateIndex(name.to_string()));
        }
        let mut index = WalletIndex::new(indexer);
        for wallet in self.wallets.values() {
            index.index(wallet);
        }
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    fn get_index(&self, name: &str) -> Result<Vec<&Wallet>, StateError> {
        let index = self.index(name)?;
        Ok(index
            .owned
            .keys()
            .filter_map(|public_key| self.wallets.get(public_key))
            .collect())
    }

    fn find_by_index(&self, name: &str, key: &str) -> Result<Option<&Wallet>, StateError> {
        Ok(self.find_all_by_index(name, key)?.into_iter().next())
    }

    fn find_all_by_index(&self, name: &str, key: &str) -> Result<Vec<&Wallet>, StateError> {
        let index = self.index(name)?;
        Ok(index
            .entries
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|public_key| self.wallets.get(public_key))
            .collect())
    }
}
