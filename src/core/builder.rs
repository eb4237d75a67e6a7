//! Fluent construction and signing of magistrate transactions.

use crate::config::{Milestone, DEFAULT_NETWORK};
use crate::core::asset::{
    Asset, BridgechainRegistrationAsset, BridgechainResignationAsset, BridgechainUpdateAsset,
    BusinessRegistrationAsset, BusinessResignationAsset, BusinessUpdateAsset, EntityAsset,
    MAGISTRATE_TYPE_GROUP,
};
use crate::core::fee;
use crate::core::registry::TransactionRegistry;
use crate::core::transaction::{signing_hash, Transaction, TransactionData, TransactionFactory, TRANSACTION_VERSION};
use crate::error::Result;
use crate::signature::KeyPair;

/// Starts from version 2, the default network, nonce 1 and the default static fee of the asset.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    data: TransactionData,
}

impl TransactionBuilder {
    pub fn new(asset: Asset) -> Self {
        let fee = fee::static_fee(&Milestone::default(), &asset);
        Self {
            data: TransactionData {
                id: None,
                version: TRANSACTION_VERSION,
                network: DEFAULT_NETWORK,
                type_group: MAGISTRATE_TYPE_GROUP,
                type_id: asset.transaction_type().as_u16(),
                nonce: 1,
                sender_public_key: String::new(),
                fee,
                amount: 0,
                asset,
                signature: None,
            },
        }
    }

    pub fn business_registration(asset: BusinessRegistrationAsset) -> Self {
        Self::new(Asset::BusinessRegistration(asset))
    }

    pub fn business_resignation() -> Self {
        Self::new(Asset::BusinessResignation(BusinessResignationAsset {}))
    }

    pub fn business_update(asset: BusinessUpdateAsset) -> Self {
        Self::new(Asset::BusinessUpdate(asset))
    }

    pub fn bridgechain_registration(asset: BridgechainRegistrationAsset) -> Self {
        Self::new(Asset::BridgechainRegistration(asset))
    }

    pub fn bridgechain_resignation(genesis_hash: impl Into<String>) -> Self {
        Self::new(Asset::BridgechainResignation(BridgechainResignationAsset {
            bridgechain_id: genesis_hash.into(),
        }))
    }

    pub fn bridgechain_update(asset: BridgechainUpdateAsset) -> Self {
        Self::new(Asset::BridgechainUpdate(asset))
    }

    pub fn entity(asset: EntityAsset) -> Self {
        Self::new(Asset::Entity(asset))
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.data.nonce = nonce;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.data.fee = fee;
        self
    }

    /// Sets the fee to the static fee `milestone` prescribes for the asset.
    pub fn static_fee(mut self, milestone: &Milestone) -> Self {
        self.data.fee = fee::static_fee(milestone, &self.data.asset);
        self
    }

    pub fn network(mut self, network: u8) -> Self {
        self.data.network = network;
        self
    }

    pub fn sender_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.data.sender_public_key = public_key.into();
        self
    }

    /// Sets the sender key from `passphrase` and signs everything set so far.
    pub fn sign(mut self, passphrase: &str, registry: &TransactionRegistry) -> Result<Self> {
        let keys = KeyPair::from_passphrase(passphrase)?;
        self.data.sender_public_key = keys.public_key_hex();
        self.data.signature = None;
        let hash = signing_hash(&self.data, registry)?;
        self.data.signature = Some(keys.sign_hash(&hash)?);
        Ok(self)
    }

    pub fn data(&self) -> &TransactionData {
        &self.data
    }

    pub fn into_data(self) -> TransactionData {
        self.data
    }

    pub fn build(self, registry: &TransactionRegistry) -> Result<Transaction> {
        TransactionFactory::new(registry).from_data(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticFees;
    use crate::core::asset::{EntityAction, EntityData, EntitySubType, EntityType};

    fn business() -> BusinessRegistrationAsset {
        BusinessRegistrationAsset {
            name: "businessName".to_string(),
            website: "http://www.website.com".to_string(),
            vat: None,
            repository: None,
        }
    }

    #[test]
    fn test_defaults_follow_asset() {
        let builder = TransactionBuilder::business_registration(business());
        let data = builder.data();
        assert_eq!(data.version, 2);
        assert_eq!(data.type_group, 2);
        assert_eq!(data.type_id, 0);
        assert_eq!(data.fee, fee::BUSINESS_REGISTRATION_FEE);

        let resign = TransactionBuilder::entity(EntityAsset {
            entity_type: EntityType::Module,
            sub_type: EntitySubType::None,
            action: EntityAction::Resign,
            registration_id: Some("ab".repeat(32)),
            data: EntityData::default(),
        });
        assert_eq!(resign.data().type_id, 6);
        assert_eq!(resign.data().fee, fee::ENTITY_RESIGNATION_FEE);
    }

    #[test]
    fn test_static_fee_from_milestone() {
        let mut fees = StaticFees::default();
        fees.set("businessResignation", 7);
        let milestone = Milestone {
            height: 1,
            fees,
            aip36: true,
        };
        let builder = TransactionBuilder::business_resignation().static_fee(&milestone);
        assert_eq!(builder.data().fee, 7);
    }

    #[test]
    fn test_sign_and_build() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let tx = TransactionBuilder::business_registration(business())
            .nonce(3)
            .sign("passphrase", &registry)
            .unwrap()
            .build(&registry)
            .unwrap();
        assert_eq!(tx.nonce(), 3);
        assert_eq!(
            tx.sender_public_key(),
            KeyPair::from_passphrase("passphrase").unwrap().public_key_hex()
        );
        assert!(tx.verify().unwrap());
    }

    #[test]
    fn test_changing_data_after_signing_breaks_signature() {
        let registry = TransactionRegistry::with_magistrate_types().unwrap();
        let tx = TransactionBuilder::business_resignation()
            .sign("passphrase", &registry)
            .unwrap()
            .nonce(9)
            .build(&registry)
            .unwrap();
        assert!(!tx.verify().unwrap());
    }
}
