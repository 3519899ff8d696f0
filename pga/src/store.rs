use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::Address;

use crate::model::{DeliveryAgreement, GuaranteeBallot, PoolGuaranteeApplication};

pub trait PgaStore {
    fn application(&self, id: &str) -> Result<Option<PoolGuaranteeApplication>, StoreError>;
    fn put_application(&mut self, app: &PoolGuaranteeApplication) -> Result<(), StoreError>;
    fn applications(&self) -> Result<Vec<PoolGuaranteeApplication>, StoreError>;

    fn guarantee_ballot(
        &self,
        pga_id: &str,
        financier: &Address,
    ) -> Result<Option<GuaranteeBallot>, StoreError>;
    fn put_guarantee_ballot(&mut self, pga_id: &str, ballot: &GuaranteeBallot) -> Result<(), StoreError>;

    fn agreement(&self, id: &str) -> Result<Option<DeliveryAgreement>, StoreError>;
    fn put_agreement(&mut self, agreement: &DeliveryAgreement) -> Result<(), StoreError>;
}

fn ballot_key(pga_id: &str, financier: &Address) -> Vec<u8> {
    key::compose(&[pga_id.as_bytes(), financier.as_bytes()])
}

impl PgaStore for StoreTxn<'_> {
    fn application(&self, id: &str) -> Result<Option<PoolGuaranteeApplication>, StoreError> {
        self.get(Table::Applications, &key::text(id))
    }

    fn put_application(&mut self, app: &PoolGuaranteeApplication) -> Result<(), StoreError> {
        self.put(Table::Applications, key::text(&app.id), app)
    }

    fn applications(&self) -> Result<Vec<PoolGuaranteeApplication>, StoreError> {
        Ok(self
            .scan::<PoolGuaranteeApplication>(Table::Applications, &[])?
            .into_iter()
            .map(|(_, app)| app)
            .collect())
    }

    fn guarantee_ballot(
        &self,
        pga_id: &str,
        financier: &Address,
    ) -> Result<Option<GuaranteeBallot>, StoreError> {
        self.get(Table::ApplicationVotes, &ballot_key(pga_id, financier))
    }

    fn put_guarantee_ballot(&mut self, pga_id: &str, ballot: &GuaranteeBallot) -> Result<(), StoreError> {
        self.put(
            Table::ApplicationVotes,
            ballot_key(pga_id, &ballot.financier),
            ballot,
        )
    }

    fn agreement(&self, id: &str) -> Result<Option<DeliveryAgreement>, StoreError> {
        self.get(Table::DeliveryAgreements, &key::text(id))
    }

    fn put_agreement(&mut self, agreement: &DeliveryAgreement) -> Result<(), StoreError> {
        self.put(Table::DeliveryAgreements, key::text(&agreement.id), agreement)
    }
}
