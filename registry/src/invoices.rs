//! Invoice lifecycle: Draft → Sent → Viewed → Paid, with Overdue and
//! Cancelled on the side.

use tradefin_access::{AccessGate, AccessStore};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_types::{Address, Amount, DocHash, Settlement, Timestamp};

use crate::error::RegistryError;
use crate::model::{Invoice, InvoiceStatus, NewInvoice};
use crate::params::RegistryParams;
use crate::store::RegistryStore;

pub struct InvoiceLedger {
    params: RegistryParams,
}

impl InvoiceLedger {
    pub fn new(params: RegistryParams) -> Self {
        Self { params }
    }

    /// Issue a draft invoice with the caller as payee.
    pub fn create<S>(
        &self,
        store: &mut S,
        caller: &Address,
        new: NewInvoice,
        now: Timestamp,
    ) -> Result<u64, RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let payee = IdentityResolver::resolve(store, caller)?;
        let payer = IdentityResolver::resolve(store, &new.payer)?;
        let number = new.number.trim();
        if number.is_empty() || number.len() > self.params.max_number_len {
            return Err(RegistryError::InvalidInvoiceNumber {
                max: self.params.max_number_len,
            });
        }
        if store.invoice_id_by_number(number)?.is_some() {
            return Err(RegistryError::DuplicateInvoiceNumber(number.to_string()));
        }
        if new.amount == 0 {
            return Err(RegistryError::ZeroAmount);
        }
        AccessGate::ensure_token_supported(store, &new.token)?;
        if payer.is_zero() || payee.is_zero() || payer == payee {
            return Err(RegistryError::InvalidParties);
        }
        if new.due_date <= now {
            return Err(RegistryError::DueDateInPast(new.due_date));
        }
        if new.description.chars().count() > self.params.max_text_len {
            return Err(RegistryError::TextTooLong {
                max: self.params.max_text_len,
            });
        }

        let id = store.next_invoice_id()?;
        let invoice = Invoice {
            id,
            number: number.to_string(),
            payer,
            payee,
            amount: new.amount,
            token: new.token,
            due_date: new.due_date,
            description: new.description,
            status: InvoiceStatus::Draft,
            created_at: now,
            paid_at: None,
            documents: Vec::new(),
        };
        store.put_invoice_number(&invoice.number, id)?;
        store.put_invoice(&invoice)?;
        tracing::info!(id, number = %invoice.number, %payee, %payer, amount = invoice.amount, "invoice created");
        Ok(id)
    }

    pub fn send<S>(&self, store: &mut S, id: u64, caller: &Address) -> Result<(), RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut invoice = load(store, id)?;
        if who != invoice.payee {
            return Err(RegistryError::Unauthorized(who));
        }
        expect_status(&invoice, &[InvoiceStatus::Draft])?;
        invoice.status = InvoiceStatus::Sent;
        store.put_invoice(&invoice)?;
        tracing::info!(id, "invoice sent");
        Ok(())
    }

    /// Record the payer's first view. Returns whether the status changed.
    pub fn mark_viewed<S>(&self, store: &mut S, id: u64, caller: &Address) -> Result<bool, RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut invoice = load(store, id)?;
        if who != invoice.payer {
            return Err(RegistryError::Unauthorized(who));
        }
        match invoice.status {
            InvoiceStatus::Sent => {
                invoice.status = InvoiceStatus::Viewed;
                store.put_invoice(&invoice)?;
                tracing::info!(id, "invoice viewed");
                Ok(true)
            }
            InvoiceStatus::Viewed => Ok(false),
            status => Err(RegistryError::InvalidStatus { id, status }),
        }
    }

    /// Anyone may flag an unpaid invoice once its due date has passed.
    pub fn mark_overdue<S>(&self, store: &mut S, id: u64, now: Timestamp) -> Result<(), RegistryError>
    where
        S: RegistryStore + AccessStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let mut invoice = load(store, id)?;
        expect_status(&invoice, &[InvoiceStatus::Sent, InvoiceStatus::Viewed])?;
        if now <= invoice.due_date {
            return Err(RegistryError::NotOverdue(invoice.due_date));
        }
        invoice.status = InvoiceStatus::Overdue;
        store.put_invoice(&invoice)?;
        tracing::info!(id, "invoice overdue");
        Ok(())
    }

    /// Payer settles the invoice in full; funds pass through custody to the
    /// payee.
    pub fn pay<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Settlement, RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut invoice = load(store, id)?;
        if who != invoice.payer {
            return Err(RegistryError::Unauthorized(who));
        }
        if !invoice.status.is_payable() {
            return Err(RegistryError::InvalidStatus {
                id,
                status: invoice.status,
            });
        }
        if amount != invoice.amount {
            return Err(RegistryError::AmountMismatch {
                expected: invoice.amount,
                got: amount,
            });
        }
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(now);
        store.put_invoice(&invoice)?;
        tracing::info!(id, amount, "invoice paid");
        Ok(Settlement::new()
            .pull(invoice.token, *caller, amount)
            .pay(invoice.token, invoice.payee, amount))
    }

    pub fn cancel<S>(&self, store: &mut S, id: u64, caller: &Address) -> Result<(), RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut invoice = load(store, id)?;
        if who != invoice.payee {
            return Err(RegistryError::Unauthorized(who));
        }
        if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            return Err(RegistryError::InvalidStatus {
                id,
                status: invoice.status,
            });
        }
        invoice.status = InvoiceStatus::Cancelled;
        store.put_invoice(&invoice)?;
        tracing::info!(id, "invoice cancelled");
        Ok(())
    }

    pub(crate) fn link_document<S: RegistryStore>(
        store: &mut S,
        id: u64,
        hash: &DocHash,
    ) -> Result<(), RegistryError> {
        let mut invoice = load(store, id)?;
        if invoice.documents.contains(hash) {
            return Err(RegistryError::AlreadyLinked(*hash));
        }
        invoice.documents.push(*hash);
        store.put_invoice(&invoice)?;
        Ok(())
    }

    pub fn invoice<S: RegistryStore>(store: &S, id: u64) -> Result<Option<Invoice>, RegistryError> {
        Ok(store.invoice(id)?)
    }

    /// Whether `addr` is the payer or payee of any invoice.
    pub fn involves<S: RegistryStore>(store: &S, addr: &Address) -> Result<bool, RegistryError> {
        Ok(store
            .invoices()?
            .iter()
            .any(|inv| inv.payer == *addr || inv.payee == *addr))
    }

    pub fn invoice_by_number<S: RegistryStore>(
        store: &S,
        number: &str,
    ) -> Result<Option<Invoice>, RegistryError> {
        match store.invoice_id_by_number(number.trim())? {
            Some(id) => Ok(store.invoice(id)?),
            None => Ok(None),
        }
    }
}

pub(crate) fn load<S: RegistryStore>(store: &S, id: u64) -> Result<Invoice, RegistryError> {
    store.invoice(id)?.ok_or(RegistryError::InvoiceNotFound(id))
}

fn expect_status(invoice: &Invoice, allowed: &[InvoiceStatus]) -> Result<(), RegistryError> {
    if !allowed.contains(&invoice.status) {
        return Err(RegistryError::InvalidStatus {
            id: invoice.id,
            status: invoice.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradefin_nullables::NullStore;
    use tradefin_store::StoreTxn;

    const T0: u64 = 1_700_000_000;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn setup(txn: &mut StoreTxn<'_>) {
        AccessGate::initialize(txn, &addr(1)).unwrap();
        AccessGate::add_token(txn, &addr(1), &addr(99)).unwrap();
    }

    fn draft(number: &str) -> NewInvoice {
        NewInvoice {
            number: number.into(),
            payer: addr(2),
            amount: 2_500,
            token: addr(99),
            due_date: Timestamp::new(T0 + 100),
            description: "40ft container".into(),
        }
    }

    #[test]
    fn invoice_is_paid_through_custody() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let ledger = InvoiceLedger::new(RegistryParams::default());
        let now = Timestamp::new(T0);

        let id = ledger.create(&mut txn, &addr(3), draft("INV-001"), now).unwrap();
        assert!(matches!(
            ledger.pay(&mut txn, id, &addr(2), 2_500, now),
            Err(RegistryError::InvalidStatus { status: InvoiceStatus::Draft, .. })
        ));
        ledger.send(&mut txn, id, &addr(3)).unwrap();
        assert!(ledger.mark_viewed(&mut txn, id, &addr(2)).unwrap());
        assert!(!ledger.mark_viewed(&mut txn, id, &addr(2)).unwrap());
        assert!(matches!(
            ledger.pay(&mut txn, id, &addr(2), 2_499, now),
            Err(RegistryError::AmountMismatch { .. })
        ));

        let settlement = ledger.pay(&mut txn, id, &addr(2), 2_500, now).unwrap();
        assert_eq!(settlement.pulled_from(&addr(2)), 2_500);
        assert_eq!(settlement.paid_to(&addr(3)), 2_500);
        let invoice = InvoiceLedger::invoice_by_number(&txn, "INV-001").unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_at, Some(now));
        assert!(matches!(
            ledger.cancel(&mut txn, id, &addr(3)),
            Err(RegistryError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn numbers_are_unique() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let ledger = InvoiceLedger::new(RegistryParams::default());
        let now = Timestamp::new(T0);
        ledger.create(&mut txn, &addr(3), draft("INV-001"), now).unwrap();
        assert!(matches!(
            ledger.create(&mut txn, &addr(4), draft(" INV-001 "), now),
            Err(RegistryError::DuplicateInvoiceNumber(_))
        ));
        assert!(matches!(
            ledger.create(&mut txn, &addr(2), draft("INV-002"), now),
            Err(RegistryError::InvalidParties)
        ));
        let mut late = draft("INV-003");
        late.due_date = now;
        assert!(matches!(
            ledger.create(&mut txn, &addr(3), late, now),
            Err(RegistryError::DueDateInPast(_))
        ));
    }

    #[test]
    fn overdue_needs_past_due_date() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let ledger = InvoiceLedger::new(RegistryParams::default());
        let id = ledger
            .create(&mut txn, &addr(3), draft("INV-001"), Timestamp::new(T0))
            .unwrap();
        assert!(matches!(
            ledger.mark_overdue(&mut txn, id, Timestamp::new(T0 + 500)),
            Err(RegistryError::InvalidStatus { .. })
        ));
        ledger.send(&mut txn, id, &addr(3)).unwrap();
        assert!(matches!(
            ledger.mark_overdue(&mut txn, id, Timestamp::new(T0 + 100)),
            Err(RegistryError::NotOverdue(_))
        ));
        ledger.mark_overdue(&mut txn, id, Timestamp::new(T0 + 101)).unwrap();
        assert!(ledger
            .pay(&mut txn, id, &addr(2), 2_500, Timestamp::new(T0 + 200))
            .is_ok());
    }
}
