//! Content-addressed document attestations.

use tradefin_access::{AccessGate, AccessStore, Role};
use tradefin_escrow::{EscrowEngine, EscrowStore};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_types::{Address, DocHash, Timestamp};

use crate::error::RegistryError;
use crate::invoices::{self, InvoiceLedger};
use crate::model::{DocumentRecord, NewDocument};
use crate::params::RegistryParams;
use crate::store::RegistryStore;

pub struct DocumentRegistry {
    params: RegistryParams,
}

impl DocumentRegistry {
    pub fn new(params: RegistryParams) -> Self {
        Self { params }
    }

    /// Record a document hash, linking it to the escrow and invoice named in
    /// `new` when those ids are non-zero.
    pub fn register<S>(
        &self,
        store: &mut S,
        caller: &Address,
        new: NewDocument,
        now: Timestamp,
    ) -> Result<(), RegistryError>
    where
        S: RegistryStore + EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let uploader = IdentityResolver::resolve(store, caller)?;
        if new.hash.is_zero() {
            return Err(RegistryError::InvalidHash);
        }
        if store.document(&new.hash)?.is_some() {
            return Err(RegistryError::DuplicateDocument(new.hash));
        }
        if new.metadata_uri.chars().count() > self.params.max_text_len {
            return Err(RegistryError::TextTooLong {
                max: self.params.max_text_len,
            });
        }
        if new.linked_escrow_id != 0 {
            attach_to_escrow(store, &uploader, new.linked_escrow_id, &new.hash)?;
        }
        if new.linked_invoice_id != 0 {
            attach_to_invoice(store, &uploader, new.linked_invoice_id, &new.hash)?;
        }

        let record = DocumentRecord {
            hash: new.hash,
            metadata_uri: new.metadata_uri,
            uploader,
            timestamp: now,
            doc_type: new.doc_type,
            linked_escrow_id: new.linked_escrow_id,
            linked_invoice_id: new.linked_invoice_id,
            verified: false,
            verified_by: None,
            verified_at: None,
        };
        store.put_document(&record)?;
        tracing::info!(hash = %record.hash, %uploader, doc_type = ?record.doc_type, "document registered");
        Ok(())
    }

    /// Attest a document. Returns false if it was already verified.
    pub fn verify<S>(
        &self,
        store: &mut S,
        hash: &DocHash,
        caller: &Address,
        now: Timestamp,
    ) -> Result<bool, RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let verifier = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_role(store, &verifier, Role::DocumentVerifier)?;
        let mut record = load(store, hash)?;
        if record.verified {
            return Ok(false);
        }
        record.verified = true;
        record.verified_by = Some(verifier);
        record.verified_at = Some(now);
        store.put_document(&record)?;
        tracing::info!(%hash, %verifier, "document verified");
        Ok(true)
    }

    pub fn link_to_escrow<S>(
        &self,
        store: &mut S,
        hash: &DocHash,
        escrow_id: u64,
        caller: &Address,
    ) -> Result<(), RegistryError>
    where
        S: RegistryStore + EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        if escrow_id == 0 {
            return Err(RegistryError::InvalidTarget);
        }
        let record = load(store, hash)?;
        if record.uploader != who {
            return Err(RegistryError::Unauthorized(who));
        }
        attach_to_escrow(store, &who, escrow_id, hash)?;
        tracing::info!(%hash, escrow_id, "document linked to escrow");
        Ok(())
    }

    pub fn link_to_invoice<S>(
        &self,
        store: &mut S,
        hash: &DocHash,
        invoice_id: u64,
        caller: &Address,
    ) -> Result<(), RegistryError>
    where
        S: RegistryStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        if invoice_id == 0 {
            return Err(RegistryError::InvalidTarget);
        }
        let record = load(store, hash)?;
        if record.uploader != who {
            return Err(RegistryError::Unauthorized(who));
        }
        attach_to_invoice(store, &who, invoice_id, hash)?;
        tracing::info!(%hash, invoice_id, "document linked to invoice");
        Ok(())
    }

    pub fn document<S: RegistryStore>(
        store: &S,
        hash: &DocHash,
    ) -> Result<Option<DocumentRecord>, RegistryError> {
        Ok(store.document(hash)?)
    }
}

fn load<S: RegistryStore>(store: &S, hash: &DocHash) -> Result<DocumentRecord, RegistryError> {
    store
        .document(hash)?
        .ok_or(RegistryError::DocumentNotFound(*hash))
}

fn attach_to_escrow<S: EscrowStore>(
    store: &mut S,
    who: &Address,
    escrow_id: u64,
    hash: &DocHash,
) -> Result<(), RegistryError> {
    let escrow = store
        .escrow(escrow_id)?
        .ok_or(RegistryError::EscrowNotFound(escrow_id))?;
    if !escrow.is_party(who) {
        return Err(RegistryError::Unauthorized(*who));
    }
    if escrow.documents.contains(hash) {
        return Err(RegistryError::AlreadyLinked(*hash));
    }
    EscrowEngine::link_document(store, escrow_id, hash)?;
    Ok(())
}

fn attach_to_invoice<S: RegistryStore>(
    store: &mut S,
    who: &Address,
    invoice_id: u64,
    hash: &DocHash,
) -> Result<(), RegistryError> {
    let invoice = invoices::load(store, invoice_id)?;
    if !invoice.is_party(who) {
        return Err(RegistryError::Unauthorized(*who));
    }
    InvoiceLedger::link_document(store, invoice_id, hash)
}
