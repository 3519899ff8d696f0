//! Span constructors for platform operations.
//!
//! Every operation runs inside one of these spans, so engine events carry
//! the operation name and the entity they touched.

use tracing::{info_span, Span};
use tradefin_types::{Address, DocHash};

/// Owner actions on the access gate and identity links.
pub fn admin_span(action: &'static str, caller: &Address) -> Span {
    info_span!("admin", action, caller = %caller)
}

pub fn stake_span(action: &'static str, user: &Address, token: &Address) -> Span {
    info_span!("stake", action, user = %user, token = %token)
}

/// Proposals and trade-finance requests; `id` is zero before creation.
pub fn governance_span(action: &'static str, id: u64) -> Span {
    info_span!("governance", action, id)
}

pub fn escrow_span(action: &'static str, id: u64) -> Span {
    info_span!("escrow", action, id)
}

pub fn pga_span(action: &'static str, id: &str) -> Span {
    info_span!("pga", action, id = %id)
}

pub fn invoice_span(action: &'static str, id: u64) -> Span {
    info_span!("invoice", action, id)
}

pub fn document_span(action: &'static str, hash: &DocHash) -> Span {
    info_span!("document", action, hash = %hash)
}
