//! Pre-built [`tracing::Span`] constructors for the application's entry points.
//!
//! Every log line emitted while a transaction or block callback runs carries
//! the span's fields, so a node's logs can be filtered per height or message.

use tracing::{info_span, Span};

use agora_types::BlockHeight;

/// Span covering one delivered transaction.
pub fn tx_span(height: BlockHeight, msg: &str) -> Span {
    info_span!("tx", height = %height, msg = %msg)
}

/// Span covering a block-boundary callback.
pub fn block_span(height: BlockHeight, phase: &'static str) -> Span {
    info_span!("block", height = %height, phase)
}

/// Span covering genesis import or export.
pub fn genesis_span(direction: &'static str) -> Span {
    info_span!("genesis", direction)
}
