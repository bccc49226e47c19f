use super::status::StatusResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Port to the external payment gateway.
///
/// One network round-trip per call: given an opaque invoice identifier,
/// return the classified status result. Implementations must convert their
/// own transport failures into `Err(StatusError)` so the polling loop never
/// sees an unclassified failure.
#[async_trait]
pub trait StatusGateway: Send + Sync {
    async fn query_status(&self, target_id: &str) -> StatusResult;
}

pub type StatusGatewayArc = Arc<dyn StatusGateway>;
