// ============================================================================
// Persistence - repository contracts
// ============================================================================
//
// The order store persists a whole aggregate change set atomically and
// rejects it when the stored version moved since the aggregate was loaded.
// Catalog and payment data belong to other modules; the engine only reads
// them.
//
// ============================================================================

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::catalog::{CatalogItem, ItemOption, Payment};
use crate::domain::order::{Order, OrderAggregate, OrderEvent};
use crate::domain::pricing::PriceModifier;
use crate::event_sourcing::EventEnvelope;

pub use memory::{InMemoryCatalog, InMemoryOrderStore, InMemoryPayments};
pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Concurrency conflict: expected version {expected}, but current is {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    #[error("Order already exists: {0}")]
    AlreadyExists(Uuid),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Backend(err.into())
    }
}

pub type OrderEnvelope = EventEnvelope<OrderEvent>;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a freshly opened aggregate.
    async fn create(&self, aggregate: &OrderAggregate, events: &[OrderEnvelope]) -> Result<(), RepositoryError>;

    async fn load(&self, order_id: Uuid) -> Result<Option<OrderAggregate>, RepositoryError>;

    async fn list_for_business(&self, business_id: Uuid) -> Result<Vec<Order>, RepositoryError>;

    /// Persist `aggregate` if the stored version still equals `expected_version`.
    async fn save(
        &self,
        aggregate: &OrderAggregate,
        expected_version: i64,
        events: &[OrderEnvelope],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_item(&self, item_id: Uuid) -> Result<Option<CatalogItem>, RepositoryError>;

    async fn get_item_option(&self, option_id: Uuid) -> Result<Option<ItemOption>, RepositoryError>;

    async fn get_price_modifier(&self, modifier_id: Uuid) -> Result<Option<PriceModifier>, RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, RepositoryError>;
}
