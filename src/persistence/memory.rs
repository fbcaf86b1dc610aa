use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::catalog::{CatalogItem, ItemOption, Payment};
use crate::domain::order::{Order, OrderAggregate};
use crate::domain::pricing::PriceModifier;
use super::{CatalogRepository, OrderEnvelope, OrderRepository, PaymentRepository, RepositoryError};

// ============================================================================
// In-Memory Stores
// ============================================================================
//
// Writers hold the write lock across the version check and the apply, so
// a save is atomic with respect to every other save.
//
// ============================================================================

pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, OrderAggregate>>,
    journal: RwLock<Vec<OrderEnvelope>>,
    record_events: bool,
}

impl InMemoryOrderStore {
    pub fn new(record_events: bool) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            journal: RwLock::new(Vec::new()),
            record_events,
        }
    }

    /// Journaled events for one order, in append order
    pub async fn events_for(&self, order_id: Uuid) -> Vec<OrderEnvelope> {
        self.journal
            .read()
            .await
            .iter()
            .filter(|envelope| envelope.aggregate_id == order_id)
            .cloned()
            .collect()
    }

    async fn append(&self, events: &[OrderEnvelope]) {
        if self.record_events {
            self.journal.write().await.extend_from_slice(events);
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn create(&self, aggregate: &OrderAggregate, events: &[OrderEnvelope]) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&aggregate.order.id) {
            return Err(RepositoryError::AlreadyExists(aggregate.order.id));
        }
        orders.insert(aggregate.order.id, aggregate.clone());
        self.append(events).await;
        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> Result<Option<OrderAggregate>, RepositoryError> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_for_business(&self, business_id: Uuid) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|aggregate| aggregate.order.business_id == business_id)
            .map(|aggregate| aggregate.order.clone())
            .collect();
        orders.sort_by_key(|order| order.date_placed);
        Ok(orders)
    }

    async fn save(
        &self,
        aggregate: &OrderAggregate,
        expected_version: i64,
        events: &[OrderEnvelope],
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;

        let actual = orders
            .get(&aggregate.order.id)
            .map(|stored| stored.version)
            .unwrap_or(0);
        if actual != expected_version {
            return Err(RepositoryError::VersionConflict { expected: expected_version, actual });
        }

        orders.insert(aggregate.order.id, aggregate.clone());
        self.append(events).await;

        tracing::debug!(
            order_id = %aggregate.order.id,
            new_version = aggregate.version,
            event_count = events.len(),
            "Saved order aggregate"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<Uuid, CatalogItem>>,
    options: RwLock<HashMap<Uuid, ItemOption>>,
    modifiers: RwLock<HashMap<Uuid, PriceModifier>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_item(&self, item: CatalogItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn insert_option(&self, option: ItemOption) {
        self.options.write().await.insert(option.id, option);
    }

    pub async fn insert_modifier(&self, modifier: PriceModifier) {
        self.modifiers.write().await.insert(modifier.id, modifier);
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn get_item(&self, item_id: Uuid) -> Result<Option<CatalogItem>, RepositoryError> {
        Ok(self.items.read().await.get(&item_id).cloned())
    }

    async fn get_item_option(&self, option_id: Uuid) -> Result<Option<ItemOption>, RepositoryError> {
        Ok(self.options.read().await.get(&option_id).cloned())
    }

    async fn get_price_modifier(&self, modifier_id: Uuid) -> Result<Option<PriceModifier>, RepositoryError> {
        Ok(self.modifiers.read().await.get(&modifier_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPayments {
    payments: RwLock<HashMap<Uuid, Payment>>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, payment: Payment) {
        self.payments.write().await.insert(payment.id, payment);
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPayments {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.payments.read().await.get(&payment_id).cloned())
    }
}
