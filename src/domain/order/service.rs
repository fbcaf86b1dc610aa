use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::{AccessLevel, Action, AuthorizationOracle, Principal};
use crate::domain::pricing::{compute_final_price, PricingError};
use crate::event_sourcing::{Aggregate, EventEnvelope};
use crate::metrics::Metrics;
use crate::persistence::{
    CatalogRepository, OrderEnvelope, OrderRepository, PaymentRepository, RepositoryError,
};
use super::aggregate::OrderAggregate;
use super::commands::OrderCommand;
use super::errors::ServiceError;
use super::events::OrderEvent;
use super::lifecycle::OrderLifecycleGuard;
use super::value_objects::{
    ItemOptionLink, LineItemQuote, NewOrder, Order, OrderItem, OrderPatch, OrderPaymentLink,
    PriceModifierOrderLink,
};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: load → authorize → guard → command → events → save
//
// Every mutation saves against the version it loaded, so a final-state
// check made on a stale snapshot can never commit.
//
// ============================================================================

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    payments: Arc<dyn PaymentRepository>,
    oracle: Arc<dyn AuthorizationOracle>,
    metrics: Arc<Metrics>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        payments: Arc<dyn PaymentRepository>,
        oracle: Arc<dyn AuthorizationOracle>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            catalog,
            payments,
            oracle,
            metrics,
        }
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    async fn observe<T, F>(&self, operation: &'static str, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let started = Instant::now();
        let result = work.await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        self.metrics
            .record_operation(operation, outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn authorize(&self, caller: &Principal, business_id: Uuid, level: AccessLevel) -> Result<(), ServiceError> {
        if !caller.may_act_for(business_id) {
            tracing::warn!(user_id = %caller.user_id, business_id = %business_id, "Caller is not a member of business");
            return Err(ServiceError::Forbidden(format!(
                "user {} is not a member of business {}",
                caller.user_id, business_id
            )));
        }

        match self
            .oracle
            .has_access(Action::Orders, level, business_id, caller.user_id)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(
                    user_id = %caller.user_id,
                    business_id = %business_id,
                    level = ?level,
                    "Access denied"
                );
                Err(ServiceError::Forbidden(format!(
                    "user {} may not access orders of business {}",
                    caller.user_id, business_id
                )))
            }
            Err(e) => {
                tracing::error!(user_id = %caller.user_id, business_id = %business_id, error = %e, "Authorization check failed");
                Err(ServiceError::Internal(format!("authorization check failed: {}", e)))
            }
        }
    }

    async fn load_authorized(
        &self,
        order_id: Uuid,
        caller: &Principal,
        level: AccessLevel,
    ) -> Result<OrderAggregate, ServiceError> {
        let aggregate = self
            .orders
            .load(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", order_id)))?;
        tracing::debug!(order_id = %order_id, version = aggregate.version(), "Loaded order");

        self.authorize(caller, aggregate.business_id(), level).await?;
        Ok(aggregate)
    }

    /// Line mutations check the gate before touching the catalog, so a
    /// frozen order answers Conflict even for unknown catalog ids.
    async fn load_for_line_change(&self, order_id: Uuid, caller: &Principal) -> Result<OrderAggregate, ServiceError> {
        let aggregate = self.load_authorized(order_id, caller, AccessLevel::Write).await?;
        OrderLifecycleGuard::ensure_lines_mutable(aggregate.status())?;
        Ok(aggregate)
    }

    async fn commit(
        &self,
        mut aggregate: OrderAggregate,
        command: OrderCommand,
        caller: &Principal,
    ) -> Result<OrderAggregate, ServiceError> {
        let expected_version = aggregate.version();
        let events = aggregate.execute(&command).map_err(|e| {
            tracing::warn!(order_id = %aggregate.id(), command = command.name(), error = %e, "Command rejected");
            ServiceError::from(e)
        })?;

        if events.is_empty() {
            return Ok(aggregate);
        }

        let envelopes = wrap_events(aggregate.id(), expected_version, events, command.name(), caller);

        match self.orders.save(&aggregate, expected_version, &envelopes).await {
            Ok(()) => {
                tracing::info!(
                    order_id = %aggregate.id(),
                    business_id = %aggregate.business_id(),
                    user_id = %caller.user_id,
                    command = command.name(),
                    version = aggregate.version(),
                    "Order updated"
                );
                Ok(aggregate)
            }
            Err(e @ RepositoryError::VersionConflict { .. }) => {
                self.metrics.record_version_conflict();
                tracing::warn!(order_id = %aggregate.id(), command = command.name(), error = %e, "Concurrent modification");
                Err(e.into())
            }
            Err(e) => {
                tracing::error!(order_id = %aggregate.id(), command = command.name(), error = %e, "Failed to save order");
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Order level
    // ------------------------------------------------------------------------

    /// Open a Pending order. The servicing account is stored as given.
    pub async fn create_order(&self, new_order: NewOrder, caller: &Principal) -> Result<Order, ServiceError> {
        self.observe("create_order", async {
            self.authorize(caller, new_order.business_id, AccessLevel::Write).await?;

            let (aggregate, created) = OrderAggregate::open(Uuid::now_v7(), new_order, Utc::now())?;
            let envelopes = wrap_events(aggregate.id(), 0, vec![created], "create_order", caller);
            self.orders.create(&aggregate, &envelopes).await?;

            tracing::info!(
                order_id = %aggregate.id(),
                business_id = %aggregate.business_id(),
                user_id = %caller.user_id,
                "Order created"
            );
            Ok(aggregate.order)
        })
        .await
    }

    pub async fn get_orders(&self, business_id: Uuid, caller: &Principal) -> Result<Vec<Order>, ServiceError> {
        self.observe("get_orders", async {
            self.authorize(caller, business_id, AccessLevel::Read).await?;
            Ok(self.orders.list_for_business(business_id).await?)
        })
        .await
    }

    pub async fn get_order_by_id(&self, order_id: Uuid, caller: &Principal) -> Result<Order, ServiceError> {
        self.observe("get_order_by_id", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Read).await?;
            Ok(aggregate.order)
        })
        .await
    }

    /// Patch status, tip, service charge or contact fields. Not gated by
    /// final state; any known status is accepted.
    pub async fn update_order(&self, order_id: Uuid, patch: OrderPatch, caller: &Principal) -> Result<Order, ServiceError> {
        self.observe("update_order", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Write).await?;
            let aggregate = self
                .commit(aggregate, OrderCommand::UpdateOrder { patch }, caller)
                .await?;
            Ok(aggregate.order)
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Line items
    // ------------------------------------------------------------------------

    pub async fn add_item_to_order(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        count: i32,
        caller: &Principal,
    ) -> Result<OrderItem, ServiceError> {
        self.observe("add_item", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            let item = self
                .catalog
                .get_item(item_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("item {}", item_id)))?;

            let order_item_id = Uuid::now_v7();
            let aggregate = self
                .commit(aggregate, OrderCommand::AddItem { order_item_id, item, count }, caller)
                .await?;
            find_committed(aggregate.item(order_item_id).cloned(), order_item_id)
        })
        .await
    }

    /// Only the count is mutable. `None` leaves the item as it is.
    pub async fn update_order_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        count: Option<i32>,
        caller: &Principal,
    ) -> Result<OrderItem, ServiceError> {
        self.observe("update_item", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            let aggregate = self
                .commit(aggregate, OrderCommand::UpdateItem { order_item_id, count }, caller)
                .await?;
            find_committed(aggregate.item(order_item_id).cloned(), order_item_id)
        })
        .await
    }

    /// Removes the item together with its option and modifier links.
    pub async fn remove_item_from_order(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        caller: &Principal,
    ) -> Result<(), ServiceError> {
        self.observe("remove_item", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            self.commit(aggregate, OrderCommand::RemoveItem { order_item_id }, caller)
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn apply_price_modifier_to_order(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        modifier_id: Uuid,
        caller: &Principal,
    ) -> Result<PriceModifierOrderLink, ServiceError> {
        self.observe("apply_modifier", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            let modifier = self
                .catalog
                .get_price_modifier(modifier_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("price modifier {}", modifier_id)))?;

            let link_id = Uuid::now_v7();
            let aggregate = self
                .commit(
                    aggregate,
                    OrderCommand::ApplyModifier { link_id, order_item_id, modifier },
                    caller,
                )
                .await?;
            find_committed(
                aggregate.modifier_links.iter().find(|l| l.id == link_id).cloned(),
                link_id,
            )
        })
        .await
    }

    pub async fn add_option_to_order_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        option_id: Uuid,
        count: i32,
        caller: &Principal,
    ) -> Result<ItemOptionLink, ServiceError> {
        self.observe("add_option", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            let option = self
                .catalog
                .get_item_option(option_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("item option {}", option_id)))?;

            let link_id = Uuid::now_v7();
            let aggregate = self
                .commit(
                    aggregate,
                    OrderCommand::AddOption { link_id, order_item_id, option, count },
                    caller,
                )
                .await?;
            find_committed(
                aggregate.option_links.iter().find(|l| l.id == link_id).cloned(),
                link_id,
            )
        })
        .await
    }

    pub async fn remove_option_from_order_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        option_link_id: Uuid,
        caller: &Principal,
    ) -> Result<(), ServiceError> {
        self.observe("remove_option", async {
            let aggregate = self.load_for_line_change(order_id, caller).await?;
            self.commit(
                aggregate,
                OrderCommand::RemoveOption { order_item_id, option_link_id },
                caller,
            )
            .await?;
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------------

    /// Allowed in every status; each payment links at most once.
    pub async fn link_payment_to_order(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        caller: &Principal,
    ) -> Result<OrderPaymentLink, ServiceError> {
        self.observe("link_payment", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Write).await?;
            let payment = self
                .payments
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("payment {}", payment_id)))?;

            let link_id = Uuid::now_v7();
            let aggregate = self
                .commit(aggregate, OrderCommand::LinkPayment { link_id, payment }, caller)
                .await?;
            find_committed(
                aggregate.payment_links.iter().find(|l| l.id == link_id).cloned(),
                link_id,
            )
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_order_items(&self, order_id: Uuid, caller: &Principal) -> Result<Vec<OrderItem>, ServiceError> {
        self.observe("get_order_items", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Read).await?;
            Ok(aggregate.items)
        })
        .await
    }

    /// Option links of one order item, in the order they were added.
    pub async fn get_item_options_in_order(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        caller: &Principal,
    ) -> Result<Vec<ItemOptionLink>, ServiceError> {
        self.observe("get_item_options", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Read).await?;
            if aggregate.item(order_item_id).is_none() {
                return Err(ServiceError::NotFound(format!("order item {}", order_item_id)));
            }
            Ok(aggregate.option_links_for(order_item_id).cloned().collect())
        })
        .await
    }

    pub async fn get_order_payments(
        &self,
        order_id: Uuid,
        caller: &Principal,
    ) -> Result<Vec<OrderPaymentLink>, ServiceError> {
        self.observe("get_order_payments", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Read).await?;
            Ok(aggregate.payment_links)
        })
        .await
    }

    /// Price one line as of `as_of`.
    ///
    /// The unit base price is the catalog price plus every linked option's
    /// price times its count. Linked modifiers are priced in link order,
    /// duplicates included; modifiers retired before `as_of` are skipped.
    pub async fn quote_order_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        caller: &Principal,
        as_of: DateTime<Utc>,
    ) -> Result<LineItemQuote, ServiceError> {
        self.observe("quote_item", async {
            let aggregate = self.load_authorized(order_id, caller, AccessLevel::Read).await?;
            let line = aggregate
                .item(order_item_id)
                .ok_or_else(|| ServiceError::NotFound(format!("order item {}", order_item_id)))?;

            let item = self
                .catalog
                .get_item(line.item_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("item {}", line.item_id)))?;

            let mut base_unit_price = item.price;
            for link in aggregate.option_links_for(order_item_id) {
                let option = self
                    .catalog
                    .get_item_option(link.option_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("item option {}", link.option_id)))?;
                base_unit_price = option
                    .price
                    .checked_mul(Decimal::from(link.count))
                    .and_then(|options| base_unit_price.checked_add(options))
                    .ok_or(PricingError::Overflow("unit base price"))?;
            }

            let mut modifiers = Vec::new();
            for link in aggregate.modifier_links_for(order_item_id) {
                let modifier = self
                    .catalog
                    .get_price_modifier(link.price_modifier_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("price modifier {}", link.price_modifier_id)))?;
                if modifier.is_active_at(as_of) {
                    modifiers.push(modifier);
                }
            }

            let final_unit_price = compute_final_price(base_unit_price, &modifiers)?;
            let line_total = final_unit_price
                .checked_mul(Decimal::from(line.count))
                .ok_or(PricingError::Overflow("line total"))?;
            self.metrics.record_pricing();

            tracing::debug!(
                order_id = %order_id,
                order_item_id = %order_item_id,
                base = %base_unit_price,
                final_price = %final_unit_price,
                modifiers = modifiers.len(),
                "Priced order item"
            );

            Ok(LineItemQuote {
                order_item_id,
                base_unit_price,
                final_unit_price,
                count: line.count,
                line_total,
            })
        })
        .await
    }
}

/// Number events from `from_version + 1` and stamp them with the caller.
fn wrap_events(
    order_id: Uuid,
    from_version: i64,
    events: Vec<OrderEvent>,
    command: &str,
    caller: &Principal,
) -> Vec<OrderEnvelope> {
    let correlation_id = Uuid::new_v4();
    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            EventEnvelope::new(order_id, from_version + i as i64 + 1, event, correlation_id)
            .with_user(caller.user_id)
            .with_metadata("command".to_string(), command.to_string())
        })
        .collect()
}

fn find_committed<T>(record: Option<T>, id: Uuid) -> Result<T, ServiceError> {
    record.ok_or_else(|| ServiceError::Internal(format!("record {} missing after commit", id)))
}

// ============================================================================
// Unit Tests
// ============================================================================
