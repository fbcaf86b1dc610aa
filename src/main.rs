use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use order_engine::domain::catalog::{CatalogItem, Payment};
use order_engine::domain::order::{NewOrder, OrderPatch};
use order_engine::domain::pricing::{ModifierKind, PriceModifier};
use order_engine::persistence::{
    InMemoryCatalog, InMemoryOrderStore, InMemoryPayments, OrderRepository, PgOrderStore,
};
use order_engine::{AccessLevel, Action, EngineConfig, Metrics, OrderService, Principal, StaticAccessPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;

    // Structured logging, RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting order engine demo");

    // === 1. Order store ===
    let orders: Arc<dyn OrderRepository> = match config.database_url {
        Some(_) => {
            let store = PgOrderStore::connect(&config).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory order store");
            Arc::new(InMemoryOrderStore::new(config.record_events))
        }
    };

    // === 2. Catalog, payments and access policy ===
    let cafe = Uuid::now_v7();
    let bakery = Uuid::now_v7();
    let clerk = Principal::new(Uuid::now_v7()).with_memberships(vec![cafe]);

    let catalog = Arc::new(InMemoryCatalog::new());
    let latte = CatalogItem::new(cafe, "Latte", Decimal::new(50, 0));
    let croissant = CatalogItem::new(bakery, "Croissant", Decimal::new(4, 0));
    let happy_hour = PriceModifier::percentage(cafe, ModifierKind::Discount, "Happy hour", Decimal::new(10, 0));
    catalog.insert_item(latte.clone()).await;
    catalog.insert_item(croissant.clone()).await;
    catalog.insert_modifier(happy_hour.clone()).await;

    let payments = Arc::new(InMemoryPayments::new());
    let payment = Payment::new(cafe, Decimal::new(90, 0));
    payments.insert(payment.clone()).await;

    let policy = StaticAccessPolicy::new().grant(clerk.user_id, cafe, Action::Orders, AccessLevel::Write);

    let metrics = Arc::new(Metrics::new()?);
    let service = OrderService::new(orders, catalog, payments, Arc::new(policy), metrics.clone());

    // === 3. Walk an order through its lifecycle ===
    let order = service.create_order(NewOrder::for_business(cafe), &clerk).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order opened");

    let line = service.add_item_to_order(order.id, latte.id, 2, &clerk).await?;
    tracing::info!(order_item_id = %line.id, count = line.count, "Latte added");

    if let Err(e) = service.add_item_to_order(order.id, croissant.id, 1, &clerk).await {
        tracing::info!(kind = ?e.kind(), "Item from another business rejected: {}", e);
    }

    service
        .apply_price_modifier_to_order(order.id, line.id, happy_hour.id, &clerk)
        .await?;
    let quote = service.quote_order_item(order.id, line.id, &clerk, Utc::now()).await?;
    tracing::info!(
        base = %quote.base_unit_price,
        unit = %quote.final_unit_price,
        total = %quote.line_total,
        "Latte priced"
    );

    service
        .update_order(order.id, OrderPatch::status("Completed"), &clerk)
        .await?;

    if let Err(e) = service.add_item_to_order(order.id, latte.id, 1, &clerk).await {
        tracing::info!(kind = ?e.kind(), "Completed order is frozen: {}", e);
    }

    service.link_payment_to_order(order.id, payment.id, &clerk).await?;
    tracing::info!(payment_id = %payment.id, "Payment linked");

    if let Err(e) = service.link_payment_to_order(order.id, payment.id, &clerk).await {
        tracing::info!(kind = ?e.kind(), "Duplicate payment rejected: {}", e);
    }

    tracing::info!("Demo complete");
    println!("{}", metrics.render()?);

    Ok(())
}
