//! Demo run against a live storage server.
//!
//! ```bash
//! STORAGE_ADMIN_BASE_URL=http://127.0.0.1:5000 STORAGE_ADMIN_BUSINESS=Acme \
//!     RUST_LOG=info cargo run -p storage-admin
//! ```

use storage_admin::lifecycle::tracing::setup_tracing;
use storage_admin::{AdminConfig, AdminSystem};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = AdminConfig::from_env().map_err(|e| e.to_string())?;
    info!(base_url = %config.base_url, "Starting storage admin");

    let system = AdminSystem::new(&config).map_err(|e| e.to_string())?;
    let storage = system.storage_manager();
    let orders = system.order_editor();

    let span = tracing::info_span!("initial_load");
    async {
        if let Some(business) = &config.initial_business {
            match storage.switch_business(business).await {
                Ok(outcome) => info!(?outcome, business = %business, "Business selected"),
                Err(e) => error!(error = %e, "Business selection failed"),
            }
        } else if let Err(e) = system.coordinator.refresh_all().await {
            error!(error = %e, "Initial load failed");
        }
    }
    .instrument(span)
    .await;

    let view = storage.view();
    info!(businesses = view.businesses.len(), "Known businesses");
    if view.selection_needed {
        info!("No business selected; set STORAGE_ADMIN_BUSINESS");
    }
    for row in &view.statistics {
        info!(
            type_name = %row.type_name,
            count = row.count,
            spare = row.spare(),
            critical = row.is_critical(),
            "Stock"
        );
    }

    let order_view = orders.view();
    info!(pending = order_view.pending_orders.len(), "Pending orders");
    if let Some(first) = order_view.pending_orders.first() {
        let id = first.id;
        let span = tracing::info_span!("order_preview", order = id);
        async {
            match orders.select_order(id).await {
                Ok(()) => {
                    if let Some(order) = orders.view().order {
                        info!(
                            bound = order.bound.len(),
                            unbound = order.unbound.len(),
                            "Order loaded"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Order preview failed"),
            }
        }
        .instrument(span)
        .await;
    }

    drop(orders);
    drop(storage);
    system.shutdown().await?;

    info!("Storage admin finished");
    Ok(())
}
