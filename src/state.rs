//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::notifications::{AdminInbox, Dispatcher, Notifier};
use crate::services::orders::OrderEngine;
use crate::services::revenue::RevenueService;
use crate::store::Store;

/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    catalog: CatalogService,
    cart: CartService,
    orders: OrderEngine,
    revenue: RevenueService,
    inbox: AdminInbox,
}

impl AppState {
    /// Wires the services over `store`. The admin inbox is always a notification
    /// sink; `extra_sinks` (e.g. NATS) are run after it.
    pub fn new(config: AppConfig, store: Arc<dyn Store>, extra_sinks: Vec<Arc<dyn Notifier>>) -> Self {
        let inbox = AdminInbox::new(Arc::clone(&store));

        let mut sinks: Vec<Arc<dyn Notifier>> = vec![Arc::new(inbox.clone())];
        sinks.extend(extra_sinks);
        let dispatcher = Dispatcher::new(sinks);

        let orders = OrderEngine::new(Arc::clone(&store), dispatcher, config.order_number_prefix.clone())
            .with_strict_transitions(config.strict_status_transitions);

        Self {
            inner: Arc::new(AppStateInner {
                catalog: CatalogService::new(Arc::clone(&store), config.low_stock_threshold),
                cart: CartService::new(Arc::clone(&store)),
                revenue: RevenueService::new(store),
                orders,
                inbox,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig { &self.inner.config }
    pub fn catalog(&self) -> &CatalogService { &self.inner.catalog }
    pub fn cart(&self) -> &CartService { &self.inner.cart }
    pub fn orders(&self) -> &OrderEngine { &self.inner.orders }
    pub fn revenue(&self) -> &RevenueService { &self.inner.revenue }
    pub fn inbox(&self) -> &AdminInbox { &self.inner.inbox }
}
