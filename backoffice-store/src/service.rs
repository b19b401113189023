//! Back office service
//!
//! Each operation loads the documents it needs through the store actor, runs
//! the pure engine from `backoffice-core`, and persists the result. Writes
//! take an optional `expected_version`: pass the version returned by the
//! last load to get compare-and-set semantics, or `None` for a plain
//! overwrite.

use crate::{
    actor::{spawn_store_actor, StoreHandle},
    collection::{Collection, PRICE_LIST_KEY},
    document::{Document, ItemList},
    rocks::RocksStore,
    storage::{now_millis, KvStore, MemoryStore},
    validate::{validate_appended, validate_items, validate_price_list, Validate},
    Config, Error, Metrics, Result,
};
use backoffice_core::{
    aggregate,
    orders::{apply_status, reconcile_orders},
    pricing::{compute_landed_cost, quote_catalog, CatalogQuote, LandedCost},
    stock::{compensating_entry, count_malformed, project, project_product, rewritten_entries},
    types::{
        CatalogProduct, DeliveryOption, EntityId, Expense, LedgerEntry, Order, OrderStatus,
        PriceList, Sale, Shipment, StockSnapshot, Timestamp,
    },
    DashboardStats,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Attempts for appends, which can be replayed on a newer ledger
const APPEND_ATTEMPTS: usize = 3;

/// Service facade over the document store
#[derive(Debug, Clone)]
pub struct BackOffice {
    handle: StoreHandle,
    metrics: Metrics,
    config: Arc<Config>,
}

impl BackOffice {
    /// Start the store actor over `store`
    pub fn new(store: Arc<dyn KvStore>, config: Config) -> Result<Self> {
        let metrics =
            Metrics::new().map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        let handle = spawn_store_actor(store, &config.store, metrics.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            "Back office started"
        );

        Ok(Self {
            handle,
            metrics,
            config: Arc::new(config),
        })
    }

    /// Open the RocksDB store under `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let store = RocksStore::open(&config)?;
        Self::new(Arc::new(store), config)
    }

    /// Non-persistent instance
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the store actor
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    // Generic collection access

    async fn load_items<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Document<ItemList<T>>> {
        Ok(self
            .handle
            .load(collection.key())
            .await?
            .unwrap_or_else(|| Document::unsaved(ItemList::default())))
    }

    fn validate<T: Validate + Serialize>(&self, collection: Collection, items: &[T]) -> Result<()> {
        validate_items(collection, items).map_err(|e| {
            self.metrics.record_validation_failure();
            tracing::info!(collection = %collection, error = %e, "Payload rejected");
            e
        })
    }

    async fn store_items<T: Serialize>(
        &self,
        collection: Collection,
        items: Vec<T>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let body = serde_json::to_value(ItemList::from(items))?;
        self.handle
            .save(collection.key(), body, expected_version)
            .await
    }

    async fn save_items<T: Validate + Serialize>(
        &self,
        collection: Collection,
        items: Vec<T>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.validate(collection, &items)?;
        self.store_items(collection, items, expected_version).await
    }

    // Orders

    /// Orders document
    pub async fn orders(&self) -> Result<Document<ItemList<Order>>> {
        self.load_items(Collection::Orders).await
    }

    /// Replace the orders collection.
    ///
    /// Every order whose id is already stored must respect the lifecycle
    /// relative to its stored status; new ids may start anywhere.
    pub async fn save_orders(
        &self,
        items: Vec<Order>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.validate(Collection::Orders, &items)?;

        let previous = self.orders().await?;
        if let Err(e) = reconcile_orders(&previous.body.items, &items) {
            self.metrics.record_transition_rejected();
            tracing::info!(error = %e, "Order transition rejected");
            return Err(e.into());
        }

        self.store_items(Collection::Orders, items, expected_version)
            .await
    }

    /// Move one order to `status`, optionally linking a shipment first
    pub async fn set_order_status(
        &self,
        order_id: &EntityId,
        status: OrderStatus,
        shipment_id: Option<EntityId>,
    ) -> Result<Order> {
        let mut doc = self.orders().await?;
        let order = doc
            .body
            .items
            .iter_mut()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| Error::NotFound(format!("order {}", order_id)))?;

        if shipment_id.is_some() {
            order.shipment_id = shipment_id;
        }
        if let Err(e) = apply_status(order, status) {
            self.metrics.record_transition_rejected();
            tracing::info!(error = %e, "Order transition rejected");
            return Err(e.into());
        }
        let updated = order.clone();

        self.store_items(Collection::Orders, doc.body.items, Some(doc.version))
            .await?;
        Ok(updated)
    }

    // Inventory

    /// Inventory ledger document.
    ///
    /// Rows are decoded one by one; a row that is not an entry at all (say a
    /// bare number) is dropped with a warning and counted as skipped, so one
    /// bad row never hides the rest of the ledger.
    pub async fn ledger(&self) -> Result<Document<ItemList<LedgerEntry>>> {
        let doc: Document<ItemList<Value>> = self.load_items(Collection::Ledger).await?;
        Ok(Document {
            body: ItemList::from(self.decode_ledger_rows(&doc.body.items)),
            updated_at: doc.updated_at,
            version: doc.version,
        })
    }

    fn decode_ledger_rows(&self, rows: &[Value]) -> Vec<LedgerEntry> {
        let mut dropped = 0;
        let entries = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| match LedgerEntry::deserialize(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(row = idx, error = %e, "Undecodable ledger row dropped");
                    dropped += 1;
                    None
                }
            })
            .collect();
        if dropped > 0 {
            self.metrics.record_ledger_rows_skipped(dropped);
        }
        entries
    }

    /// Replace the whole ledger.
    ///
    /// Editing or dropping existing entries is accepted but logged; prefer
    /// [`append_ledger_entries`](Self::append_ledger_entries) and
    /// [`reverse_ledger_entry`](Self::reverse_ledger_entry).
    pub async fn save_ledger(
        &self,
        items: Vec<LedgerEntry>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.validate(Collection::Ledger, &items)?;

        let previous = self.ledger().await?;
        let rewritten = rewritten_entries(&previous.body.items, &items);
        if !rewritten.is_empty() {
            let ids: Vec<&str> = rewritten.iter().map(EntityId::as_str).collect();
            tracing::warn!(
                count = rewritten.len(),
                ids = ?ids,
                "Ledger history rewritten"
            );
        }

        self.store_items(Collection::Ledger, items, expected_version)
            .await
    }

    /// Append entries without touching history; returns the new version.
    ///
    /// Stored rows are written back exactly as read, so legacy rows keep
    /// their original fields.
    pub async fn append_ledger_entries(&self, entries: Vec<LedgerEntry>) -> Result<u64> {
        let mut attempt = 1;
        loop {
            let doc: Document<ItemList<Value>> = self.load_items(Collection::Ledger).await?;
            let mut ledger = self.decode_ledger_rows(&doc.body.items);

            let existing: HashSet<&EntityId> = ledger.iter().map(|e| &e.id).collect();
            if let Some(dup) = entries.iter().find(|e| existing.contains(&e.id)) {
                return Err(Error::Validation(format!(
                    "ledger entry {} already exists",
                    dup.id
                )));
            }

            // Stored history is not re-checked, only the new tail and the limits
            let start = ledger.len();
            ledger.extend(entries.iter().cloned());
            validate_appended(Collection::Ledger, &ledger, start).map_err(|e| {
                self.metrics.record_validation_failure();
                tracing::info!(collection = %Collection::Ledger, error = %e, "Append rejected");
                e
            })?;

            let mut rows = doc.body.items;
            for entry in &entries {
                rows.push(serde_json::to_value(entry)?);
            }

            match self
                .store_items(Collection::Ledger, rows, Some(doc.version))
                .await
            {
                Err(e) if e.is_conflict() && attempt < APPEND_ATTEMPTS => {
                    tracing::debug!(attempt, "Ledger moved during append, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Append the entry that cancels `entry_id`; returns it
    pub async fn reverse_ledger_entry(&self, entry_id: &EntityId) -> Result<LedgerEntry> {
        let doc = self.ledger().await?;
        let original = doc
            .body
            .items
            .iter()
            .find(|e| &e.id == entry_id)
            .ok_or_else(|| Error::NotFound(format!("ledger entry {}", entry_id)))?;

        let reversal = compensating_entry(
            original,
            EntityId::new(Uuid::new_v4().to_string()),
            Some(Timestamp::Millis(now_millis())),
        )
        .ok_or_else(|| {
            Error::Validation(format!("ledger entry {} cannot be reversed", entry_id))
        })?;

        self.append_ledger_entries(vec![reversal.clone()]).await?;
        Ok(reversal)
    }

    /// Stock of every product, sorted by product id
    pub async fn stock_levels(&self) -> Result<Vec<StockSnapshot>> {
        let ledger = self.ledger().await?;

        let skipped = count_malformed(&ledger.body.items);
        if skipped > 0 {
            self.metrics.record_ledger_rows_skipped(skipped);
        }

        Ok(project(&ledger.body.items))
    }

    /// Stock of one product (zeros when it has no entries)
    pub async fn stock_for(&self, product_id: &EntityId) -> Result<StockSnapshot> {
        let ledger = self.ledger().await?;
        Ok(project_product(&ledger.body.items, product_id))
    }

    /// Inventory catalog document
    pub async fn catalog(&self) -> Result<Document<ItemList<CatalogProduct>>> {
        self.load_items(Collection::Catalog).await
    }

    /// Replace the inventory catalog
    pub async fn save_catalog(
        &self,
        items: Vec<CatalogProduct>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.save_items(Collection::Catalog, items, expected_version)
            .await
    }

    // Shipments and finance

    /// Shipments document
    pub async fn shipments(&self) -> Result<Document<ItemList<Shipment>>> {
        self.load_items(Collection::Shipments).await
    }

    /// Replace the shipments collection
    pub async fn save_shipments(
        &self,
        items: Vec<Shipment>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.save_items(Collection::Shipments, items, expected_version)
            .await
    }

    /// Expenses document
    pub async fn expenses(&self) -> Result<Document<ItemList<Expense>>> {
        self.load_items(Collection::Expenses).await
    }

    /// Replace the expenses collection
    pub async fn save_expenses(
        &self,
        items: Vec<Expense>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.save_items(Collection::Expenses, items, expected_version)
            .await
    }

    /// Sales document
    pub async fn sales(&self) -> Result<Document<ItemList<Sale>>> {
        self.load_items(Collection::Sales).await
    }

    /// Replace the sales collection
    pub async fn save_sales(&self, items: Vec<Sale>, expected_version: Option<u64>) -> Result<u64> {
        self.save_items(Collection::Sales, items, expected_version)
            .await
    }

    // Pricing

    /// Price list, or an empty one at the configured default rate
    pub async fn price_list(&self) -> Result<Document<PriceList>> {
        Ok(self
            .handle
            .load(PRICE_LIST_KEY)
            .await?
            .unwrap_or_else(|| {
                Document::unsaved(PriceList {
                    currency_rate: self.config.pricing.default_currency_rate,
                    ..PriceList::default()
                })
            }))
    }

    /// Replace the price list
    pub async fn save_price_list(
        &self,
        list: PriceList,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        if let Err(e) = validate_price_list(&list) {
            self.metrics.record_validation_failure();
            return Err(e);
        }
        let body = serde_json::to_value(&list)?;
        self.handle
            .save(PRICE_LIST_KEY, body, expected_version)
            .await
    }

    /// Every priced product with totals, rounded for display
    pub async fn quote(&self) -> Result<CatalogQuote> {
        let list = self.price_list().await?;
        Ok(quote_catalog(&list.body).rounded())
    }

    /// Landed cost of one priced product, rounded for display
    pub async fn landed_cost(&self, product_id: &EntityId) -> Result<LandedCost> {
        let list = self.price_list().await?.body;
        let product = list
            .products
            .iter()
            .find(|p| &p.id == product_id)
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;

        Ok(compute_landed_cost(product, &list.delivery_options, list.currency_rate).rounded())
    }

    /// Delete a tier and clear product references to it
    pub async fn remove_delivery_option(&self, name: &str) -> Result<Option<DeliveryOption>> {
        let mut doc = self.price_list().await?;
        let removed = match doc.body.remove_delivery_option(name) {
            Some(removed) => removed,
            None => return Ok(None),
        };

        self.save_price_list(doc.body, Some(doc.version)).await?;
        Ok(Some(removed))
    }

    /// Rename a tier; returns how many product references were rewritten
    pub async fn rename_delivery_option(&self, old_name: &str, new_name: &str) -> Result<usize> {
        let mut doc = self.price_list().await?;
        let rewritten = doc.body.rename_delivery_option(old_name, new_name)?;

        self.save_price_list(doc.body, Some(doc.version)).await?;
        Ok(rewritten)
    }

    // Dashboard

    /// Dashboard KPIs over orders, shipments, expenses and sales
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let (orders, shipments, expenses, sales) = tokio::join!(
            self.orders(),
            self.shipments(),
            self.expenses(),
            self.sales()
        );

        Ok(aggregate(
            &orders?.body.items,
            &shipments?.body.items,
            &expenses?.body.items,
            &sales?.body.items,
        ))
    }
}
