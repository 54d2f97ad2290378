// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! In-memory relational store.
//!
//! [`MemoryStore`] implements the [`Gateway`] contract with the guarantees a
//! row-locking SQL database gives the order processor:
//!
//! - every customer and product row sits behind its own mutex, and a locking
//!   read keeps that row locked until the transaction ends;
//! - lock waits give up after the configured lock timeout;
//! - stock updates happen in place under the row lock and are undone on
//!   rollback;
//! - inserts are staged per transaction and published on commit, before any
//!   row lock is released;
//! - `created_at` columns default to the transaction start time.
//!
//! # Example
//!
//! ```
//! use credit_orders::{BusinessId, Customer, CustomerId, MemoryStore, StoreConfig};
//! use rust_decimal_macros::dec;
//!
//! let store = MemoryStore::new(&StoreConfig::default());
//! store
//!     .insert_customer(Customer {
//!         id: CustomerId(1),
//!         business_id: BusinessId(1),
//!         credit_limit: dec!(100),
//!     })
//!     .unwrap();
//! assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(0));
//! ```

use crate::base::{BusinessId, CustomerId, OrderId, ProductId, UserId};
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::gateway::{
    Connection, CreditState, Gateway, NewLedgerEntry, NewOrder, NewUser, ProductStock, ScopeToken,
};
use crate::model::{CreditLedgerEntry, Customer, Order, OrderItem, Product, User};
use crate::pool::{ConnectionPool, PoolSlot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

type RowGuard<T> = ArcMutexGuard<RawMutex, T>;

#[derive(Debug)]
struct CustomerRow {
    credit_limit: Decimal,
}

#[derive(Debug)]
struct ProductRow {
    stock: u32,
    price: Decimal,
}

/// A lockable row plus its immutable tenant column.
#[derive(Debug)]
struct TenantRow<T> {
    business_id: BusinessId,
    row: Arc<Mutex<T>>,
}

impl<T> Clone for TenantRow<T> {
    fn clone(&self) -> Self {
        Self {
            business_id: self.business_id,
            row: Arc::clone(&self.row),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    customers: DashMap<CustomerId, TenantRow<CustomerRow>>,
    products: DashMap<ProductId, TenantRow<ProductRow>>,
    orders: RwLock<Vec<Order>>,
    order_items: RwLock<Vec<OrderItem>>,
    credit_ledger: RwLock<Vec<CreditLedgerEntry>>,
    users: RwLock<Vec<User>>,
    order_seq: AtomicU64,
    user_seq: AtomicU32,
}

impl Tables {
    fn customer_in_business(&self, business_id: BusinessId, customer_id: CustomerId) -> bool {
        self.customers
            .get(&customer_id)
            .is_some_and(|entry| entry.business_id == business_id)
    }
}

/// Initial data for a store: customers, products and historical ledger entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub ledger: Vec<CreditLedgerEntry>,
}

impl Seed {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Shared handle to the store. Clones share tables and pool.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Tables>,
    pool: Arc<ConnectionPool>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            pool: Arc::new(ConnectionPool::new(
                config.max_connections,
                config.acquire_timeout(),
            )),
            lock_timeout: config.lock_timeout(),
        }
    }

    /// Adds a customer row. Fails if the id is taken.
    pub fn insert_customer(&self, customer: Customer) -> Result<(), StorageError> {
        if self.tables.customers.contains_key(&customer.id) {
            return Err(StorageError::Constraint("customers_pkey"));
        }
        self.tables.customers.insert(
            customer.id,
            TenantRow {
                business_id: customer.business_id,
                row: Arc::new(Mutex::new(CustomerRow {
                    credit_limit: customer.credit_limit,
                })),
            },
        );
        Ok(())
    }

    /// Adds a product row. Fails if the id is taken or the price is negative.
    pub fn insert_product(&self, product: Product) -> Result<(), StorageError> {
        if product.price < Decimal::ZERO {
            return Err(StorageError::Constraint("products_price_non_negative"));
        }
        if self.tables.products.contains_key(&product.id) {
            return Err(StorageError::Constraint("products_pkey"));
        }
        self.tables.products.insert(
            product.id,
            TenantRow {
                business_id: product.business_id,
                row: Arc::new(Mutex::new(ProductRow {
                    stock: product.stock,
                    price: product.price,
                })),
            },
        );
        Ok(())
    }

    /// Appends a historical ledger entry, keeping its own `created_at`.
    pub fn seed_ledger_entry(&self, entry: CreditLedgerEntry) -> Result<(), StorageError> {
        if !self
            .tables
            .customer_in_business(entry.business_id, entry.customer_id)
        {
            return Err(StorageError::Constraint("credit_ledger_customer_fkey"));
        }
        self.tables.credit_ledger.write().push(entry);
        Ok(())
    }

    pub fn load_seed(&self, seed: Seed) -> Result<(), StorageError> {
        for customer in seed.customers {
            self.insert_customer(customer)?;
        }
        for product in seed.products {
            self.insert_product(product)?;
        }
        for entry in seed.ledger {
            self.seed_ledger_entry(entry)?;
        }
        Ok(())
    }

    /// Changes a product's price, waiting for the row like any writer.
    ///
    /// Returns `false` if the product does not exist.
    pub fn update_price(
        &self,
        product_id: ProductId,
        price: Decimal,
    ) -> Result<bool, StorageError> {
        if price < Decimal::ZERO {
            return Err(StorageError::Constraint("products_price_non_negative"));
        }
        let Some(record) = self
            .tables
            .products
            .get(&product_id)
            .map(|entry| entry.value().clone())
        else {
            return Ok(false);
        };
        let mut row = record
            .row
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| StorageError::LockTimeout(format!("product {product_id}")))?;
        row.price = price;
        Ok(true)
    }

    /// Committed stock of a product.
    pub fn product_stock(&self, product_id: ProductId) -> Option<u32> {
        let row = Arc::clone(&self.tables.products.get(&product_id)?.row);
        let stock = row.lock().stock;
        Some(stock)
    }

    /// Committed balance: the sum of the customer's ledger entries.
    pub fn customer_balance(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> Result<Decimal, StorageError> {
        ledger_balance(
            self.tables.credit_ledger.read().iter(),
            business_id,
            customer_id,
        )
    }

    pub fn orders(&self) -> Vec<Order> {
        self.tables.orders.read().clone()
    }

    pub fn order_items(&self) -> Vec<OrderItem> {
        self.tables.order_items.read().clone()
    }

    pub fn ledger(&self) -> Vec<CreditLedgerEntry> {
        self.tables.credit_ledger.read().clone()
    }

    /// Connections currently sitting in the pool.
    pub fn idle_connections(&self) -> usize {
        self.pool.idle()
    }
}

impl Gateway for MemoryStore {
    type Conn = MemoryConnection;

    fn acquire(&self) -> Result<MemoryConnection, StorageError> {
        let slot = self.pool.acquire()?;
        Ok(MemoryConnection {
            tables: Arc::clone(&self.tables),
            lock_timeout: self.lock_timeout,
            tx: None,
            _slot: slot,
        })
    }
}

/// Work and locks owned by one open transaction.
struct TxState {
    started_at: DateTime<Utc>,
    customers: HashMap<CustomerId, RowGuard<CustomerRow>>,
    products: HashMap<ProductId, RowGuard<ProductRow>>,
    /// Stock values to restore on rollback, oldest first.
    undo: Vec<(ProductId, u32)>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    ledger: Vec<CreditLedgerEntry>,
    users: Vec<User>,
}

impl TxState {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            customers: HashMap::new(),
            products: HashMap::new(),
            undo: Vec::new(),
            orders: Vec::new(),
            order_items: Vec::new(),
            ledger: Vec::new(),
            users: Vec::new(),
        }
    }
}

fn ledger_balance<'a>(
    entries: impl IntoIterator<Item = &'a CreditLedgerEntry>,
    business_id: BusinessId,
    customer_id: CustomerId,
) -> Result<Decimal, StorageError> {
    entries
        .into_iter()
        .filter(|e| e.business_id == business_id && e.customer_id == customer_id)
        .try_fold(Decimal::ZERO, |sum, e| {
            sum.checked_add(e.amount)
                .ok_or(StorageError::Overflow("customer balance"))
        })
}

/// Locks the row for `key` on behalf of a transaction, at most once.
///
/// Returns `Ok(None)` when the row does not exist or belongs to another
/// business. The table's map entry is released before waiting on the row so
/// a blocked transaction never stalls unrelated lookups.
fn lock_row<'a, K, T>(
    held: &'a mut HashMap<K, RowGuard<T>>,
    table: &DashMap<K, TenantRow<T>>,
    key: K,
    business_id: Option<BusinessId>,
    timeout: Duration,
    label: &str,
) -> Result<Option<&'a mut RowGuard<T>>, StorageError>
where
    K: Copy + Eq + Hash + Display,
{
    let Some(record) = table.get(&key).map(|entry| entry.value().clone()) else {
        return Ok(None);
    };
    if business_id.is_some_and(|business| business != record.business_id) {
        return Ok(None);
    }
    if !held.contains_key(&key) {
        let guard = record
            .row
            .try_lock_arc_for(timeout)
            .ok_or_else(|| StorageError::LockTimeout(format!("{label} {key}")))?;
        held.insert(key, guard);
    }
    Ok(held.get_mut(&key))
}

/// A pooled connection to a [`MemoryStore`].
pub struct MemoryConnection {
    tables: Arc<Tables>,
    lock_timeout: Duration,
    tx: Option<TxState>,
    _slot: PoolSlot,
}

impl Connection for MemoryConnection {
    fn begin(&mut self, _: ScopeToken) -> Result<(), StorageError> {
        if self.tx.is_some() {
            return Err(StorageError::TransactionInProgress);
        }
        self.tx = Some(TxState::new());
        Ok(())
    }

    fn commit(&mut self, token: ScopeToken) -> Result<(), StorageError> {
        let state = self.tx.take().ok_or(StorageError::NoTransaction)?;

        // Unique emails are checked again under the table lock; a concurrent
        // commit may have claimed one since `insert_user` looked.
        let mut users = self.tables.users.write();
        let duplicate = state
            .users
            .iter()
            .any(|new| users.iter().any(|existing| existing.email == new.email));
        if duplicate {
            drop(users);
            self.tx = Some(state);
            self.rollback(token)?;
            return Err(StorageError::Constraint("users_email_key"));
        }

        let TxState {
            customers,
            products,
            orders,
            order_items,
            ledger,
            users: new_users,
            ..
        } = state;
        users.extend(new_users);
        drop(users);
        self.tables.orders.write().extend(orders);
        self.tables.order_items.write().extend(order_items);
        self.tables.credit_ledger.write().extend(ledger);

        drop(products);
        drop(customers);
        Ok(())
    }

    fn rollback(&mut self, _: ScopeToken) -> Result<(), StorageError> {
        let mut state = self.tx.take().ok_or(StorageError::NoTransaction)?;
        let undo = std::mem::take(&mut state.undo);
        for (product_id, stock) in undo.into_iter().rev() {
            if let Some(row) = state.products.get_mut(&product_id) {
                row.stock = stock;
            }
        }
        Ok(())
    }

    fn lock_customer_credit(
        &mut self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> Result<Option<CreditState>, StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        let Some(row) = lock_row(
            &mut state.customers,
            &self.tables.customers,
            customer_id,
            Some(business_id),
            self.lock_timeout,
            "customer",
        )?
        else {
            return Ok(None);
        };
        let credit_limit = row.credit_limit;

        let committed = ledger_balance(
            self.tables.credit_ledger.read().iter(),
            business_id,
            customer_id,
        )?;
        let pending = ledger_balance(&state.ledger, business_id, customer_id)?;
        let balance = committed
            .checked_add(pending)
            .ok_or(StorageError::Overflow("customer balance"))?;

        Ok(Some(CreditState {
            credit_limit,
            balance,
        }))
    }

    fn lock_product(
        &mut self,
        business_id: BusinessId,
        product_id: ProductId,
    ) -> Result<Option<ProductStock>, StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        let row = lock_row(
            &mut state.products,
            &self.tables.products,
            product_id,
            Some(business_id),
            self.lock_timeout,
            "product",
        )?;
        Ok(row.map(|row| ProductStock {
            stock: row.stock,
            price: row.price,
        }))
    }

    fn insert_order(&mut self, order: NewOrder) -> Result<OrderId, StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        if !self
            .tables
            .customer_in_business(order.business_id, order.customer_id)
        {
            return Err(StorageError::Constraint("orders_customer_fkey"));
        }
        let id = OrderId(self.tables.order_seq.fetch_add(1, Ordering::SeqCst) + 1);
        state.orders.push(Order {
            id,
            business_id: order.business_id,
            customer_id: order.customer_id,
            total_amount: order.total_amount,
            created_at: state.started_at,
        });
        Ok(id)
    }

    fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        let Some(row) = lock_row(
            &mut state.products,
            &self.tables.products,
            product_id,
            None,
            self.lock_timeout,
            "product",
        )?
        else {
            return Ok(None);
        };
        let remaining = row
            .stock
            .checked_sub(quantity)
            .ok_or(StorageError::Constraint("products_stock_non_negative"))?;
        state.undo.push((product_id, row.stock));
        row.stock = remaining;
        Ok(Some(remaining))
    }

    fn insert_order_item(&mut self, item: OrderItem) -> Result<(), StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        let order_known = state.orders.iter().any(|o| o.id == item.order_id)
            || self.tables.orders.read().iter().any(|o| o.id == item.order_id);
        if !order_known {
            return Err(StorageError::Constraint("order_items_order_fkey"));
        }
        if !self.tables.products.contains_key(&item.product_id) {
            return Err(StorageError::Constraint("order_items_product_fkey"));
        }
        state.order_items.push(item);
        Ok(())
    }

    fn append_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        if !self
            .tables
            .customer_in_business(entry.business_id, entry.customer_id)
        {
            return Err(StorageError::Constraint("credit_ledger_customer_fkey"));
        }
        state.ledger.push(CreditLedgerEntry {
            business_id: entry.business_id,
            customer_id: entry.customer_id,
            order_id: entry.order_id,
            amount: entry.amount,
            created_at: state.started_at,
        });
        Ok(())
    }

    fn insert_user(&mut self, user: NewUser) -> Result<User, StorageError> {
        let state = self.tx.as_mut().ok_or(StorageError::NoTransaction)?;
        let taken = state.users.iter().any(|u| u.email == user.email)
            || self.tables.users.read().iter().any(|u| u.email == user.email);
        if taken {
            return Err(StorageError::Constraint("users_email_key"));
        }
        let user = User {
            id: UserId(self.tables.user_seq.fetch_add(1, Ordering::SeqCst) + 1),
            email: user.email,
            name: user.name,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    fn ledger_entries(
        &mut self,
        business_id: BusinessId,
    ) -> Result<Vec<CreditLedgerEntry>, StorageError> {
        Ok(self
            .tables
            .credit_ledger
            .read()
            .iter()
            .filter(|e| e.business_id == business_id)
            .cloned()
            .collect())
    }

    fn users(&mut self) -> Result<Vec<User>, StorageError> {
        let mut users = self.tables.users.read().clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if self.tx.is_some() {
            debug!("connection dropped inside a transaction, rolling back");
            if let Err(e) = self.rollback(ScopeToken::new()) {
                warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> MemoryStore {
        let store = MemoryStore::new(&StoreConfig {
            max_connections: 4,
            acquire_timeout_ms: 100,
            lock_timeout_ms: 50,
        });
        store
            .insert_customer(Customer {
                id: CustomerId(1),
                business_id: BusinessId(1),
                credit_limit: dec!(100),
            })
            .unwrap();
        store
            .insert_product(Product {
                id: ProductId(1),
                business_id: BusinessId(1),
                stock: 5,
                price: dec!(20),
            })
            .unwrap();
        store
    }

    #[test]
    fn statements_require_transaction() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        assert_eq!(
            conn.lock_product(BusinessId(1), ProductId(1)),
            Err(StorageError::NoTransaction)
        );
        assert_eq!(conn.commit(ScopeToken::new()), Err(StorageError::NoTransaction));
        conn.begin(ScopeToken::new()).unwrap();
        assert_eq!(conn.begin(ScopeToken::new()), Err(StorageError::TransactionInProgress));
    }

    #[test]
    fn lookups_are_scoped_by_business() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        assert_eq!(conn.lock_product(BusinessId(2), ProductId(1)), Ok(None));
        assert_eq!(conn.lock_customer_credit(BusinessId(2), CustomerId(1)), Ok(None));
        assert_eq!(conn.lock_product(BusinessId(1), ProductId(99)), Ok(None));
        assert!(
            conn.lock_product(BusinessId(1), ProductId(1))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn row_lock_held_until_commit() {
        let store = store();
        let mut first = store.acquire().unwrap();
        first.begin(ScopeToken::new()).unwrap();
        first.lock_product(BusinessId(1), ProductId(1)).unwrap();

        let mut second = store.acquire().unwrap();
        second.begin(ScopeToken::new()).unwrap();
        assert!(matches!(
            second.lock_product(BusinessId(1), ProductId(1)),
            Err(StorageError::LockTimeout(_))
        ));

        first.commit(ScopeToken::new()).unwrap();
        assert!(
            second
                .lock_product(BusinessId(1), ProductId(1))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn relocking_in_same_transaction_is_reentrant() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        conn.lock_product(BusinessId(1), ProductId(1)).unwrap();
        assert_eq!(
            conn.lock_product(BusinessId(1), ProductId(1)).unwrap(),
            Some(ProductStock {
                stock: 5,
                price: dec!(20)
            })
        );
    }

    #[test]
    fn rollback_restores_stock_and_discards_inserts() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        conn.lock_product(BusinessId(1), ProductId(1)).unwrap();
        assert_eq!(conn.decrement_stock(ProductId(1), 2), Ok(Some(3)));
        assert_eq!(conn.decrement_stock(ProductId(1), 1), Ok(Some(2)));
        let order_id = conn
            .insert_order(NewOrder {
                business_id: BusinessId(1),
                customer_id: CustomerId(1),
                total_amount: dec!(60),
            })
            .unwrap();
        conn.append_ledger_entry(NewLedgerEntry {
            business_id: BusinessId(1),
            customer_id: CustomerId(1),
            order_id: Some(order_id),
            amount: dec!(60),
        })
        .unwrap();
        conn.rollback(ScopeToken::new()).unwrap();

        assert_eq!(store.product_stock(ProductId(1)), Some(5));
        assert!(store.orders().is_empty());
        assert!(store.ledger().is_empty());
    }

    #[test]
    fn stock_cannot_go_negative() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        assert_eq!(
            conn.decrement_stock(ProductId(1), 6),
            Err(StorageError::Constraint("products_stock_non_negative"))
        );
        assert_eq!(conn.decrement_stock(ProductId(42), 1), Ok(None));
    }

    #[test]
    fn balance_sees_own_pending_entries() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        conn.append_ledger_entry(NewLedgerEntry {
            business_id: BusinessId(1),
            customer_id: CustomerId(1),
            order_id: None,
            amount: dec!(15),
        })
        .unwrap();
        let credit = conn
            .lock_customer_credit(BusinessId(1), CustomerId(1))
            .unwrap()
            .unwrap();
        assert_eq!(credit.balance, dec!(15));
        assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(0));
    }

    #[test]
    fn dropped_connection_rolls_back_and_returns_to_pool() {
        let store = store();
        {
            let mut conn = store.acquire().unwrap();
            conn.begin(ScopeToken::new()).unwrap();
            conn.decrement_stock(ProductId(1), 5).unwrap();
            assert_eq!(store.idle_connections(), 3);
        }
        assert_eq!(store.idle_connections(), 4);
        assert_eq!(store.product_stock(ProductId(1)), Some(5));
    }

    #[test]
    fn foreign_keys_checked() {
        let store = store();
        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        assert_eq!(
            conn.insert_order(NewOrder {
                business_id: BusinessId(2),
                customer_id: CustomerId(1),
                total_amount: dec!(1),
            }),
            Err(StorageError::Constraint("orders_customer_fkey"))
        );
        assert_eq!(
            conn.insert_order_item(OrderItem {
                order_id: OrderId(77),
                product_id: ProductId(1),
                quantity: 1,
                price_at_purchase: dec!(20),
            }),
            Err(StorageError::Constraint("order_items_order_fkey"))
        );
    }

    #[test]
    fn duplicate_seed_rows_rejected() {
        let store = store();
        let again = Product {
            id: ProductId(1),
            business_id: BusinessId(3),
            stock: 1,
            price: dec!(1),
        };
        assert_eq!(
            store.insert_product(again),
            Err(StorageError::Constraint("products_pkey"))
        );
    }

    #[test]
    fn seed_parses_decimal_strings() {
        let seed = Seed::from_json_str(
            r#"{
                "customers": [{"id": 5, "business_id": 2, "credit_limit": "250.50"}],
                "products": [{"id": 8, "business_id": 2, "stock": 3, "price": "9.99"}]
            }"#,
        )
        .unwrap();
        let store = MemoryStore::new(&StoreConfig::default());
        store.load_seed(seed).unwrap();
        assert_eq!(store.product_stock(ProductId(8)), Some(3));
    }

    #[test]
    fn overflowing_ledger_history_is_an_error() {
        let store = store();
        for _ in 0..2 {
            store
                .seed_ledger_entry(CreditLedgerEntry {
                    business_id: BusinessId(1),
                    customer_id: CustomerId(1),
                    order_id: None,
                    amount: Decimal::MAX,
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        let overflow = StorageError::Overflow("customer balance");
        assert_eq!(
            store.customer_balance(BusinessId(1), CustomerId(1)),
            Err(overflow.clone())
        );

        let mut conn = store.acquire().unwrap();
        conn.begin(ScopeToken::new()).unwrap();
        assert_eq!(
            conn.lock_customer_credit(BusinessId(1), CustomerId(1)),
            Err(overflow)
        );
    }
}
