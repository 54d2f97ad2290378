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

//! Storage gateway interface.
//!
//! A [`Gateway`] hands out pooled [`Connection`]s. A connection executes typed
//! statements against the relational store and brackets them with
//! begin/commit/rollback. It carries no business rules: a missing row is
//! `Ok(None)`, and every failure is a [`StorageError`].
//!
//! Transaction control (`begin`, `commit`, `rollback`) takes a
//! [`ScopeToken`], which only [`TransactionScope`](crate::TransactionScope)
//! can create. Callers holding a raw connection can run statements but cannot
//! end a transaction.
//!
//! Dropping a connection returns it to the pool. Dropping it with an open
//! transaction rolls that transaction back first.

use crate::base::{BusinessId, CustomerId, OrderId, ProductId};
use crate::error::StorageError;
use crate::model::{CreditLedgerEntry, OrderItem, User};
use rust_decimal::Decimal;

/// Customer credit state read under the customer row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditState {
    pub credit_limit: Decimal,
    /// Sum of every ledger entry for the customer.
    pub balance: Decimal,
}

/// Product state read under the product row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductStock {
    pub stock: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub order_id: Option<OrderId>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

/// Permission to begin, commit or roll back a transaction.
///
/// Implementations of [`Connection`] receive it and may pass it on to a
/// connection they wrap; code outside this crate cannot make one.
///
/// ```compile_fail
/// use credit_orders::{Connection, Gateway, MemoryStore, ScopeToken, StoreConfig};
///
/// let store = MemoryStore::new(&StoreConfig::default());
/// let mut conn = store.acquire().unwrap();
/// conn.commit(ScopeToken(())).unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScopeToken(());

impl ScopeToken {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// Source of pooled connections.
pub trait Gateway: Send + Sync {
    type Conn: Connection;

    /// Takes a connection from the pool, waiting up to the acquire timeout.
    fn acquire(&self) -> Result<Self::Conn, StorageError>;
}

/// One pooled connection to the store.
pub trait Connection {
    fn begin(&mut self, token: ScopeToken) -> Result<(), StorageError>;

    fn commit(&mut self, token: ScopeToken) -> Result<(), StorageError>;

    fn rollback(&mut self, token: ScopeToken) -> Result<(), StorageError>;

    /// `SELECT credit_limit, SUM(ledger.amount) ... FOR UPDATE` on the customer
    /// row, scoped to `business_id`.
    fn lock_customer_credit(
        &mut self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> Result<Option<CreditState>, StorageError>;

    /// `SELECT stock, price ... FOR UPDATE` on the product row, scoped to
    /// `business_id`.
    fn lock_product(
        &mut self,
        business_id: BusinessId,
        product_id: ProductId,
    ) -> Result<Option<ProductStock>, StorageError>;

    fn insert_order(&mut self, order: NewOrder) -> Result<OrderId, StorageError>;

    /// `UPDATE products SET stock = stock - quantity`, locking the row if this
    /// transaction does not hold it yet. Returns the remaining stock, or `None`
    /// if the product does not exist.
    fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, StorageError>;

    fn insert_order_item(&mut self, item: OrderItem) -> Result<(), StorageError>;

    fn append_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StorageError>;

    fn insert_user(&mut self, user: NewUser) -> Result<User, StorageError>;

    /// Committed ledger entries of one business. Takes no locks.
    fn ledger_entries(
        &mut self,
        business_id: BusinessId,
    ) -> Result<Vec<CreditLedgerEntry>, StorageError>;

    /// Committed users ordered by id. Takes no locks.
    fn users(&mut self) -> Result<Vec<User>, StorageError>;
}
