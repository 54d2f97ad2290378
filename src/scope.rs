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

//! Transaction scope.
//!
//! [`TransactionScope::run`] is the only code that commits or rolls back. The
//! work closure receives a [`Transaction`], a handle that borrows the pooled
//! connection and exposes statements only; it cannot commit, roll back, or
//! outlive the scope.
//!
//! # Outcomes
//!
//! | Work | Commit / rollback | Result |
//! |------|-------------------|--------|
//! | `Ok(v)` | commit ok | `Ok(v)` |
//! | `Ok(v)` | commit fails | commit error (rollback attempted) |
//! | `Err(e)` | rollback ok | `Err(e)` unchanged |
//! | `Err(e)` | rollback fails | [`ServiceError::RollbackFailed`] wrapping `e` |
//!
//! In every case the connection goes back to the pool exactly once, when the
//! pooled connection is dropped at the end of `run`.

use crate::base::{BusinessId, CustomerId, OrderId, ProductId};
use crate::error::{ServiceError, StorageError};
use crate::gateway::{
    Connection, CreditState, Gateway, NewLedgerEntry, NewOrder, NewUser, ProductStock, ScopeToken,
};
use crate::model::{OrderItem, User};
use tracing::{debug, warn};

/// Statement handle bound to one open transaction.
pub struct Transaction<'c, C: Connection> {
    conn: &'c mut C,
}

impl<C: Connection> Transaction<'_, C> {
    pub fn lock_customer_credit(
        &mut self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> Result<Option<CreditState>, StorageError> {
        self.conn.lock_customer_credit(business_id, customer_id)
    }

    pub fn lock_product(
        &mut self,
        business_id: BusinessId,
        product_id: ProductId,
    ) -> Result<Option<ProductStock>, StorageError> {
        self.conn.lock_product(business_id, product_id)
    }

    pub fn insert_order(&mut self, order: NewOrder) -> Result<OrderId, StorageError> {
        self.conn.insert_order(order)
    }

    pub fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, StorageError> {
        self.conn.decrement_stock(product_id, quantity)
    }

    pub fn insert_order_item(&mut self, item: OrderItem) -> Result<(), StorageError> {
        self.conn.insert_order_item(item)
    }

    pub fn append_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StorageError> {
        self.conn.append_ledger_entry(entry)
    }

    pub fn insert_user(&mut self, user: NewUser) -> Result<User, StorageError> {
        self.conn.insert_user(user)
    }
}

/// Runs units of work atomically on connections from a [`Gateway`].
#[derive(Debug, Clone)]
pub struct TransactionScope<G> {
    gateway: G,
}

impl<G: Gateway> TransactionScope<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Runs `work` inside one transaction.
    ///
    /// # Errors
    ///
    /// - The error returned by `work`, unchanged, after a successful rollback.
    /// - [`ServiceError::RollbackFailed`] if rolling back after a failure fails.
    /// - [`ServiceError::Storage`] if acquiring, beginning or committing fails.
    pub fn run<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Transaction<'_, G::Conn>) -> Result<T, ServiceError>,
    {
        let mut conn = self.gateway.acquire()?;
        conn.begin(ScopeToken::new())?;

        let outcome = work(&mut Transaction { conn: &mut conn });

        match outcome {
            Ok(value) => match conn.commit(ScopeToken::new()) {
                Ok(()) => Ok(value),
                Err(commit) => {
                    warn!(error = %commit, "commit failed, rolling back");
                    Err(abort(&mut conn, ServiceError::Storage(commit)))
                }
            },
            Err(cause) => {
                debug!(error = %cause, "rolling back");
                Err(abort(&mut conn, cause))
            }
        }
    }
}

/// Rolls back and returns the error the caller should see.
fn abort<C: Connection>(conn: &mut C, cause: ServiceError) -> ServiceError {
    match conn.rollback(ScopeToken::new()) {
        // A failed commit may already have ended the transaction.
        Ok(()) | Err(StorageError::NoTransaction) => cause,
        Err(rollback) => {
            warn!(error = %rollback, cause = %cause, "rollback failed");
            ServiceError::RollbackFailed {
                cause: Box::new(cause),
                rollback,
            }
        }
    }
}
