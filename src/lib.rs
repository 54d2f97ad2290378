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

//! # Credit Orders
//!
//! This library places purchase orders for customers who buy on credit. Each
//! order is checked against product stock and the customer's credit limit and
//! then recorded atomically: stock decrements, the order and its items, and a
//! charge in the append-only credit ledger all commit together or not at all.
//!
//! ## Core Components
//!
//! - [`OrderProcessor`]: validates and places orders inside one transaction
//! - [`TransactionScope`]: begin/commit/rollback bracket with guaranteed release
//! - [`Gateway`] / [`Connection`]: storage interface the core runs against
//! - [`MemoryStore`]: row-locking in-memory store with a bounded connection pool
//! - [`overdue_report`] and [`register_user`]: read/write glue around the core
//!
//! ## Example
//!
//! ```
//! use credit_orders::{
//!     BusinessId, Customer, CustomerId, MemoryStore, OrderProcessor, Product, ProductId,
//!     PurchaseRequest, StoreConfig,
//! };
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
//! store
//!     .insert_product(Product {
//!         id: ProductId(1),
//!         business_id: BusinessId(1),
//!         stock: 5,
//!         price: dec!(20),
//!     })
//!     .unwrap();
//!
//! let processor = OrderProcessor::new(store.clone());
//! let request = PurchaseRequest::new(BusinessId(1), CustomerId(1)).item(ProductId(1), 3);
//! processor.place_order(&request).unwrap();
//!
//! assert_eq!(store.product_stock(ProductId(1)), Some(2));
//! assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(60));
//! ```
//!
//! ## Thread Safety
//!
//! Processors and stores are cheap to clone and safe to share across threads.
//! Coordination happens only through row locks held by each transaction, so
//! purchases for different customers and products run in parallel.

mod base;
pub mod config;
pub mod error;
mod gateway;
pub mod model;
mod pool;
mod processor;
mod registration;
mod report;
mod scope;
mod store;

pub use base::{BusinessId, CustomerId, OrderId, ProductId, UserId};
pub use config::StoreConfig;
pub use error::{ErrorKind, Missing, ServiceError, StorageError};
pub use gateway::{
    Connection, CreditState, Gateway, NewLedgerEntry, NewOrder, NewUser, ProductStock, ScopeToken,
};
pub use model::{
    CreditLedgerEntry, Customer, LineItem, Order, OrderItem, OrderLine, Product,
    PurchaseRequest, User,
};
pub use processor::OrderProcessor;
pub use registration::{list_users, register_user};
pub use report::{OVERDUE_AFTER_DAYS, OverdueCustomer, OverdueReport, overdue_report};
pub use scope::{Transaction, TransactionScope};
pub use store::{MemoryConnection, MemoryStore, Seed};
