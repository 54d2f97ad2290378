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

//! Entities and request types.
//!
//! Rows mirror the logical schema: `customers`, `products`, `orders`,
//! `order_items`, `credit_ledger` and `users`. Customer balance is never stored;
//! it is the sum of the customer's [`CreditLedgerEntry`] amounts.

use crate::base::{BusinessId, CustomerId, OrderId, ProductId, UserId};
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub business_id: BusinessId,
    pub credit_limit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub business_id: BusinessId,
    pub stock: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order.
///
/// `price_at_purchase` is the price read while the product row was locked, so
/// later price changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
}

/// Append-only credit movement. Positive amounts are charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedgerEntry {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// A requested line: product and quantity as sent by the caller.
///
/// The quantity is signed so malformed input can be rejected with a typed
/// error instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Purchase request for one customer.
///
/// Wire shape: `{"businessId": 1, "customerId": 2, "items": [{"productId": 3, "quantity": 1}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
}

/// A validated line in canonical lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl PurchaseRequest {
    pub fn new(business_id: BusinessId, customer_id: CustomerId) -> Self {
        Self {
            business_id,
            customer_id,
            items: Vec::new(),
        }
    }

    /// Appends a line item.
    pub fn item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(LineItem {
            product_id,
            quantity,
        });
        self
    }

    /// Validates the items and returns them in canonical lock order.
    ///
    /// Lines naming the same product are merged so the row is locked and
    /// checked once against the combined quantity. The result is sorted by
    /// product id.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidRequest`] if the list is empty or a quantity is
    /// not a positive `u32`.
    pub fn normalized_lines(&self) -> Result<Vec<OrderLine>, ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "items must not be empty".to_string(),
            ));
        }

        let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(ServiceError::InvalidRequest(format!(
                    "quantity for product {} must be positive, got {}",
                    item.product_id, item.quantity
                )));
            }
            let quantity = u32::try_from(item.quantity).map_err(|_| {
                ServiceError::InvalidRequest(format!(
                    "quantity for product {} is too large: {}",
                    item.product_id, item.quantity
                ))
            })?;
            let slot = merged.entry(item.product_id).or_insert(0);
            *slot = slot.checked_add(quantity).ok_or_else(|| {
                ServiceError::InvalidRequest(format!(
                    "combined quantity for product {} is too large",
                    item.product_id
                ))
            })?;
        }

        Ok(merged
            .into_iter()
            .map(|(product_id, quantity)| OrderLine {
                product_id,
                quantity,
            })
            .collect())
    }
}
