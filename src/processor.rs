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

//! Order placement.
//!
//! The [`OrderProcessor`] turns a [`PurchaseRequest`] into an order, its items
//! and one ledger charge, all inside a single [`TransactionScope`].
//!
//! # Locking
//!
//! Locks are taken customer row first, then product rows in ascending product
//! id (see [`PurchaseRequest::normalized_lines`]). Every purchase follows the
//! same order, so two purchases sharing products can wait on each other but
//! never deadlock. Purchases for the same customer serialize on the customer
//! row, which makes the credit check and the ledger append one atomic step.
//!
//! # Steps
//!
//! 1. Lock the customer, read credit limit and ledger balance.
//! 2. Lock each product, check stock, accumulate `price * quantity`.
//! 3. Reject if `balance + total > credit_limit`.
//! 4. Insert the order.
//! 5. Decrement stock and insert items priced as read in step 2.
//! 6. Append the ledger charge.
//!
//! Nothing is written before step 4, and any failure rolls the scope back.

use crate::base::{OrderId, ProductId};
use crate::error::{Missing, ServiceError};
use crate::gateway::{Connection, Gateway, NewLedgerEntry, NewOrder};
use crate::model::{OrderItem, PurchaseRequest};
use crate::scope::{Transaction, TransactionScope};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// A line after validation, with the price frozen under the row lock.
#[derive(Debug, Clone, Copy)]
struct PricedLine {
    product_id: ProductId,
    quantity: u32,
    price: Decimal,
}

/// Places purchase orders against credit-limited customers.
#[derive(Debug, Clone)]
pub struct OrderProcessor<G> {
    scope: TransactionScope<G>,
}

impl<G: Gateway> OrderProcessor<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            scope: TransactionScope::new(gateway),
        }
    }

    pub fn scope(&self) -> &TransactionScope<G> {
        &self.scope
    }

    /// Places an order and returns its id.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRequest`] - empty items, non-positive quantity, total overflow.
    /// - [`ServiceError::NotFound`] - customer or product missing in the business.
    /// - [`ServiceError::InsufficientStock`] - a line asks for more than is in stock.
    /// - [`ServiceError::CreditLimitExceeded`] - the order would pass the credit limit.
    /// - [`ServiceError::Storage`] / [`ServiceError::RollbackFailed`] - the store failed.
    pub fn place_order(&self, request: &PurchaseRequest) -> Result<OrderId, ServiceError> {
        let lines = request.normalized_lines()?;
        let business_id = request.business_id;
        let customer_id = request.customer_id;

        let order_id = self.scope.run(|tx| {
            let credit = tx
                .lock_customer_credit(business_id, customer_id)?
                .ok_or(ServiceError::NotFound(Missing::Customer(customer_id)))?;

            let mut priced = Vec::with_capacity(lines.len());
            let mut total = Decimal::ZERO;
            for line in &lines {
                let product = tx
                    .lock_product(business_id, line.product_id)?
                    .ok_or(ServiceError::NotFound(Missing::Product(line.product_id)))?;
                if product.stock < line.quantity {
                    return Err(ServiceError::InsufficientStock {
                        product: line.product_id,
                        requested: line.quantity,
                        available: product.stock,
                    });
                }
                total = product
                    .price
                    .checked_mul(Decimal::from(line.quantity))
                    .and_then(|line_total| total.checked_add(line_total))
                    .ok_or_else(|| {
                        ServiceError::InvalidRequest("order total overflows".to_string())
                    })?;
                priced.push(PricedLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price: product.price,
                });
            }

            let exceeds = credit
                .balance
                .checked_add(total)
                .is_none_or(|after| after > credit.credit_limit);
            if exceeds {
                return Err(ServiceError::CreditLimitExceeded {
                    customer: customer_id,
                    balance: credit.balance,
                    total,
                    limit: credit.credit_limit,
                });
            }

            let order_id = tx.insert_order(NewOrder {
                business_id,
                customer_id,
                total_amount: total,
            })?;
            record_items(tx, order_id, &priced)?;
            tx.append_ledger_entry(NewLedgerEntry {
                business_id,
                customer_id,
                order_id: Some(order_id),
                amount: total,
            })?;

            debug!(%order_id, %total, lines = priced.len(), "order staged");
            Ok(order_id)
        })?;

        info!(%business_id, %customer_id, %order_id, "order placed");
        Ok(order_id)
    }
}

fn record_items<C: Connection>(
    tx: &mut Transaction<'_, C>,
    order_id: OrderId,
    lines: &[PricedLine],
) -> Result<(), ServiceError> {
    for line in lines {
        tx.decrement_stock(line.product_id, line.quantity)?
            .ok_or(ServiceError::NotFound(Missing::Product(line.product_id)))?;
        tx.insert_order_item(OrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: line.price,
        })?;
    }
    Ok(())
}
