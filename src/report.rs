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

//! Overdue credit report.
//!
//! A read-only view over the credit ledger. It takes no row locks and runs on
//! a plain pooled connection, outside any transaction.

use crate::base::{BusinessId, CustomerId};
use crate::error::{ServiceError, StorageError};
use crate::gateway::{Connection, Gateway};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Charges older than this many days count as overdue.
pub const OVERDUE_AFTER_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueCustomer {
    pub customer_id: CustomerId,
    pub business_id: BusinessId,
    pub outstanding_balance: Decimal,
    pub oldest_unpaid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueReport {
    pub count: usize,
    pub customers: Vec<OverdueCustomer>,
}

#[derive(Debug, Default)]
struct Tally {
    aged_charges: Decimal,
    oldest_charge: Option<DateTime<Utc>>,
}

/// Customers of `business_id` carrying overdue debt as of `as_of`.
///
/// Outstanding balance is the sum of the customer's charges (positive
/// entries) created more than [`OVERDUE_AFTER_DAYS`] before `as_of`. Credits
/// and recent charges are not part of it. Ordered oldest unpaid charge first,
/// then by customer id.
///
/// # Errors
///
/// [`ServiceError::Storage`] if no connection is available or the aged charges
/// of one customer overflow a `Decimal`.
pub fn overdue_report<G: Gateway>(
    gateway: &G,
    business_id: BusinessId,
    as_of: DateTime<Utc>,
) -> Result<OverdueReport, ServiceError> {
    let entries = gateway.acquire()?.ledger_entries(business_id)?;
    let cutoff = as_of - TimeDelta::days(OVERDUE_AFTER_DAYS);

    let mut tallies: BTreeMap<CustomerId, Tally> = BTreeMap::new();
    for entry in entries
        .into_iter()
        .filter(|e| e.amount > Decimal::ZERO && e.created_at < cutoff)
    {
        let tally = tallies.entry(entry.customer_id).or_default();
        tally.aged_charges = tally
            .aged_charges
            .checked_add(entry.amount)
            .ok_or(StorageError::Overflow("overdue balance"))?;
        tally.oldest_charge = Some(match tally.oldest_charge {
            Some(oldest) => oldest.min(entry.created_at),
            None => entry.created_at,
        });
    }

    let mut customers: Vec<OverdueCustomer> = tallies
        .into_iter()
        .filter_map(|(customer_id, tally)| {
            let oldest_unpaid_at = tally.oldest_charge?;
            (tally.aged_charges > Decimal::ZERO).then_some(OverdueCustomer {
                customer_id,
                business_id,
                outstanding_balance: tally.aged_charges,
                oldest_unpaid_at,
            })
        })
        .collect();
    customers.sort_by_key(|c| (c.oldest_unpaid_at, c.customer_id));

    Ok(OverdueReport {
        count: customers.len(),
        customers,
    })
}
