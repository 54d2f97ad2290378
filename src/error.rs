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

//! Error types for order processing and storage.

use crate::base::{CustomerId, ProductId};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Failures reported by the storage gateway.
///
/// A missing row is not an error at this level; lookups return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No pooled connection became free within the acquire timeout
    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,

    /// A row lock could not be obtained within the lock timeout
    #[error("timed out waiting for row lock on {0}")]
    LockTimeout(String),

    /// A write would break a table constraint
    #[error("constraint violated: {0}")]
    Constraint(&'static str),

    /// Statement requires an open transaction
    #[error("no transaction in progress")]
    NoTransaction,

    /// `begin` issued while a transaction is already open
    #[error("transaction already in progress")]
    TransactionInProgress,

    /// An aggregate over stored values does not fit in a `Decimal`
    #[error("numeric overflow in {0}")]
    Overflow(&'static str),

    /// The connection to the store is unusable
    #[error("connection failure: {0}")]
    Connectivity(String),
}

/// Entity that a lookup failed to find within the requested business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Customer(CustomerId),
    Product(ProductId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer {id}"),
            Self::Product(id) => write!(f, "product {id}"),
        }
    }
}

/// Errors returned by the order processor and the glue operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Customer or product does not exist in the given business
    #[error("{0} not found")]
    NotFound(Missing),

    /// A line item asks for more units than the product has
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order would push the customer's balance past the credit limit
    #[error("credit limit exceeded for customer {customer}: balance {balance} + order {total} > limit {limit}")]
    CreditLimitExceeded {
        customer: CustomerId,
        balance: Decimal,
        total: Decimal,
        limit: Decimal,
    },

    /// Empty item list, non-positive quantity or otherwise malformed input
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The storage gateway failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Rollback failed after the work had already failed
    #[error("rollback failed ({rollback}) while aborting: {cause}")]
    RollbackFailed {
        cause: Box<ServiceError>,
        rollback: StorageError,
    },
}

impl ServiceError {
    /// Classifies the error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Storage(_) | Self::RollbackFailed { .. } => ErrorKind::StorageFailure,
        }
    }

    /// The failure that started the abort, looking through rollback wrappers.
    pub fn root_cause(&self) -> &ServiceError {
        match self {
            Self::RollbackFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    CreditLimitExceeded,
    InvalidRequest,
    StorageFailure,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::CreditLimitExceeded => "CREDIT_LIMIT_EXCEEDED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::StorageFailure => "STORAGE_FAILURE",
        }
    }

    /// HTTP status an outer layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidRequest => 400,
            Self::InsufficientStock | Self::CreditLimitExceeded => 422,
            Self::StorageFailure => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
