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

//! Core identifier types.
//!
//! Every entity is addressed through its own newtype so a product id can never
//! be passed where a customer id is expected. All ids serialize as bare numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Tenant partition. Customers, products, orders and ledger entries all
    /// belong to exactly one business.
    BusinessId(u32)
);

id_type!(
    /// Identifier of a credit customer.
    CustomerId(u32)
);

id_type!(
    /// Identifier of a product.
    ///
    /// Ordered: ascending product id is the canonical row-lock order.
    ProductId(u32)
);

id_type!(
    /// Identifier of a placed order, drawn from a store-wide sequence.
    OrderId(u64)
);

id_type!(
    /// Identifier of a registered user.
    UserId(u32)
);
