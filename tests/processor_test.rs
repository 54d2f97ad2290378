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

//! Order processor public API integration tests.

use chrono::{TimeDelta, Utc};
use credit_orders::{
    BusinessId, Customer, CustomerId, ErrorKind, MemoryStore, Missing, OrderProcessor, Product,
    ProductId, PurchaseRequest, ServiceError, StorageError, StoreConfig, overdue_report,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn make_store() -> MemoryStore {
    let store = MemoryStore::new(&StoreConfig::default());
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
        .insert_product(Product {
            id: ProductId(2),
            business_id: BusinessId(1),
            stock: 10,
            price: dec!(5),
        })
        .unwrap();
    // Same shape, other tenant.
    store
        .insert_customer(Customer {
            id: CustomerId(2),
            business_id: BusinessId(2),
            credit_limit: dec!(100),
        })
        .unwrap();
    store
        .insert_product(Product {
            id: ProductId(3),
            business_id: BusinessId(2),
            stock: 5,
            price: dec!(1),
        })
        .unwrap();
    store
}

fn purchase(customer: u32, items: &[(u32, i64)]) -> PurchaseRequest {
    items.iter().fold(
        PurchaseRequest::new(BusinessId(1), CustomerId(customer)),
        |request, &(product, quantity)| request.item(ProductId(product), quantity),
    )
}

fn row_counts(store: &MemoryStore) -> (usize, usize, usize) {
    (
        store.orders().len(),
        store.order_items().len(),
        store.ledger().len(),
    )
}

#[test]
fn first_purchase_succeeds() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let order_id = processor.place_order(&purchase(1, &[(1, 3)])).unwrap();

    assert_eq!(store.product_stock(ProductId(1)), Some(2));
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(60));

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order_id);
    assert_eq!(orders[0].customer_id, CustomerId(1));
    assert_eq!(orders[0].total_amount, dec!(60));

    let ledger = store.ledger();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].order_id, Some(order_id));
    assert_eq!(ledger[0].amount, dec!(60));
    assert_eq!(ledger[0].created_at, orders[0].created_at);
}

#[test]
fn repeat_purchase_runs_out_of_stock_before_credit() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());
    processor.place_order(&purchase(1, &[(1, 3)])).unwrap();

    // 60 + 60 would also exceed the limit, but stock is checked first.
    let result = processor.place_order(&purchase(1, &[(1, 3)]));
    assert_eq!(
        result,
        Err(ServiceError::InsufficientStock {
            product: ProductId(1),
            requested: 3,
            available: 2,
        })
    );

    assert_eq!(store.product_stock(ProductId(1)), Some(2));
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(60));
    assert_eq!(row_counts(&store), (1, 1, 1));
}

#[test]
fn purchase_in_stock_exceeds_credit_limit() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());
    processor.place_order(&purchase(1, &[(1, 3)])).unwrap();

    let result = processor.place_order(&purchase(1, &[(2, 9)]));
    assert_eq!(
        result,
        Err(ServiceError::CreditLimitExceeded {
            customer: CustomerId(1),
            balance: dec!(60),
            total: dec!(45),
            limit: dec!(100),
        })
    );

    assert_eq!(store.product_stock(ProductId(2)), Some(10));
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(60));
    assert_eq!(row_counts(&store), (1, 1, 1));
}

#[test]
fn overflowing_ledger_history_aborts_purchase() {
    let store = make_store();
    for _ in 0..2 {
        store
            .seed_ledger_entry(credit_orders::CreditLedgerEntry {
                business_id: BusinessId(1),
                customer_id: CustomerId(1),
                order_id: None,
                amount: Decimal::MAX,
                created_at: Utc::now(),
            })
            .unwrap();
    }
    let processor = OrderProcessor::new(store.clone());

    let result = processor.place_order(&purchase(1, &[(2, 1)]));
    assert_eq!(
        result,
        Err(ServiceError::Storage(StorageError::Overflow(
            "customer balance"
        )))
    );
    assert_eq!(store.product_stock(ProductId(2)), Some(10));
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn purchase_up_to_exact_limit_allowed() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    processor
        .place_order(&purchase(1, &[(1, 4), (2, 4)]))
        .unwrap();

    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(100));
    assert_eq!(store.product_stock(ProductId(1)), Some(1));
    assert_eq!(store.product_stock(ProductId(2)), Some(6));
}

#[test]
fn product_from_other_business_not_found() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let result = processor.place_order(&purchase(1, &[(3, 1)]));
    assert_eq!(
        result,
        Err(ServiceError::NotFound(Missing::Product(ProductId(3))))
    );
    assert_eq!(store.product_stock(ProductId(3)), Some(5));
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn customer_from_other_business_not_found() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let result = processor.place_order(&purchase(2, &[(1, 1)]));
    assert_eq!(
        result,
        Err(ServiceError::NotFound(Missing::Customer(CustomerId(2))))
    );
    assert_eq!(store.product_stock(ProductId(1)), Some(5));
}

#[test]
fn insufficient_stock_leaves_no_rows() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    // Product 2 validates first and would fit; product 1 does not.
    let result = processor.place_order(&purchase(1, &[(2, 1), (1, 6)]));
    assert_eq!(
        result,
        Err(ServiceError::InsufficientStock {
            product: ProductId(1),
            requested: 6,
            available: 5,
        })
    );
    assert_eq!(store.product_stock(ProductId(1)), Some(5));
    assert_eq!(store.product_stock(ProductId(2)), Some(10));
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn missing_product_after_valid_lines_leaves_no_rows() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let result = processor.place_order(&purchase(1, &[(1, 1), (2, 1), (99, 1)]));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(store.product_stock(ProductId(1)), Some(5));
    assert_eq!(store.product_stock(ProductId(2)), Some(10));
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn invalid_quantities_rejected() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    for items in [&[][..], &[(1, 0)][..], &[(1, -2)][..], &[(2, 1), (1, 0)][..]] {
        let result = processor.place_order(&purchase(1, items));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidRequest);
    }
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn order_items_snapshot_price() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let order_id = processor.place_order(&purchase(1, &[(2, 2)])).unwrap();
    store.update_price(ProductId(2), dec!(7)).unwrap();

    let items = store.order_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].order_id, order_id);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].price_at_purchase, dec!(5));

    processor.place_order(&purchase(1, &[(2, 1)])).unwrap();
    assert_eq!(store.order_items()[1].price_at_purchase, dec!(7));
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(17));
}

#[test]
fn items_recorded_in_product_order() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    processor
        .place_order(&purchase(1, &[(2, 1), (1, 1), (2, 2)]))
        .unwrap();

    let items: Vec<_> = store
        .order_items()
        .iter()
        .map(|i| (i.product_id, i.quantity))
        .collect();
    assert_eq!(items, vec![(ProductId(1), 1), (ProductId(2), 3)]);
    assert_eq!(store.product_stock(ProductId(2)), Some(7));
}

#[test]
fn order_ids_increase() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());

    let first = processor.place_order(&purchase(1, &[(2, 1)])).unwrap();
    let second = processor.place_order(&purchase(1, &[(2, 1)])).unwrap();
    assert!(second > first);
}

#[test]
fn prior_ledger_credit_raises_headroom() {
    let store = make_store();
    store
        .seed_ledger_entry(credit_orders::CreditLedgerEntry {
            business_id: BusinessId(1),
            customer_id: CustomerId(1),
            order_id: None,
            amount: dec!(-40),
            created_at: Utc::now(),
        })
        .unwrap();
    let processor = OrderProcessor::new(store.clone());

    // 140 of charges against a -40 balance stays within 100.
    processor
        .place_order(&purchase(1, &[(1, 5), (2, 8)]))
        .unwrap();
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), dec!(100));
}

#[test]
fn free_products_never_hit_credit() {
    let store = make_store();
    store
        .insert_product(Product {
            id: ProductId(50),
            business_id: BusinessId(1),
            stock: 3,
            price: Decimal::ZERO,
        })
        .unwrap();
    let processor = OrderProcessor::new(store.clone());

    processor.place_order(&purchase(1, &[(50, 3)])).unwrap();
    assert_eq!(store.customer_balance(BusinessId(1), CustomerId(1)).unwrap(), Decimal::ZERO);
    assert_eq!(store.product_stock(ProductId(50)), Some(0));
}

#[test]
fn placed_orders_become_overdue_after_thirty_days() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());
    processor.place_order(&purchase(1, &[(1, 2)])).unwrap();

    let today = overdue_report(&store, BusinessId(1), Utc::now()).unwrap();
    assert_eq!(today.count, 0);

    let later = overdue_report(&store, BusinessId(1), Utc::now() + TimeDelta::days(31)).unwrap();
    assert_eq!(later.count, 1);
    assert_eq!(later.customers[0].customer_id, CustomerId(1));
    assert_eq!(later.customers[0].outstanding_balance, dec!(40));
}

#[test]
fn connections_returned_after_every_outcome() {
    let store = make_store();
    let processor = OrderProcessor::new(store.clone());
    let idle = store.idle_connections();

    processor.place_order(&purchase(1, &[(1, 1)])).unwrap();
    processor.place_order(&purchase(1, &[(1, 99)])).unwrap_err();
    processor.place_order(&purchase(1, &[(77, 1)])).unwrap_err();
    processor.place_order(&purchase(1, &[])).unwrap_err();

    assert_eq!(store.idle_connections(), idle);
}
