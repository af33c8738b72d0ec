#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::rc::Rc;

use common::{
    FailingJdbc, LazyOrder, LazyOrderItem, Order, OrderItem, PersonV3, RecordingJdbc, person_row,
    registry,
};
use entity_persistence::{
    DefaultDmlQueryBuilder, EntityLoader, EntityManager, EntityPersister, PersistenceConfig,
    PersistenceError, Row, SqlType, Value,
};
use pretty_assertions::assert_eq;

fn order_row(order_id: i64, number: &str, item: Option<(i64, &str, i32)>) -> Row {
    let row = Row::new()
        .with("orders.id", order_id)
        .with("orders.orderNumber", number);
    match item {
        Some((id, product, quantity)) => row
            .with("eager_order_items.id", id)
            .with("eager_order_items.product", product)
            .with("eager_order_items.quantity", quantity),
        None => row
            .with("eager_order_items.id", Value::null(SqlType::BigInt))
            .with("eager_order_items.product", Value::null(SqlType::Varchar))
            .with("eager_order_items.quantity", Value::null(SqlType::Integer)),
    }
}

fn item(id: i64, product: &str, quantity: i32) -> OrderItem {
    OrderItem {
        id,
        product: product.to_string(),
        quantity,
    }
}

#[test]
fn eager_join_rows_collapse_to_one_owner_per_key() {
    let registry = registry();
    let jdbc = RecordingJdbc::new().returning(vec![
        order_row(1, "A-1", Some((10, "pen", 2))),
        order_row(2, "A-2", None),
        order_row(1, "A-1", Some((11, "ink", 1))),
        order_row(1, "A-1", Some((12, "pad", 5))),
    ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let orders = loader.load_all::<Order>().unwrap();

    assert_eq!(
        orders,
        vec![
            Order {
                id: 1,
                order_number: "A-1".to_string(),
                order_items: vec![item(10, "pen", 2), item(11, "ink", 1), item(12, "pad", 5)],
            },
            Order {
                id: 2,
                order_number: "A-2".to_string(),
                order_items: Vec::new(),
            },
        ]
    );
    assert!(jdbc.statements()[0].contains("\nleft join\n    eager_order_items\n"));
}

#[test]
fn joined_rows_without_owner_key_are_dropped() {
    let registry = registry();
    let orphan = Row::new()
        .with("orders.id", Value::null(SqlType::BigInt))
        .with("orders.orderNumber", Value::null(SqlType::Varchar))
        .with("eager_order_items.id", 99i64)
        .with("eager_order_items.product", "stray")
        .with("eager_order_items.quantity", 1i32);
    let jdbc = RecordingJdbc::new().returning(vec![
        orphan,
        order_row(1, "A-1", Some((10, "pen", 2))),
    ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let orders = loader.load_all::<Order>().unwrap();

    assert_eq!(
        orders,
        vec![Order {
            id: 1,
            order_number: "A-1".to_string(),
            order_items: vec![item(10, "pen", 2)],
        }]
    );
}

#[test]
fn load_filters_by_key_and_returns_none_when_absent() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![person_row(3, "neo", 30, "neo@domain.com")])
        .returning(Vec::new());
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let found = loader.load::<PersonV3>(3i64).unwrap();
    let missing = loader.load::<PersonV3>(4i64).unwrap();

    assert_eq!(found, Some(PersonV3::new(3, "neo", 30, "neo@domain.com")));
    assert_eq!(missing, None);
    assert_eq!(
        jdbc.statements()[1],
        "select\n    users.id, users.nick_name, users.old, users.email\nfrom\n    users\nwhere\n    users.id = 4"
    );
}

#[test]
fn lazy_collection_is_loaded_on_request() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![
            Row::new()
                .with("lazy_orders.id", 5i64)
                .with("lazy_orders.orderNumber", "L-5"),
        ])
        .returning(vec![
            Row::new()
                .with("lazy_order_items.id", 50i64)
                .with("lazy_order_items.product", "cup")
                .with("lazy_order_items.quantity", 4i32),
            Row::new()
                .with("lazy_order_items.id", 51i64)
                .with("lazy_order_items.product", "mug")
                .with("lazy_order_items.quantity", 1i32),
        ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let mut order = loader.load::<LazyOrder>(5i64).unwrap().unwrap();
    assert!(order.order_items.is_empty());
    assert!(!jdbc.statements()[0].contains("left join"));

    let attached = loader.load_collection(&mut order, "order_items").unwrap();

    assert_eq!(attached, 2);
    assert_eq!(
        order.order_items,
        vec![
            LazyOrderItem {
                id: 50,
                product: "cup".to_string(),
                quantity: 4,
            },
            LazyOrderItem {
                id: 51,
                product: "mug".to_string(),
                quantity: 1,
            },
        ]
    );
    assert_eq!(
        jdbc.last_statement().unwrap(),
        "select\n    lazy_order_items.id, lazy_order_items.product, lazy_order_items.quantity\nfrom\n    lazy_order_items\nwhere\n    lazy_order_items.order_id = 5"
    );
}

fn lazy_item_row(id: i64, product: &str, quantity: i32) -> Row {
    Row::new()
        .with("lazy_order_items.id", id)
        .with("lazy_order_items.product", product)
        .with("lazy_order_items.quantity", quantity)
}

#[test]
fn reloading_a_collection_replaces_its_elements() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![lazy_item_row(50, "cup", 4)])
        .returning(vec![lazy_item_row(50, "cup", 4)]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());
    let mut order = LazyOrder {
        id: 5,
        ..LazyOrder::default()
    };

    loader.load_collection(&mut order, "order_items").unwrap();
    let attached = loader.load_collection(&mut order, "order_items").unwrap();

    assert_eq!(attached, 1);
    assert_eq!(
        order.order_items,
        vec![LazyOrderItem {
            id: 50,
            product: "cup".to_string(),
            quantity: 4,
        }]
    );
}

#[test]
fn loading_an_eager_collection_again_does_not_duplicate() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![order_row(1, "A-1", Some((10, "pen", 2)))])
        .returning(vec![
            Row::new()
                .with("eager_order_items.id", 10i64)
                .with("eager_order_items.product", "pen")
                .with("eager_order_items.quantity", 2i32),
        ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let mut order = loader.load::<Order>(1i64).unwrap().unwrap();
    loader.load_collection(&mut order, "order_items").unwrap();

    assert_eq!(order.order_items, vec![item(10, "pen", 2)]);
}

#[test]
fn load_collection_rejects_unknown_field() {
    let registry = registry();
    let jdbc = RecordingJdbc::new();
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());
    let mut order = LazyOrder {
        id: 5,
        ..LazyOrder::default()
    };

    let err = loader.load_collection(&mut order, "invoices").unwrap_err();

    assert!(matches!(err, PersistenceError::UnknownField { field, .. } if field == "invoices"));
    assert!(jdbc.statements().is_empty());
}

#[test]
fn missing_cell_is_wrapped_as_data_access_fault() {
    let registry = registry();
    let jdbc = RecordingJdbc::new().returning(vec![
        Row::new()
            .with("users.id", 1i64)
            .with("users.nick_name", "name")
            .with("users.old", 1i32),
    ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let err = loader.load_all::<PersonV3>().unwrap_err();

    match err {
        PersistenceError::DataAccess { label, source } => {
            assert_eq!(label, "users.email");
            assert!(matches!(*source, PersistenceError::MissingColumn { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mistyped_cell_is_wrapped_as_data_access_fault() {
    let registry = registry();
    let jdbc = RecordingJdbc::new().returning(vec![
        person_row(1, "name", 1, "email@domain.com").with("users.old", "ten"),
    ]);
    let loader = EntityLoader::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let err = loader.load_all::<PersonV3>().unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to read column users.old: type mismatch: expected INTEGER, found text"
    );
}

#[test]
fn execution_errors_propagate_unchanged() {
    let registry = registry();
    let loader = EntityLoader::new(&FailingJdbc, &registry, DefaultDmlQueryBuilder::default());

    let err = loader.load::<PersonV3>(1i64).unwrap_err();

    assert!(matches!(err, PersistenceError::Execution(_)));
    assert_eq!(err.to_string(), "connection refused");
}

#[test]
fn persister_writes_by_primary_key() {
    let registry = registry();
    let jdbc = RecordingJdbc::new();
    let persister = EntityPersister::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());
    let order = Order {
        id: 7,
        order_number: "A-7".to_string(),
        order_items: vec![item(70, "pen", 1)],
    };

    assert_eq!(persister.insert(&order).unwrap(), 1);
    persister.delete(&order).unwrap();

    assert_eq!(
        jdbc.statements(),
        vec![
            "insert\ninto\n    orders\n    (orderNumber, id)\nvalues\n    ('A-7', 7)".to_string(),
            "delete\nfrom\n    orders\nwhere\n    orders.id = 7".to_string(),
        ]
    );
}

#[test]
fn persister_delete_requires_a_key() {
    let registry = registry();
    let jdbc = RecordingJdbc::new();
    let persister = EntityPersister::new(&jdbc, &registry, DefaultDmlQueryBuilder::default());

    let err = persister.delete(&PersonV3::default()).unwrap_err();

    assert!(matches!(err, PersistenceError::MissingPrimaryKeyValue { .. }));
    assert!(jdbc.statements().is_empty());
}

#[test]
fn manager_returns_one_instance_per_key() {
    let registry = registry();
    let jdbc = RecordingJdbc::new().returning(vec![person_row(1, "name", 1, "email@domain.com")]);
    let mut manager = EntityManager::new(jdbc, &registry, &PersistenceConfig::default());

    let first = manager.find::<PersonV3>(1i64).unwrap().unwrap();
    let second = manager.find::<PersonV3>(1i64).unwrap().unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(manager.jdbc().statements().len(), 1);

    first.borrow_mut().name = "renamed".to_string();
    assert_eq!(second.borrow().name, "renamed");

    manager.merge(&first).unwrap();
    assert_eq!(
        manager.jdbc().last_statement().unwrap(),
        "update\n    users\nset\n    nick_name = 'renamed', old = 1, email = 'email@domain.com'\nwhere\n    users.id = 1"
    );
}

#[test]
fn manager_remove_evicts_and_clear_ends_the_unit_of_work() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![person_row(1, "name", 1, "email@domain.com")])
        .returning(vec![person_row(2, "other", 2, "other@domain.com")]);
    let mut manager = EntityManager::new(jdbc, &registry, &PersistenceConfig::default());

    let first = manager.find::<PersonV3>(1i64).unwrap().unwrap();
    manager.find::<PersonV3>(2i64).unwrap().unwrap();
    assert!(manager.contains::<PersonV3>(1i64));

    manager.remove(&first).unwrap();
    assert!(!manager.contains::<PersonV3>(1i64));
    assert_eq!(
        manager.jdbc().last_statement().unwrap(),
        "delete\nfrom\n    users\nwhere\n    users.id = 1"
    );

    manager.clear();
    assert!(!manager.contains::<PersonV3>(2i64));
}

#[test]
fn manager_caches_persisted_instances_with_known_keys() {
    let registry = registry();
    let config = PersistenceConfig::from_json_str(r#"{"show_sql": true}"#).unwrap();
    let mut manager = EntityManager::new(RecordingJdbc::new(), &registry, &config);

    let order = manager
        .persist(Order {
            id: 7,
            order_number: "A-7".to_string(),
            order_items: Vec::new(),
        })
        .unwrap();
    manager.persist(PersonV3::new(9, "gen", 1, "gen@domain.com")).unwrap();

    let found = manager.find::<Order>(7i64).unwrap().unwrap();
    assert!(Rc::ptr_eq(&order, &found));
    assert!(!manager.contains::<PersonV3>(9i64));
    assert_eq!(manager.jdbc().statements().len(), 2);
}

#[test]
fn manager_loads_lazy_collection_of_managed_instance() {
    let registry = registry();
    let jdbc = RecordingJdbc::new()
        .returning(vec![
            Row::new()
                .with("lazy_orders.id", 5i64)
                .with("lazy_orders.orderNumber", "L-5"),
        ])
        .returning(vec![
            Row::new()
                .with("lazy_order_items.id", 50i64)
                .with("lazy_order_items.product", "cup")
                .with("lazy_order_items.quantity", 4i32),
        ]);
    let mut manager = EntityManager::new(jdbc, &registry, &PersistenceConfig::default());

    let order = manager.find::<LazyOrder>(5i64).unwrap().unwrap();
    let attached = manager.load_collection(&order, "order_items").unwrap();

    assert_eq!(attached, 1);
    assert_eq!(order.borrow().order_items[0].product, "cup");
}
