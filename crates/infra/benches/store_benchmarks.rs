use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use serde_json::Map;

use craftowl_catalog::{CreateTool, Tool};
use craftowl_core::{Email, InsertionOrder, OrderId, Price};
use craftowl_infra::InMemoryCollection;
use craftowl_orders::{Order, OrderFilter, OrderPatch, OrderStatus, PlaceOrder};

fn order_for(email: &Email) -> Order {
    PlaceOrder {
        email: email.clone(),
        tool_id: "T1".to_string(),
        quantity: 1,
        details: Map::new(),
        occurred_at: Utc::now(),
    }
    .into_order()
    .unwrap()
}

fn tool(i: u64) -> Tool {
    CreateTool {
        name: format!("Tool {i}"),
        price: Price::from_minor_units(100 + (i * 37) % 5000),
        description: String::new(),
        quantity: 1,
        image: String::new(),
        extra: Map::new(),
    }
    .into_tool(Utc::now())
    .unwrap()
}

fn seeded_orders(count: usize) -> (InMemoryCollection<Order>, Vec<OrderId>) {
    let collection = InMemoryCollection::new();
    let owners: Vec<Email> = (0..10)
        .map(|i| Email::parse(&format!("user{i}@x.com")).unwrap())
        .collect();
    let ids = (0..count)
        .map(|i| collection.upsert(order_for(&owners[i % owners.len()])).unwrap().id)
        .collect();
    (collection, ids)
}

fn bench_conditional_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditional_update");

    // Miss path: the filter rejects every call, so state never changes between iterations.
    for size in [100usize, 1000, 10000] {
        let (collection, ids) = seeded_orders(size);
        let filter = OrderFilter::any().in_status(OrderStatus::Shipped);
        let patch = OrderPatch {
            status: OrderStatus::Shipped,
            transaction_id: None,
        };

        group.bench_with_input(BenchmarkId::new("filter_miss", size), &ids, |b, ids| {
            let mut i = 0;
            b.iter(|| {
                let id = &ids[i % ids.len()];
                i += 1;
                collection
                    .update_if(id, |o| filter.matches(o), |o| patch.apply(o))
                    .unwrap()
            });
        });
    }

    group.bench_function("confirm_then_ship", |b| {
        let owner = Email::parse("a@x.com").unwrap();
        let collection = InMemoryCollection::new();
        let pay = OrderPatch {
            status: OrderStatus::Pending,
            transaction_id: Some("tx_bench".to_string()),
        };
        let ship = OrderPatch {
            status: OrderStatus::Shipped,
            transaction_id: None,
        };

        b.iter(|| {
            let id = collection.upsert(order_for(&owner)).unwrap().id;
            let unpaid = OrderFilter::owned_by(&owner).in_status(OrderStatus::Unpaid);
            let pending = OrderFilter::any().in_status(OrderStatus::Pending);
            collection.update_if(&id, |o| unpaid.matches(o), |o| pay.apply(o)).unwrap();
            black_box(collection.update_if(&id, |o| pending.matches(o), |o| ship.apply(o)).unwrap())
        });
    });

    group.finish();
}

fn bench_ordered_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_scan");

    for size in [100u64, 1000, 10000] {
        let collection = InMemoryCollection::new();
        for i in 0..size {
            collection.upsert(tool(i)).unwrap();
        }
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("newest_first", size), &size, |b, _| {
            b.iter(|| collection.scan(InsertionOrder::NewestFirst, |_| true).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("cheapest", size), &size, |b, _| {
            b.iter(|| {
                let mut tools = collection.scan(InsertionOrder::OldestFirst, |_| true).unwrap();
                tools.sort_by_key(|t| t.price);
                black_box(tools.into_iter().next())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_conditional_update, bench_ordered_scan);
criterion_main!(benches);
