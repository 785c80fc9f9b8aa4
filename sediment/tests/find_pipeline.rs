use bson::{Bson, doc};
use chrono::{TimeZone, Utc};

use sediment::{memory::MemoryStore, prelude::*};

async fn seeded_products(db: &Database) -> std::sync::Arc<Collection> {
    let products = db.collection("products").await.unwrap();
    for (name, price) in [
        ("Laptop", 1200),
        ("Phone", 800),
        ("Headphones", 150),
        ("Monitor", 300),
    ] {
        products
            .insert(doc! { "name": name, "price": price })
            .await
            .unwrap();
    }
    products
}

#[tokio::test]
async fn empty_query_returns_everything_in_scan_order() {
    let db = Database::new(MemoryStore::new());
    let products = seeded_products(&db).await;

    let all = products.find(&Query::new()).await.unwrap();
    let names: Vec<_> = all.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, ["Laptop", "Phone", "Headphones", "Monitor"]);
}

#[tokio::test]
async fn price_filter_selects_exactly_the_matching_documents() {
    let db = Database::new(MemoryStore::new());
    let products = seeded_products(&db).await;

    let expensive = products
        .find(&Query::parse(&doc! { "price": { "$gt": 500 } }).unwrap())
        .await
        .unwrap();

    let mut prices: Vec<_> = expensive
        .iter()
        .map(|d| d.get_i32("price").unwrap())
        .collect();
    prices.sort_unstable();
    assert_eq!(prices, [800, 1200]);
}

#[tokio::test]
async fn pipeline_sorts_before_skip_and_skip_before_limit() {
    let db = Database::new(MemoryStore::new());
    let people = db.collection("people").await.unwrap();
    for age in [25, 30, 35, 28] {
        people.insert(doc! { "age": age }).await.unwrap();
    }

    let top_two = people
        .find(
            &Query::builder()
                .sort("age", SortDirection::Desc)
                .limit(2)
                .build(),
        )
        .await
        .unwrap();
    let ages: Vec<_> = top_two.iter().map(|d| d.get_i32("age").unwrap()).collect();
    assert_eq!(ages, [35, 30]);

    let second_page = people
        .find(
            &Query::builder()
                .sort("age", SortDirection::Desc)
                .offset(1)
                .limit(2)
                .build(),
        )
        .await
        .unwrap();
    let ages: Vec<_> = second_page
        .iter()
        .map(|d| d.get_i32("age").unwrap())
        .collect();
    assert_eq!(ages, [30, 28]);
}

#[tokio::test]
async fn find_one_respects_the_query_sort() {
    let db = Database::new(MemoryStore::new());
    let products = seeded_products(&db).await;

    let cheapest = products
        .find_one(&Query::builder().sort("price", SortDirection::Asc).build())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cheapest.get_str("name").unwrap(), "Headphones");
}

#[tokio::test]
async fn count_ignores_sort_skip_and_limit() {
    let db = Database::new(MemoryStore::new());
    let products = seeded_products(&db).await;

    let filter = Filter::gte("price", 300);
    assert_eq!(products.count(Some(&filter)).await.unwrap(), 3);
    assert_eq!(products.count(None).await.unwrap(), 4);
}

#[tokio::test]
async fn declarative_sort_documents_drive_multi_key_ordering() {
    let db = Database::new(MemoryStore::new());
    let people = db.collection("people").await.unwrap();
    for (name, team, age) in [
        ("ana", "red", 31),
        ("bo", "blue", 25),
        ("cy", "red", 25),
        ("dee", "blue", 31),
    ] {
        people
            .insert(doc! { "name": name, "team": team, "age": age })
            .await
            .unwrap();
    }

    let query = Query {
        sort: SortSpec::parse_document(&doc! { "team": 1, "age": -1 }).unwrap(),
        ..Query::new()
    };
    let sorted = people.find(&query).await.unwrap();
    let names: Vec<_> = sorted.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, ["dee", "bo", "ana", "cy"]);
}

#[tokio::test]
async fn documents_missing_the_sort_field_come_last() {
    let db = Database::new(MemoryStore::new());
    let people = db.collection("people").await.unwrap();
    people.insert(doc! { "name": "no-age" }).await.unwrap();
    people
        .insert(doc! { "name": "young", "age": 20 })
        .await
        .unwrap();
    people
        .insert(doc! { "name": "old", "age": 60 })
        .await
        .unwrap();

    let descending = people
        .find(&Query::builder().sort("age", SortDirection::Desc).build())
        .await
        .unwrap();
    let names: Vec<_> = descending
        .iter()
        .map(|d| d.get_str("name").unwrap())
        .collect();
    assert_eq!(names, ["old", "young", "no-age"]);
}

#[tokio::test]
async fn datetime_fields_support_range_queries() {
    let db = Database::new(MemoryStore::new());
    let events = db.collection("events").await.unwrap();

    let at = |y, m, d| {
        Bson::DateTime(bson::DateTime::from_chrono(
            Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        ))
    };
    events
        .insert(doc! { "name": "launch", "at": at(2024, 3, 1) })
        .await
        .unwrap();
    events
        .insert(doc! { "name": "retro", "at": at(2024, 6, 15) })
        .await
        .unwrap();

    let after_spring = events
        .find(
            &Query::builder()
                .filter(Filter::gt("at", at(2024, 4, 1)))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(after_spring.len(), 1);
    assert_eq!(after_spring[0].get_str("name").unwrap(), "retro");
}

#[tokio::test]
async fn find_page_slices_the_sorted_result_set() {
    let db = Database::new(MemoryStore::new());
    let items = db.collection("items").await.unwrap();
    for n in 1..=5 {
        items.insert(doc! { "n": n }).await.unwrap();
    }

    let page = items
        .find_page(
            None,
            &[SortSpec::new("n", SortDirection::Asc)],
            &PaginationParams::new(2, 2),
        )
        .await
        .unwrap();

    let ns: Vec<_> = page.items.iter().map(|d| d.get_i32("n").unwrap()).collect();
    assert_eq!(ns, [3, 4]);
    assert_eq!(page.total, 5);
    assert_eq!(page.next_page, Some(3));
    assert_eq!(page.previous_page, Some(1));
}

#[tokio::test]
async fn nested_paths_and_combinators_work_end_to_end() {
    let db = Database::new(MemoryStore::new());
    let products = db.collection("products").await.unwrap();
    products
        .insert(doc! {
            "name": "Laptop",
            "specs": { "ram": 32, "ssd": true },
            "tags": ["electronics", "sale"],
        })
        .await
        .unwrap();
    products
        .insert(doc! {
            "name": "Desk",
            "specs": { "material": "oak" },
            "tags": ["furniture"],
        })
        .await
        .unwrap();

    let matches = products
        .find(
            &Query::parse(&doc! {
                "$or": [
                    { "specs.ram": { "$gte": 16 } },
                    { "tags": { "$contains": "furniture" } },
                ],
                "name": { "$exists": true },
            })
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);

    let only_laptop = products
        .find(&Query::parse(&doc! { "specs.ssd": true }).unwrap())
        .await
        .unwrap();
    assert_eq!(only_laptop.len(), 1);
    assert_eq!(only_laptop[0].get_str("name").unwrap(), "Laptop");
}
