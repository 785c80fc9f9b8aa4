use bson::{Bson, doc};

use sediment::{memory::MemoryStore, prelude::*};

async fn seeded(db: &Database) -> std::sync::Arc<Collection> {
    let products = db.collection("products").await.unwrap();
    products
        .insert_many(vec![
            doc! { "_id": "p-1", "name": "Laptop", "price": 1200, "stock": 4 },
            doc! { "_id": "p-2", "name": "Phone", "price": 800, "stock": 10 },
            doc! { "_id": "p-3", "name": "Headphones", "price": 150, "stock": 0 },
        ])
        .await
        .unwrap();
    products
}

#[tokio::test]
async fn update_rewrites_every_matching_document() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let filter = Filter::gt("price", 500);
    let update = UpdateSpec::parse(&doc! { "$set": { "tier": "premium" } }).unwrap();
    assert_eq!(products.update(Some(&filter), &update).await.unwrap(), 2);

    let premium = Filter::eq("tier", "premium");
    assert_eq!(products.count(Some(&premium)).await.unwrap(), 2);
    let untouched = products.find_by_id("p-3").await.unwrap().unwrap();
    assert!(!untouched.contains_key("tier"));
}

#[tokio::test]
async fn update_one_touches_only_the_first_match() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let filter = Filter::gt("price", 100);
    let update = UpdateSpec::builder().set("seen", true).build();
    let updated = products
        .update_one(Some(&filter), &update)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get_str("_id").unwrap(), "p-1");
    assert_eq!(
        products.count(Some(&Filter::eq("seen", true))).await.unwrap(),
        1
    );

    let no_match = Filter::gt("price", 10_000);
    assert_eq!(
        products.update_one(Some(&no_match), &update).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn update_by_id_applies_operators_in_fixed_order() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    // $set lands before $inc no matter how the keys were ordered.
    let update = UpdateSpec::parse(&doc! {
        "$inc": { "stock": 5 },
        "$set": { "stock": 100 },
    })
    .unwrap();
    let updated = products
        .update_by_id("p-3", &update)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get_i64("stock").unwrap(), 105);
    let persisted = products.find_by_id("p-3").await.unwrap().unwrap();
    assert_eq!(persisted.get_i64("stock").unwrap(), 105);
}

#[tokio::test]
async fn direct_replace_merges_fields() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let update = UpdateSpec::parse(&doc! { "name": "Gaming Laptop" }).unwrap();
    let updated = products
        .update_by_id("p-1", &update)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get_str("name").unwrap(), "Gaming Laptop");
    // Unspecified fields survive the merge.
    assert_eq!(updated.get_i32("price").unwrap(), 1200);
}

#[tokio::test]
async fn pull_then_add_to_set_yields_a_deduplicated_array() {
    let db = Database::new(MemoryStore::new());
    let posts = db.collection("posts").await.unwrap();
    posts
        .insert(doc! { "_id": "post", "tags": ["a", "b"] })
        .await
        .unwrap();

    posts
        .update_by_id(
            "post",
            &UpdateSpec::parse(&doc! { "$pull": { "tags": "a" } }).unwrap(),
        )
        .await
        .unwrap();
    posts
        .update_by_id(
            "post",
            &UpdateSpec::parse(&doc! { "$addToSet": { "tags": "b" } }).unwrap(),
        )
        .await
        .unwrap();

    let tags = posts
        .find_by_id("post")
        .await
        .unwrap()
        .unwrap()
        .get_array("tags")
        .unwrap()
        .clone();
    assert_eq!(tags, vec![Bson::String("b".to_string())]);
}

#[tokio::test]
async fn snapshots_held_by_callers_are_unaffected_by_updates() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let before = products.find_by_id("p-1").await.unwrap().unwrap();
    products
        .update_by_id(
            "p-1",
            &UpdateSpec::builder().set("price", 999).build(),
        )
        .await
        .unwrap();

    assert_eq!(before.get_i32("price").unwrap(), 1200);
}

#[tokio::test]
async fn delete_removes_every_match_and_reports_the_count() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let filter = Filter::lt("price", 1000);
    assert_eq!(products.delete(Some(&filter)).await.unwrap(), 2);
    assert_eq!(products.count(None).await.unwrap(), 1);
    assert_eq!(products.find_by_id("p-2").await.unwrap(), None);
}

#[tokio::test]
async fn delete_one_returns_the_removed_document() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let filter = Filter::gte("price", 150);
    let removed = products
        .delete_one(Some(&filter))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.get_str("_id").unwrap(), "p-1");
    assert_eq!(products.count(None).await.unwrap(), 2);

    let none = Filter::eq("name", "Ghost");
    assert_eq!(products.delete_one(Some(&none)).await.unwrap(), None);
}

#[tokio::test]
async fn delete_by_id_is_a_point_operation() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    let removed = products.delete_by_id("p-2").await.unwrap().unwrap();
    assert_eq!(removed.get_str("name").unwrap(), "Phone");
    assert_eq!(products.delete_by_id("p-2").await.unwrap(), None);
    assert_eq!(products.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn delete_without_filter_empties_the_collection() {
    let db = Database::new(MemoryStore::new());
    let products = seeded(&db).await;

    assert_eq!(products.delete(None).await.unwrap(), 3);
    assert_eq!(products.count(None).await.unwrap(), 0);
    assert!(db.has_collection("products").await.unwrap());
}

#[tokio::test]
async fn malformed_updates_are_rejected_up_front() {
    assert!(matches!(
        UpdateSpec::parse(&doc! { "$set": { "a": 1 }, "plain": 2 }),
        Err(Error::InvalidUpdate(_))
    ));
    assert!(matches!(
        UpdateSpec::parse(&doc! { "$merge": { "a": 1 } }),
        Err(Error::InvalidUpdate(_))
    ));
}
