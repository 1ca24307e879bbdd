mod common;

use bson::doc;
use common::{URI, names, seeded};
use multivarka::typed::Chain;

#[tokio::test]
async fn typed_chain_runs_the_same_pipeline() {
    let driver = seeded();
    let docs = Chain::new(driver.clone())
        .server(URI)
        .collection("users")
        .where_("age")
        .not()
        .less_than(30)
        .where_("active")
        .equal(true)
        .find()
        .await
        .unwrap();
    assert_eq!(names(&docs), vec!["cid"]);
    assert_eq!(driver.stats().open(), 0);
}

#[tokio::test]
async fn typed_update_and_insert() {
    let driver = seeded();
    let report = Chain::new(driver.clone())
        .server(URI)
        .collection("users")
        .where_("role")
        .include(["admin", "owner"])
        .set("active", false)
        .set("tier", "gold")
        .update()
        .await
        .unwrap();
    assert_eq!(report.matched, 2);

    Chain::new(driver.clone()).server(URI).collection("users").insert(doc! { "name": "eve" }).await.unwrap();
    let removed = Chain::new(driver.clone())
        .server(URI)
        .collection("users")
        .where_("active")
        .equal(false)
        .remove()
        .await
        .unwrap();
    assert_eq!(removed.deleted, 2);
    assert_eq!(names(&driver.dump("app", "users")), vec!["cid", "dan", "eve"]);
}

#[test]
fn into_builder_keeps_steps() {
    let chain = Chain::new(seeded()).server(URI).collection("users").where_("age").greater_than(1);
    assert_eq!(chain.into_builder().steps().len(), 4);
}
