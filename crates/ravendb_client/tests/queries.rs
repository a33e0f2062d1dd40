//! Query builder tests against the in-memory server.

use ravendb_client::{DocumentStore, RavenError};
use ravendb_testdriver::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(default)]
    id: String,
    name: String,
    age: u32,
}

async fn seeded() -> (Arc<InMemoryServer>, DocumentStore) {
    let (server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();
    for (i, (name, age)) in [("Ann", 30), ("Bob", 20), ("Cid", 40), ("Anna", 25)]
        .into_iter()
        .enumerate()
    {
        let user = User {
            id: String::new(),
            name: name.to_string(),
            age,
        };
        session
            .store_with_id(&user, &format!("users/{}", i + 1))
            .unwrap();
    }
    session
        .store_with_id(&serde_json::json!({"name": "Ann"}), "notes/1")
        .unwrap();
    session.save_changes().await.unwrap();
    (server, store)
}

fn names(users: &[User]) -> Vec<&str> {
    users.iter().map(|u| u.name.as_str()).collect()
}

#[tokio::test]
async fn builds_rql_with_parameters() {
    let (_server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();

    let mut query = session
        .query::<User>()
        .where_equals("name", "Ann")
        .or_else()
        .where_greater_than("age", 30)
        .order_by_descending("age");

    assert_eq!(
        query.to_rql(),
        "from 'Users' where name = $p0 or age > $p1 order by age desc"
    );
    let index_query = query.to_index_query().unwrap();
    assert_eq!(index_query.query_parameters["p0"], "Ann");
    assert_eq!(index_query.query_parameters["p1"], 30);
}

#[tokio::test]
async fn where_equals_queries_the_collection() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session
        .query::<User>()
        .where_equals("name", "Ann")
        .all()
        .await
        .unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "users/1");
}

#[tokio::test]
async fn comparisons_combine_with_and_or() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session
        .query::<User>()
        .where_greater_than_or_equal("age", 25)
        .and_also()
        .where_less_than("age", 40)
        .order_by("age")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Anna", "Ann"]);

    let users = session
        .query::<User>()
        .where_less_than_or_equal("age", 20)
        .or_else()
        .where_equals("name", "Cid")
        .order_by("name")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Bob", "Cid"]);

    let users = session
        .query::<User>()
        .where_not_equals("name", "Ann")
        .order_by("name")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Anna", "Bob", "Cid"]);
}

#[tokio::test]
async fn where_in_and_starts_with() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session
        .query::<User>()
        .where_in("name", ["Bob", "Cid", "Zed"])
        .order_by("name")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Bob", "Cid"]);

    let users = session
        .query::<User>()
        .where_starts_with("name", "an")
        .order_by("name")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Ann", "Anna"]);
}

#[tokio::test]
async fn paging_count_and_first() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session
        .query::<User>()
        .order_by_descending("age")
        .skip(1)
        .take(2)
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Ann", "Anna"]);

    let count = session
        .query::<User>()
        .where_greater_than("age", 20)
        .count()
        .await
        .unwrap();
    assert_eq!(count, 3);

    let youngest = session
        .query::<User>()
        .order_by("age")
        .first()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(youngest.name, "Bob");

    let nobody = session
        .query::<User>()
        .where_equals("name", "Nobody")
        .first()
        .await
        .unwrap();
    assert!(nobody.is_none());
}

#[tokio::test]
async fn query_results_are_tracked() {
    let (server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session.query::<User>().all().await.unwrap();
    assert_eq!(users.len(), 4);
    assert!(session.is_loaded("users/3"));

    server.clear_requests();
    let user: User = session.load("users/3").await.unwrap().unwrap();
    assert_eq!(user.name, "Cid");
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn session_changes_win_over_query_results() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let mut ann: User = session.load("users/1").await.unwrap().unwrap();
    ann.age = 99;
    session.store(&ann).await.unwrap();

    let users = session
        .query::<User>()
        .where_equals("name", "Ann")
        .all()
        .await
        .unwrap();
    assert_eq!(users[0].age, 99);
}

#[tokio::test]
async fn raw_and_collection_queries() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();

    let users = session
        .raw_query::<User>("from Users order by age desc")
        .all()
        .await
        .unwrap();
    assert_eq!(names(&users), ["Cid", "Ann", "Anna", "Bob"]);

    let everything = session
        .query_collection::<serde_json::Value>("@all_docs")
        .where_equals("name", "Ann")
        .all()
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);

    let err = session
        .raw_query::<User>("from Users")
        .where_equals("name", "Ann")
        .all()
        .await
        .unwrap_err();
    assert!(matches!(err, RavenError::InvalidOperation(_)));
}

/// A parameter value that cannot be written as JSON.
struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("not representable"))
    }
}

#[tokio::test]
async fn parameter_serialization_errors_keep_their_kind() {
    let (server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();

    let err = session
        .query::<User>()
        .where_equals("name", Unserializable)
        .all()
        .await
        .unwrap_err();
    assert!(matches!(err, RavenError::Serialization(_)));
    assert!(err.to_string().contains("not representable"));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn wait_for_non_stale_results_is_sent() {
    let (_server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();

    let query = session
        .query::<User>()
        .wait_for_non_stale_results()
        .to_index_query()
        .unwrap();
    assert!(query.wait_for_non_stale_results);
    assert_eq!(query.wait_for_non_stale_results_timeout.as_deref(), Some("00:00:15"));
}

#[tokio::test]
async fn queries_count_as_requests() {
    let (_server, store) = seeded().await;
    let mut session = store.open_session().unwrap();
    session.query::<User>().all().await.unwrap();
    session.query::<User>().count().await.unwrap();
    assert_eq!(session.number_of_requests(), 2);
}

#[tokio::test]
async fn unknown_index_is_reported() {
    let (_server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();
    let err = session
        .query_index::<User>("Users/Missing")
        .all()
        .await
        .unwrap_err();
    assert!(matches!(err, RavenError::IndexDoesNotExist(_)));
}
