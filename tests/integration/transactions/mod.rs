//! Transaction runner tests: commit, rollback, nesting in an ambient transaction
//! and service writes joining a caller's transaction

use serial_test::serial;
use volha_catalog::{new_id, Brand, CatalogRepositories, Dictionary, DictionaryKind};
use volha_common::{DbScope, Error, ErrorKind, OpContext};

use crate::common::{CatalogFixture, TestApp};

fn brand(title: &str) -> Dictionary {
    Dictionary::Brand(Brand {
        id: new_id(),
        title: title.to_string(),
    })
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_success_commits() {
    let app = TestApp::new().await.unwrap();
    let entity = brand("Committed");
    let id = entity.id().to_string();

    app.service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                CatalogRepositories::new(DbScope::tx(tx))
                    .dictionaries()
                    .create(DictionaryKind::Brand, &entity)
                    .await
            })
        })
        .await
        .unwrap();

    assert!(app.exists("brands", &id).await.unwrap());
    app.service.delete_dictionary("brand", &id).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_error_rolls_back_every_write() {
    let app = TestApp::new().await.unwrap();
    let (first, second) = (brand("First"), brand("Second"));
    let (first_id, second_id) = (first.id().to_string(), second.id().to_string());

    let err = app
        .service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                let mut repositories = CatalogRepositories::new(DbScope::tx(tx));
                repositories
                    .dictionaries()
                    .create(DictionaryKind::Brand, &first)
                    .await?;
                repositories
                    .dictionaries()
                    .create(DictionaryKind::Brand, &second)
                    .await?;
                // Same id again
                repositories
                    .dictionaries()
                    .create(DictionaryKind::Brand, &first)
                    .await
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(!app.exists("brands", &first_id).await.unwrap());
    assert!(!app.exists("brands", &second_id).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_nested_run_does_not_commit_on_its_own() {
    let app = TestApp::new().await.unwrap();
    let runner = app.service.runner().clone();
    let pool = app.pool.clone();
    let entity = brand("Nested");
    let id = entity.id().to_string();

    let err = app
        .service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                let mut scope = DbScope::tx(tx);
                let id = entity.id().to_string();
                runner
                    .run_in_scope(&mut scope, move |tx| {
                        Box::pin(async move {
                            CatalogRepositories::new(DbScope::tx(tx))
                                .dictionaries()
                                .create(DictionaryKind::Brand, &entity)
                                .await
                        })
                    })
                    .await?;

                // Visible inside the ambient transaction only
                let mut repositories = CatalogRepositories::new(scope);
                repositories
                    .dictionaries()
                    .get(DictionaryKind::Brand, &id)
                    .await?;
                let outside: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM brands WHERE id = $1)")
                        .bind(&id)
                        .fetch_one(&pool)
                        .await
                        .op("test.exists_outside")?;
                assert!(!outside, "nested run committed early");

                Err::<(), _>(Error::failed_precondition("test.outer", "abort after nested write"))
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert_eq!(err.op(), "test.outer");
    assert!(!app.exists("brands", &id).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_ambient_repositories_read_their_own_writes() {
    let app = TestApp::new().await.unwrap();
    let mut fixture = CatalogFixture::seed(&app).await.unwrap();
    let draft = fixture.draft("Sideboard", 85_000);
    fixture.track_product(&draft.id);
    let expected = draft.clone();

    let product = app
        .service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                let mut repositories = CatalogRepositories::new(DbScope::tx(tx));
                repositories.products().create(&draft).await?;
                repositories.products().increment_views(&draft.id).await?;
                repositories.products().get(&draft.id).await
            })
        })
        .await
        .unwrap();

    assert_eq!(product.id, expected.id);
    assert_eq!(product.article, expected.article);
    assert_eq!(product.views, 1);
    assert!(app.exists("products", &expected.id).await.unwrap());

    fixture.cleanup(&app).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_service_writes_roll_back_with_the_outer_transaction() {
    let app = TestApp::new().await.unwrap();
    let fixture = CatalogFixture::seed(&app).await.unwrap();
    let service = app.service.clone();
    let entity = brand("Joined");
    let brand_id = entity.id().to_string();
    let draft = fixture.draft("Console", 45_000);
    let product_id = draft.id.clone();
    let lookup_id = product_id.clone();

    let err = app
        .service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                let mut scope = DbScope::tx(tx);
                service
                    .create_dictionary_in(&mut scope, "brand", entity)
                    .await?;
                service.create_product_in(&mut scope, draft).await?;
                let product = service.get_product_in(&mut scope, &lookup_id).await?;
                assert_eq!(product.views, 1);
                Err::<(), _>(Error::failed_precondition(
                    "test.outer",
                    "abort after service writes",
                ))
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert_eq!(err.op(), "test.outer");
    assert!(!app.exists("brands", &brand_id).await.unwrap());
    assert!(!app.exists("products", &product_id).await.unwrap());

    fixture.cleanup(&app).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_service_writes_commit_with_the_outer_transaction() {
    let app = TestApp::new().await.unwrap();
    let service = app.service.clone();
    let (first, second) = (brand("Outer first"), brand("Outer second"));
    let (first_id, second_id) = (first.id().to_string(), second.id().to_string());

    app.service
        .runner()
        .run_in_tx(move |tx| {
            Box::pin(async move {
                let mut scope = DbScope::tx(tx);
                service.create_dictionary_in(&mut scope, "brand", first).await?;
                service.create_dictionary_in(&mut scope, "brand", second).await
            })
        })
        .await
        .unwrap();

    assert!(app.exists("brands", &first_id).await.unwrap());
    assert!(app.exists("brands", &second_id).await.unwrap());
    app.service.delete_dictionary("brand", &first_id).await.unwrap();
    app.service.delete_dictionary("brand", &second_id).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_failed_rollback_keeps_both_errors() {
    let app = TestApp::new().await.unwrap();

    // Killing our own backend fails the statement and leaves nothing to roll back on
    let err = app
        .service
        .runner()
        .run_in_tx(|tx| {
            Box::pin(async move {
                sqlx::query("SELECT pg_terminate_backend(pg_backend_pid())")
                    .execute(&mut **tx)
                    .await
                    .op("test.terminate")?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.op(), "tx.run_in_tx");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("rollback failed"));
    match &err {
        Error::RollbackFailed { source, .. } => assert_eq!(source.op(), "test.terminate"),
        other => panic!("expected a failed rollback, got {other:?}"),
    }
    let cause = std::error::Error::source(&err).expect("original error in the chain");
    assert!(cause.to_string().starts_with("test.terminate"));
}
