mod common;

use cart_service::models::{Invoice, LineSelector, PaymentStatus};
use cart_service::services::{
    CartOutcome, DeletionReason, InvoiceDraft, InvoiceRepository, LineDraft, NewLine,
    UpsertCandidate,
};
use cart_service::CartError;
use common::{TestStore, CAP, MUG, OTHER_USER_ID, SOCK, TEE, TEST_USER_ID};
use rust_decimal::Decimal;

fn new_line(product_id: &str) -> UpsertCandidate {
    UpsertCandidate::NewLine(NewLine {
        product_id: product_id.to_string(),
        ..Default::default()
    })
}

fn draft(lines: &[(&str, u32)]) -> InvoiceDraft {
    InvoiceDraft {
        cart: lines
            .iter()
            .map(|(product_id, quantity)| LineDraft {
                product_id: product_id.to_string(),
                quantity: *quantity,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn quantity(invoice: &Invoice, product_id: &str) -> Option<u32> {
    invoice.line(product_id).map(|line| line.quantity)
}

async fn add(t: &TestStore, product_id: &str) -> Invoice {
    t.store
        .upsert_line(TEST_USER_ID, new_line(product_id))
        .await
        .expect("add to cart")
}

#[tokio::test]
async fn cart_lifecycle_scenarios() {
    let t = TestStore::new();

    // 1. First add opens an invoice with one line at quantity 1
    let invoice = add(&t, TEE).await;
    assert_eq!(invoice.cart.len(), 1);
    assert_eq!(quantity(&invoice, TEE), Some(1));
    assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
    let invoice_id = invoice.id.clone();

    // 2. Three increments
    for _ in 0..3 {
        t.store.increment_line(&invoice_id, TEE).await.unwrap();
    }
    let listed = t.store.list_for_user(TEST_USER_ID).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].cart.len(), 1);
    assert_eq!(quantity(&listed[0], TEE), Some(4));

    // 3. A second product lands in the same invoice
    let invoice = add(&t, MUG).await;
    assert_eq!(invoice.id, invoice_id);
    assert_eq!(invoice.cart.len(), 2);
    assert_eq!(quantity(&invoice, TEE), Some(4));
    assert_eq!(quantity(&invoice, MUG), Some(1));

    // 4. Decrementing a quantity-1 line removes it
    let outcome = t.store.decrement_line(&invoice_id, MUG).await.unwrap();
    let invoice = outcome.invoice().cloned().expect("invoice survives");
    assert_eq!(invoice.cart.len(), 1);
    assert_eq!(quantity(&invoice, TEE), Some(4));

    // 5. Decrementing the last line to nothing deletes the invoice
    for _ in 0..3 {
        let outcome = t.store.decrement_line(&invoice_id, TEE).await.unwrap();
        assert!(!outcome.is_deleted());
    }
    let outcome = t.store.decrement_line(&invoice_id, TEE).await.unwrap();
    match outcome {
        CartOutcome::Deleted(deleted) => {
            assert_eq!(deleted.invoice_id, invoice_id);
            assert_eq!(deleted.reason, DeletionReason::LastLineRemoved);
        }
        other => panic!("expected deletion, got {:?}", other),
    }
    assert!(t.store.list_for_user(TEST_USER_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn increment_at_ceiling_is_refused_without_a_write() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;
    for _ in 0..4 {
        t.store.increment_line(&invoice.id, TEE).await.unwrap();
    }
    let before = t.repository.get(&invoice.id).await.unwrap().unwrap();
    assert_eq!(quantity(&before, TEE), Some(5));

    let err = t.store.increment_line(&invoice.id, TEE).await.unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    let after = t.repository.get(&invoice.id).await.unwrap().unwrap();
    assert_eq!(quantity(&after, TEE), Some(5));
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn repeated_adds_never_duplicate_a_line() {
    let t = TestStore::new();
    add(&t, SOCK).await;
    let invoice = add(&t, SOCK).await;
    assert_eq!(invoice.cart.len(), 1);
    assert_eq!(quantity(&invoice, SOCK), Some(2));

    // Ceiling of 2 reached, the merge is refused
    let err = t
        .store
        .upsert_line(TEST_USER_ID, new_line(SOCK))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    let listed = t.store.list_for_user(TEST_USER_ID).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0]
            .cart
            .iter()
            .filter(|line| line.product_id == SOCK)
            .count(),
        1
    );
}

#[tokio::test]
async fn new_line_snapshots_catalog_appearance_and_starts_at_one() {
    let t = TestStore::new();
    let invoice = t
        .store
        .upsert_line(
            TEST_USER_ID,
            UpsertCandidate::NewLine(NewLine {
                product_id: TEE.to_string(),
                quantity: Some(4),
                size: Some("XL".to_string()),
                color: None,
            }),
        )
        .await
        .unwrap();

    let line = invoice.line(TEE).unwrap();
    assert_eq!(line.quantity, 1);
    assert_eq!(line.size, "XL");
    assert_eq!(line.color, "black");
}

#[tokio::test]
async fn unknown_and_out_of_stock_products_are_rejected() {
    let t = TestStore::new();

    let err = t
        .store
        .upsert_line(TEST_USER_ID, new_line("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));

    let err = t
        .store
        .upsert_line(TEST_USER_ID, new_line(CAP))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    assert!(t.repository.is_empty());
}

#[tokio::test]
async fn removing_the_only_line_deletes_the_invoice() {
    let t = TestStore::new();
    let invoice = add(&t, MUG).await;

    let outcome = t
        .store
        .remove_line(&invoice.id, LineSelector::Product(MUG.to_string()))
        .await
        .unwrap();
    assert!(outcome.is_deleted());
    assert!(t.store.list_for_user(TEST_USER_ID).await.unwrap().is_empty());

    let err = t
        .store
        .remove_line(&invoice.id, LineSelector::Product(MUG.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
}

#[tokio::test]
async fn only_line_must_match_the_selector() {
    let t = TestStore::new();
    let invoice = add(&t, MUG).await;

    let err = t
        .store
        .remove_line(&invoice.id, LineSelector::Product(TEE.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));
    assert_eq!(t.repository.len(), 1);
}

#[tokio::test]
async fn remove_line_by_line_id_keeps_the_rest() {
    let t = TestStore::new();
    add(&t, TEE).await;
    let invoice = add(&t, MUG).await;
    let mug_line_id = invoice.line(MUG).unwrap().id.clone();

    let outcome = t
        .store
        .remove_line(&invoice.id, LineSelector::Line(mug_line_id.clone()))
        .await
        .unwrap();
    let updated = outcome.invoice().cloned().expect("invoice survives");
    assert_eq!(updated.cart.len(), 1);
    assert!(updated.contains_product(TEE));

    let err = t
        .store
        .remove_line(&invoice.id, LineSelector::Line(mug_line_id))
        .await
        .unwrap_err();
    // One line left and it is not the one asked for
    assert!(matches!(err, CartError::Validation(_)));
}

#[tokio::test]
async fn delete_invoice_twice_reports_not_found() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;

    let deleted = t.store.delete_invoice(&invoice.id).await.unwrap();
    assert_eq!(deleted.reason, DeletionReason::Requested);

    let err = t.store.delete_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));

    let err = t.store.delete_invoice("never-existed").await.unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
}

#[tokio::test]
async fn total_amount_tracks_the_cart() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;
    assert_eq!(invoice.total_amount, Decimal::new(10000, 2));

    add(&t, MUG).await;
    let invoice = t.store.increment_line(&invoice.id, MUG).await.unwrap();
    // 100.00 + 2 x 12.50
    assert_eq!(invoice.total_amount, Decimal::new(12500, 2));

    let outcome = t
        .store
        .remove_line(&invoice.id, LineSelector::Product(TEE.to_string()))
        .await
        .unwrap();
    assert_eq!(
        outcome.invoice().map(|i| i.total_amount),
        Some(Decimal::new(2500, 2))
    );
}

#[tokio::test]
async fn whole_invoice_body_merges_into_the_open_invoice() {
    let t = TestStore::new();
    let first = add(&t, TEE).await;
    let tee_line_id = first.line(TEE).unwrap().id.clone();

    // Zero-quantity lines are dropped
    let invoice = t
        .store
        .upsert_line(
            TEST_USER_ID,
            UpsertCandidate::Invoice(draft(&[(TEE, 3), (MUG, 2), (SOCK, 0)])),
        )
        .await
        .unwrap();

    assert_eq!(invoice.id, first.id);
    assert_eq!(invoice.cart.len(), 2);
    assert_eq!(quantity(&invoice, TEE), Some(3));
    assert_eq!(quantity(&invoice, MUG), Some(2));
    assert!(!invoice.contains_product(SOCK));
    assert_eq!(invoice.line(TEE).unwrap().id, tee_line_id);
    assert_eq!(t.repository.len(), 1);
}

#[tokio::test]
async fn whole_invoice_body_without_shared_products_keeps_existing_lines() {
    let t = TestStore::new();
    let first = add(&t, TEE).await;

    let mut body = draft(&[(MUG, 1)]);
    body.delivery_address = Some("12 Long Street".to_string());
    let invoice = t
        .store
        .upsert_line(TEST_USER_ID, UpsertCandidate::Invoice(body))
        .await
        .unwrap();

    assert_eq!(invoice.id, first.id);
    assert_eq!(invoice.cart.len(), 2);
    assert_eq!(quantity(&invoice, TEE), Some(1));
    assert_eq!(quantity(&invoice, MUG), Some(1));
    assert_eq!(invoice.line(TEE).unwrap().id, first.line(TEE).unwrap().id);
    assert_eq!(invoice.total_amount, Decimal::new(11250, 2));
    assert!(invoice.delivery_address.is_none());

    let stored = t.repository.get(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.cart.len(), 2);
    assert_eq!(t.repository.len(), 1);
}

#[tokio::test]
async fn whole_invoice_body_is_validated() {
    let t = TestStore::new();

    let err = t
        .store
        .upsert_line(
            TEST_USER_ID,
            UpsertCandidate::Invoice(draft(&[(TEE, 1), (TEE, 2)])),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    let err = t
        .store
        .upsert_line(TEST_USER_ID, UpsertCandidate::Invoice(draft(&[(MUG, 4)])))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    let err = t
        .store
        .upsert_line(TEST_USER_ID, UpsertCandidate::Invoice(draft(&[(MUG, 0)])))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    assert!(t.repository.is_empty());
}

#[tokio::test]
async fn whole_invoice_body_cannot_target_another_users_invoice() {
    let t = TestStore::new();
    let theirs = t
        .store
        .upsert_line(OTHER_USER_ID, new_line(TEE))
        .await
        .unwrap();

    let mut body = draft(&[(TEE, 2)]);
    body.id = Some(theirs.id.clone());
    let err = t
        .store
        .upsert_line(TEST_USER_ID, UpsertCandidate::Invoice(body))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
}

#[tokio::test]
async fn stale_version_conflicts_and_leaves_the_invoice_alone() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;
    let read_version = invoice.version;

    // Another writer gets in first
    t.store.increment_line(&invoice.id, TEE).await.unwrap();

    let mut body = draft(&[(TEE, 5)]);
    body.version = Some(read_version);
    let err = t
        .store
        .update_invoice(&invoice.id, body)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));

    let stored = t.repository.get(&invoice.id).await.unwrap().unwrap();
    assert_eq!(quantity(&stored, TEE), Some(2));
}

#[tokio::test]
async fn concurrent_first_adds_leave_one_open_invoice() {
    let t = TestStore::new();

    let (a, b) = tokio::join!(
        t.store.upsert_line(TEST_USER_ID, new_line(TEE)),
        t.store.upsert_line(TEST_USER_ID, new_line(MUG)),
    );

    let open: Vec<Invoice> = t
        .store
        .list_for_user(TEST_USER_ID)
        .await
        .unwrap()
        .into_iter()
        .filter(Invoice::is_open)
        .collect();
    assert_eq!(open.len(), 1);
    for result in [a, b] {
        match result {
            Ok(invoice) => assert_eq!(invoice.id, open[0].id),
            Err(err) => assert!(matches!(err, CartError::Conflict(_))),
        }
    }
}

#[tokio::test]
async fn update_invoice_changes_fields_and_cart() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;

    let mut body = draft(&[(TEE, 2), (SOCK, 1)]);
    body.delivery_address = Some("12 Long Street".to_string());
    body.payment_status = Some(PaymentStatus::PayOnCollection);
    let updated = t.store.update_invoice(&invoice.id, body).await.unwrap();

    assert_eq!(updated.cart.len(), 2);
    assert_eq!(updated.delivery_address.as_deref(), Some("12 Long Street"));
    assert_eq!(updated.payment_status, PaymentStatus::PayOnCollection);
    assert_eq!(updated.total_amount, Decimal::new(20500, 2));

    // No longer open, so the next add starts a fresh invoice
    let fresh = add(&t, MUG).await;
    assert_ne!(fresh.id, invoice.id);
    assert_eq!(t.store.list_for_user(TEST_USER_ID).await.unwrap().len(), 2);

    let err = t
        .store
        .update_invoice("missing", draft(&[(TEE, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
}

#[tokio::test]
async fn cart_writes_to_a_paid_invoice_conflict() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;

    let mut body = draft(&[(TEE, 2)]);
    body.payment_status = Some(PaymentStatus::Paid);
    let paid = t.store.update_invoice(&invoice.id, body).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let mut body = draft(&[(TEE, 5)]);
    body.id = Some(paid.id.clone());
    let err = t
        .store
        .upsert_line(TEST_USER_ID, UpsertCandidate::Invoice(body))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));

    let err = t.store.increment_line(&paid.id, TEE).await.unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));
    let err = t.store.decrement_line(&paid.id, TEE).await.unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));
    let err = t
        .store
        .remove_line(&paid.id, LineSelector::Product(TEE.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));

    let stored = t.repository.get(&paid.id).await.unwrap().unwrap();
    assert_eq!(quantity(&stored, TEE), Some(2));
    assert_eq!(stored.version, paid.version);
}

#[tokio::test]
async fn deposits_are_appended_and_must_be_positive() {
    let t = TestStore::new();
    let invoice = add(&t, TEE).await;

    let updated = t
        .store
        .record_deposit(&invoice.id, Decimal::new(5000, 2))
        .await
        .unwrap();
    assert_eq!(updated.deposit.len(), 1);
    assert_eq!(updated.deposit[0].deposit_amount, Decimal::new(5000, 2));
    assert!(updated.version > invoice.version);

    let err = t
        .store
        .record_deposit(&invoice.id, Decimal::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));

    let err = t
        .store
        .record_deposit("missing", Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
}

#[tokio::test]
async fn cart_summary_totals_open_lines() {
    let t = TestStore::new();
    let invoice = add(&t, MUG).await;
    t.store.increment_line(&invoice.id, MUG).await.unwrap();
    add(&t, SOCK).await;

    let summary = t.store.cart_summary(TEST_USER_ID).await.unwrap();
    assert_eq!(summary.item_count, 3);
    // 2 x 12.50 + 5.00
    assert_eq!(summary.subtotal, Decimal::new(3000, 2));
    assert_eq!(summary.tax, Decimal::new(450, 2));
    assert_eq!(summary.total, Decimal::new(3450, 2));

    let empty = t.store.cart_summary(OTHER_USER_ID).await.unwrap();
    assert_eq!(empty.item_count, 0);
    assert_eq!(empty.total, Decimal::ZERO);
}

#[tokio::test]
async fn products_dropped_from_the_catalog_price_at_zero() {
    let t = TestStore::new();
    add(&t, TEE).await;
    add(&t, MUG).await;

    t.catalog.remove(TEE);

    let summary = t.store.cart_summary(TEST_USER_ID).await.unwrap();
    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.subtotal, Decimal::new(1250, 2));
}
