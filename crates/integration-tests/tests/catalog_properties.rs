//! Properties of the catalog consistency protocol, driven through chat
//! commands.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use shelf_bot::commands::replies;
use shelf_integration_tests::TestContext;

// =============================================================================
// Soft delete
// =============================================================================

#[tokio::test]
async fn test_restore_after_delete_returns_identical_row() {
    let ctx = TestContext::standard().await;

    for id in [10, 11, 12] {
        let before = ctx.product_record(id).await;

        let reply = ctx.send(&format!("/delete {id}")).await;
        assert_eq!(reply.as_text(), format!("Product ID {id} deleted."));
        assert!(!ctx.is_live(id).await);

        let reply = ctx.send(&format!("/restore {id}")).await;
        assert_eq!(reply.as_text(), format!("Product ID {id} restored."));
        assert_eq!(ctx.product_record(id).await, before);
    }

    let reply = ctx.send("/vdeleted").await;
    assert_eq!(reply.as_text(), replies::NO_DELETED_PRODUCTS);
}

#[tokio::test]
async fn test_delete_leaves_counter_unchanged() {
    let ctx = TestContext::standard().await;

    ctx.send("/delete 10").await;
    assert_eq!(ctx.category("4").await.product_count, 3);

    ctx.send("/restore 10").await;
    assert_eq!(ctx.category("4").await.product_count, 3);
}

// =============================================================================
// Swaps
// =============================================================================

#[tokio::test]
async fn test_product_swap_twice_restores_positions() {
    let ctx = TestContext::standard().await;

    ctx.send("/cso 10 12").await;
    assert_eq!(ctx.product(10).await.sort_position, 1);
    assert_eq!(ctx.product(12).await.sort_position, 1);

    ctx.send("/cso 10 11").await;
    ctx.send("/cso 10 11").await;
    assert_eq!(ctx.product(10).await.sort_position, 1);
    assert_eq!(ctx.product(11).await.sort_position, 2);
}

#[tokio::test]
async fn test_category_swap_twice_restores_order() {
    let ctx = TestContext::standard().await;
    let before = ctx.category_orders().await;

    let reply = ctx.send("/cco 1 2").await;
    assert_eq!(reply.as_text(), "Order updated for category ID 1 and 2.");
    assert_eq!(
        ctx.category_orders().await,
        vec![("4".to_string(), Some(2)), ("3".to_string(), Some(1))]
    );

    ctx.send("/cco 1 2").await;
    assert_eq!(ctx.category_orders().await, before);
}

// =============================================================================
// Order reset
// =============================================================================

#[tokio::test]
async fn test_order_reset_is_idempotent() {
    let ctx = TestContext::with_rows(
        vec![
            json!({"id": 1, "category": "6", "name": "Dairy", "order": 1, "prcount": 0}),
            json!({"id": 2, "category": "4", "name": "Fruit", "order": 7, "prcount": 0}),
            json!({"id": 3, "category": "z", "name": "Seasonal", "order": 2, "prcount": 0}),
            json!({"id": 4, "category": "3", "name": "Vegetables", "prcount": 0}),
            json!({"id": 5, "category": "2", "name": "Herbs", "order": 3, "prcount": 0}),
        ],
        Vec::new(),
    )
    .await;

    let reply = ctx.send("/resetco").await;
    assert_eq!(
        reply.as_text(),
        format!("{}\nNo baseline rank for: z (left unchanged)", replies::ORDER_RESET)
    );
    let once = ctx.category_orders().await;
    assert_eq!(
        once,
        vec![
            ("6".to_string(), Some(4)),
            ("4".to_string(), Some(1)),
            ("z".to_string(), Some(2)),
            ("3".to_string(), Some(2)),
            ("2".to_string(), Some(3)),
        ]
    );

    let writes = ctx.store.write_count().await;
    ctx.send("/resetco").await;
    assert_eq!(ctx.category_orders().await, once);
    assert_eq!(ctx.store.write_count().await, writes);
}

// =============================================================================
// Counters
// =============================================================================

#[tokio::test]
async fn test_add_product_increments_counter_by_one() {
    let ctx = TestContext::standard().await;

    for expected in 4..=6 {
        let reply = ctx
            .send_photo("/add 4 15 Guava", "https://files.example/guava.jpg")
            .await;
        assert_eq!(reply.as_text(), replies::PRODUCT_ADDED);
        assert_eq!(ctx.category("4").await.product_count, expected);
    }
    assert_eq!(ctx.category("3").await.product_count, 1);
    assert_eq!(ctx.media.upload_count(), 3);
}

#[tokio::test]
async fn test_change_category_moves_counters() {
    let ctx = TestContext::standard().await;

    let reply = ctx.send("/cpc 10 3").await;
    assert_eq!(
        reply.as_text(),
        "Category updated for product ID 10. New category: Vegetables"
    );

    let product = ctx.product(10).await;
    assert_eq!(product.category.as_str(), "3");
    assert_eq!(ctx.category("4").await.product_count, 2);
    assert_eq!(ctx.category("3").await.product_count, 2);
}

#[tokio::test]
async fn test_recount_repairs_counters() {
    let ctx = TestContext::standard().await;

    let reply = ctx.send("/recount").await;
    assert_eq!(reply.as_text(), "Category counters corrected:\n4: 3 -> 2");
    assert_eq!(ctx.category("4").await.product_count, 2);

    let reply = ctx.send("/recount").await;
    assert_eq!(reply.as_text(), replies::COUNTERS_UP_TO_DATE);
}
