//! End-to-end checkout flows over the in-memory collaborators.

use backend::{
    DistanceShippingQuoter, InMemoryCartApi, InMemoryOrderApi, InMemoryPaymentApi, PaymentOp,
    ReceiptFile,
};
use cart::{CartConfig, CartStore};
use checkout::{
    CheckoutConfig, CheckoutError, CheckoutEvent, CheckoutOrchestrator, CheckoutPhase,
    PaymentError, PaymentProgress, PaymentStart, StcOutcome,
};
use common::{Money, UserId};
use domain::{AddressField, FieldError, PaymentMethod, Product, ShippingAddress};
use storage::{InMemoryStateStore, StateStoreExt, keys};

type Cart = CartStore<InMemoryStateStore, InMemoryCartApi>;
type Checkout = CheckoutOrchestrator<
    Cart,
    InMemoryOrderApi,
    DistanceShippingQuoter,
    InMemoryPaymentApi,
    InMemoryStateStore,
>;

struct Harness {
    cart: Cart,
    orders: InMemoryOrderApi,
    shipping: DistanceShippingQuoter,
    payments: InMemoryPaymentApi,
    storage: InMemoryStateStore,
    checkout: Checkout,
}

async fn harness_with(config: CheckoutConfig, storage: InMemoryStateStore) -> Harness {
    let cart = CartStore::open(
        InMemoryStateStore::new(),
        InMemoryCartApi::new(),
        CartConfig::default(),
    )
    .await
    .unwrap();
    cart.sign_in(UserId::new("u1"), None).await.unwrap();
    cart.add_to_cart(
        &Product::new("prod_0000000001", "Lamp", Money::from_major(50)),
        2,
    )
    .await
    .unwrap();

    let orders = InMemoryOrderApi::new();
    let shipping = DistanceShippingQuoter::new();
    let payments = InMemoryPaymentApi::new();
    let checkout = CheckoutOrchestrator::open(
        config,
        cart.clone(),
        orders.clone(),
        shipping.clone(),
        payments.clone(),
        storage.clone(),
    )
    .await
    .unwrap();

    Harness {
        cart,
        orders,
        shipping,
        payments,
        storage,
        checkout,
    }
}

async fn harness() -> Harness {
    harness_with(CheckoutConfig::all_methods(), InMemoryStateStore::new()).await
}

async fn fill_address(checkout: &Checkout) {
    for (field, value) in [
        (AddressField::Name, "Sara Ali"),
        (AddressField::Email, "sara@example.com"),
        (AddressField::City, "Riyadh"),
        (AddressField::Line1, "King Fahd Rd 12"),
        (AddressField::Phone, "0500000000"),
    ] {
        checkout.update_address_field(field, value).await.unwrap();
    }
}

/// Address filled in and submitted, order saved, payment step open.
async fn at_real_payment() -> Harness {
    let h = harness().await;
    fill_address(&h.checkout).await;
    h.checkout.submit_address().await.unwrap();
    h.checkout.advance_to_review().await.unwrap();
    h.checkout.open_real_payment().await.unwrap();
    assert_eq!(h.checkout.phase().await, CheckoutPhase::RealPayment);
    h
}

fn png() -> ReceiptFile {
    ReceiptFile::new("receipt.png", "image/png", vec![0x89, b'P', b'N', b'G'])
}

mod address {
    use super::*;

    #[tokio::test]
    async fn submit_with_missing_fields_focuses_first_invalid() {
        let h = harness().await;
        h.checkout
            .update_address_field(AddressField::Email, "not-an-email")
            .await
            .unwrap();

        let err = h.checkout.submit_address().await.unwrap_err();
        let CheckoutError::InvalidAddress(errors) = err else {
            panic!("expected an address error, got {err:?}");
        };
        assert_eq!(errors.first_invalid(), Some(AddressField::Name));

        let draft = h.checkout.draft().await;
        assert_eq!(draft.focus, Some(AddressField::Name));
        assert_eq!(
            draft.field_error(AddressField::Email),
            Some(FieldError::InvalidEmail)
        );
        assert_eq!(
            draft.field_error(AddressField::Phone),
            Some(FieldError::Required)
        );
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Address);
    }

    #[tokio::test]
    async fn city_change_quotes_shipping_and_persists_address() {
        let h = harness().await;
        fill_address(&h.checkout).await;

        let draft = h.checkout.draft().await;
        assert_eq!(draft.shipping.cost, Money::from_major(15));
        assert!(draft.shipping.is_quoted());

        let saved: Option<ShippingAddress> =
            h.storage.load_state(keys::CHECKOUT_ADDRESS).await.unwrap();
        assert_eq!(saved.unwrap().city, "Riyadh");

        // Re-entering the same city does not ask again.
        let calls = h.shipping.calls();
        h.checkout
            .update_address_field(AddressField::City, "Riyadh")
            .await
            .unwrap();
        assert_eq!(h.shipping.calls(), calls);

        h.checkout
            .update_address_field(AddressField::City, "Jeddah")
            .await
            .unwrap();
        assert_eq!(h.shipping.calls(), calls + 1);
        assert!(h.checkout.draft().await.shipping.cost > Money::from_major(15));
    }

    #[tokio::test]
    async fn failed_quote_uses_fallback() {
        let h = harness().await;
        h.shipping.set_fail(true);
        fill_address(&h.checkout).await;

        let draft = h.checkout.draft().await;
        assert_eq!(draft.shipping.cost, Money::from_major(25));
        assert!(draft.shipping.fallback);
        assert!(!draft.shipping.is_quoted());
    }

    #[tokio::test]
    async fn saved_address_is_offered_on_the_next_visit() {
        let storage = InMemoryStateStore::new();
        let first = harness_with(CheckoutConfig::all_methods(), storage.clone()).await;
        fill_address(&first.checkout).await;

        let second = harness_with(CheckoutConfig::all_methods(), storage).await;
        assert_eq!(
            second.checkout.saved_address().await.map(|a| a.name),
            Some("Sara Ali".to_string())
        );
        assert!(second.checkout.use_saved_address().await.unwrap());
        assert!(second.checkout.draft().await.address.is_valid());
    }

    #[tokio::test]
    async fn invalid_address_at_payment_returns_to_address() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();
        h.checkout.advance_to_review().await.unwrap();

        // Edits are still allowed from review.
        h.checkout
            .update_address_field(AddressField::Phone, "")
            .await
            .unwrap();
        let err = h.checkout.open_real_payment().await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAddress(_)));
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Address);
        assert_eq!(h.checkout.draft().await.focus, Some(AddressField::Phone));
    }
}

mod totals {
    use super::*;

    #[tokio::test]
    async fn save10_with_quoted_shipping() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        let applied = h.checkout.apply_coupon("save10").await.unwrap().unwrap();
        assert!(applied.recognized);

        let totals = h.checkout.totals().await;
        assert_eq!(totals.subtotal, Money::from_major(100));
        assert_eq!(totals.discount, Money::from_major(10));
        assert_eq!(totals.shipping, Money::from_major(15));
        assert_eq!(totals.tax, Money::from_cents(1350));
        assert_eq!(totals.grand_total, Money::from_cents(11850));

        let last: Option<String> = h.storage.load_state(keys::LAST_COUPON).await.unwrap();
        assert_eq!(last.as_deref(), Some("SAVE10"));
        assert_eq!(h.checkout.last_coupon().await.as_deref(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn unknown_coupon_has_no_effect() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        let mut rx = h.checkout.subscribe();

        let applied = h.checkout.apply_coupon("FOO123").await.unwrap().unwrap();
        assert!(!applied.recognized);
        assert!(!applied.has_effect());

        let totals = h.checkout.totals().await;
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.grand_total, Money::from_major(130));
        assert!(matches!(
            rx.try_recv(),
            Ok(CheckoutEvent::CouponApplied { recognized: false, .. })
        ));
    }

    #[tokio::test]
    async fn freeship_waives_shipping_and_blank_code_clears() {
        let h = harness().await;
        fill_address(&h.checkout).await;

        h.checkout.apply_coupon("FREESHIP").await.unwrap();
        assert_eq!(h.checkout.totals().await.shipping, Money::zero());

        assert!(h.checkout.apply_coupon("  ").await.unwrap().is_none());
        assert_eq!(h.checkout.draft().await.coupon_code, None);
        assert_eq!(h.checkout.totals().await.shipping, Money::from_major(15));
    }

    #[tokio::test]
    async fn removed_coupon_is_not_remembered() {
        let h = harness().await;
        fill_address(&h.checkout).await;

        h.checkout.apply_coupon("save20").await.unwrap();
        assert_eq!(h.checkout.last_coupon().await.as_deref(), Some("SAVE20"));

        h.checkout.apply_coupon("").await.unwrap();
        assert_eq!(h.checkout.last_coupon().await, None);
        let stored: Option<String> = h.storage.load_state(keys::LAST_COUPON).await.unwrap();
        assert_eq!(stored, None);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn repeated_saves_patch_one_order() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();

        let first = h.checkout.advance_to_review().await.unwrap();
        let second = h.checkout.ensure_order(false).await.unwrap();
        let third = h.checkout.open_real_payment().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(h.orders.order_count(), 1);
        assert_eq!(h.orders.create_calls(), 1);
        assert_eq!(h.orders.patch_calls(), 2);

        let stored = h.orders.get(&first).unwrap();
        assert_eq!(stored.payload.user_id, "u1");
        assert_eq!(stored.payload.items.len(), 1);
        assert_eq!(stored.payload.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn rejected_patch_falls_back_to_create() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();
        let first = h.checkout.advance_to_review().await.unwrap();

        h.orders.set_reject_patches(true);
        let second = h.checkout.ensure_order(false).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(h.orders.order_count(), 2);
        assert_eq!(h.checkout.draft().await.remote_order_id, Some(second));
    }

    #[tokio::test]
    async fn force_rebuild_creates_a_new_order() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();
        let first = h.checkout.advance_to_review().await.unwrap();

        let rebuilt = h.checkout.ensure_order(true).await.unwrap();
        assert_ne!(first, rebuilt);
        assert_eq!(h.orders.patch_calls(), 0);
    }

    #[tokio::test]
    async fn create_failure_keeps_phase_and_sets_message() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();
        h.orders.set_fail_on_create(true);

        let err = h.checkout.advance_to_review().await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderFailed(_)));
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Payment);
        assert!(h.checkout.message().await.is_some());

        h.orders.set_fail_on_create(false);
        h.checkout.advance_to_review().await.unwrap();
        assert_eq!(h.checkout.message().await, None);
    }
}

mod phases {
    use super::*;

    #[tokio::test]
    async fn empty_cart_blocks_checkout_until_refilled() {
        let h = harness().await;
        h.cart.clear_cart().await.unwrap();

        assert_eq!(h.checkout.phase().await, CheckoutPhase::EmptyCart);
        let err = h.checkout.submit_address().await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        h.cart
            .add_to_cart(&Product::new("prod_0000000002", "Mug", Money::from_major(20)), 1)
            .await
            .unwrap();
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Address);
    }

    #[tokio::test]
    async fn out_of_order_steps_are_refused() {
        let h = harness().await;
        fill_address(&h.checkout).await;

        let err = h.checkout.advance_to_review().await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidPhase {
                phase: CheckoutPhase::Address,
                ..
            }
        ));
        let err = h.checkout.start_payment(PaymentMethod::Cod).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPhase { .. }));
        assert!(matches!(
            h.checkout.back().await,
            Err(CheckoutError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn back_steps_through_phases() {
        let h = harness().await;
        fill_address(&h.checkout).await;
        h.checkout.submit_address().await.unwrap();
        h.checkout.advance_to_review().await.unwrap();

        assert_eq!(h.checkout.back().await.unwrap(), CheckoutPhase::Payment);
        assert_eq!(h.checkout.back().await.unwrap(), CheckoutPhase::Address);
    }

    #[tokio::test]
    async fn disabled_method_falls_back_to_first_enabled() {
        let h = harness_with(CheckoutConfig::default(), InMemoryStateStore::new()).await;
        let chosen = h
            .checkout
            .select_payment_method(PaymentMethod::Paypal)
            .await
            .unwrap();
        assert_eq!(chosen, PaymentMethod::Cod);
    }
}

mod payments {
    use super::*;

    #[tokio::test]
    async fn cash_on_delivery_completes_and_clears_cart() {
        let h = at_real_payment().await;
        let mut rx = h.checkout.subscribe();

        let start = h.checkout.start_payment(PaymentMethod::Cod).await.unwrap();
        assert_eq!(start, PaymentStart::Completed);
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Complete);
        assert!(h.cart.cart().await.is_empty());

        let calls = h.payments.calls_for(PaymentOp::CodEnable);
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].key.as_str().is_empty());

        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            completed |= matches!(event, CheckoutEvent::Completed { order_id: Some(_) });
        }
        assert!(completed);
    }

    #[tokio::test]
    async fn paypal_returns_approval_url() {
        let h = at_real_payment().await;
        let start = h.checkout.start_payment(PaymentMethod::Paypal).await.unwrap();
        let PaymentStart::Redirect { approval_url } = start else {
            panic!("expected a redirect");
        };
        assert!(approval_url.contains("token="));
        assert_eq!(h.checkout.phase().await, CheckoutPhase::RealPayment);

        h.checkout.finalize().await.unwrap();
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Complete);
    }

    #[tokio::test]
    async fn stc_decline_then_pay() {
        let h = at_real_payment().await;

        let start = h.checkout.start_payment(PaymentMethod::Stc).await.unwrap();
        assert!(matches!(start, PaymentStart::StcSession { .. }));
        let outcome = h.checkout.confirm_stc(false).await.unwrap();
        assert_eq!(
            outcome,
            StcOutcome::Declined {
                status: "cancelled".to_string()
            }
        );
        assert_eq!(h.checkout.draft().await.payment, PaymentProgress::NotStarted);

        h.checkout.start_payment(PaymentMethod::Stc).await.unwrap();
        assert_eq!(h.checkout.confirm_stc(true).await.unwrap(), StcOutcome::Paid);
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Complete);

        let confirmations = h.payments.stc_confirmations();
        assert_eq!(confirmations.len(), 2);
        assert!(!confirmations[0].1);
        assert!(confirmations[1].1);
    }

    #[tokio::test]
    async fn stc_confirm_without_session_is_refused() {
        let h = at_real_payment().await;
        let err = h.checkout.confirm_stc(true).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::NoStcSession)
        ));
    }

    #[tokio::test]
    async fn bank_transfer_accepts_repeated_receipts() {
        let h = at_real_payment().await;

        let start = h.checkout.start_payment(PaymentMethod::Bank).await.unwrap();
        let PaymentStart::BankTransfer(details) = start else {
            panic!("expected bank details");
        };
        assert_eq!(details.iban, InMemoryPaymentApi::BANK_IBAN);

        // Not confirmed until a receipt is uploaded.
        assert!(h.checkout.finalize().await.is_err());
        assert!(matches!(
            h.checkout
                .upload_bank_receipt(ReceiptFile::new("empty.png", "image/png", Vec::new()))
                .await,
            Err(CheckoutError::Payment(PaymentError::EmptyReceipt))
        ));

        h.checkout.upload_bank_receipt(png()).await.unwrap();
        h.checkout.upload_bank_receipt(png()).await.unwrap();
        let order_id = h.checkout.draft().await.remote_order_id.unwrap();
        assert_eq!(h.payments.receipts_for(&order_id).len(), 2);

        h.checkout.finalize().await.unwrap();
        assert_eq!(h.checkout.phase().await, CheckoutPhase::Complete);
    }

    #[tokio::test]
    async fn missing_payloads_are_payment_errors() {
        let h = at_real_payment().await;
        h.payments.set_omit_payloads(true);

        let err = h.checkout.start_payment(PaymentMethod::Paypal).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::MissingApprovalUrl)
        ));
        let err = h.checkout.start_payment(PaymentMethod::Stc).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::MissingSessionId)
        ));
        let err = h.checkout.start_payment(PaymentMethod::Bank).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::MissingBankDetails)
        ));

        assert_eq!(h.checkout.phase().await, CheckoutPhase::RealPayment);
        assert!(h.checkout.message().await.is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_reported_with_method() {
        let h = at_real_payment().await;
        h.payments.set_failing(PaymentOp::CodEnable, true);

        let err = h.checkout.start_payment(PaymentMethod::Cod).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::Provider {
                method: PaymentMethod::Cod,
                ..
            })
        ));
        assert_eq!(h.checkout.phase().await, CheckoutPhase::RealPayment);
        assert!(!h.cart.cart().await.is_empty());
    }

    #[tokio::test]
    async fn every_payment_call_carries_a_fresh_key() {
        let h = at_real_payment().await;
        h.checkout.start_payment(PaymentMethod::Stc).await.unwrap();
        h.checkout.confirm_stc(true).await.unwrap();

        let calls = h.payments.calls();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].key, calls[1].key);
    }
}
