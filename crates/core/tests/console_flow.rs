//! End-to-end console flow over in-memory collaborators: cascade selection,
//! debounced pricing, order commit, quotation lifecycle, and the
//! additional-cost ledger feeding the grand total.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use marketdesk_core::{
    commit_order, grand_total, AdditionalCostDraft, AdditionalCostLedger, AuditContext,
    Category, CategoryId, CostParent, CostResolution, InMemoryAuditSink,
    InMemoryCatalogClient, LifecycleAction, Order, OrderId, PriceDisplay, PriceResolver,
    PricingClient, PricingError, Provider, ProviderId, ProviderQuery, Quotation, QuotationId,
    QuotationItem, QuotationStatus, RemotePrice, SelectionResolver, SelectionSnapshot,
    SendChannel, ServiceAddress, ServiceAddressId, Subcategory, SubcategoryId, TierChoice,
};

struct RateCardPricing;

#[async_trait::async_trait]
impl PricingClient for RateCardPricing {
    async fn compute_price(
        &self,
        snapshot: &SelectionSnapshot,
    ) -> Result<RemotePrice, PricingError> {
        if snapshot.provider_id.0 == "prov-offline" {
            return Err(PricingError("provider pricing unavailable".into()));
        }
        Ok(RemotePrice {
            base_price: Decimal::new(500, 0),
            item_total: None,
            gst_amount: None,
            convenience_charge: Decimal::ZERO,
            rate_card_id: Some(marketdesk_core::RateCardId("rc-cleaning-acme".into())),
        })
    }
}

fn seeded_catalog() -> InMemoryCatalogClient {
    let mut catalog = InMemoryCatalogClient {
        categories: vec![Category { id: CategoryId("cat-home".into()), name: "Home".into() }],
        ..InMemoryCatalogClient::default()
    };
    catalog.subcategories.insert(
        "cat-home".into(),
        vec![Subcategory { id: SubcategoryId("sub-cleaning".into()), name: "Cleaning".into() }],
    );
    catalog.insert_providers(
        &ProviderQuery {
            category_id: CategoryId("cat-home".into()),
            subcategory_id: SubcategoryId("sub-cleaning".into()),
            filter_attribute_id: None,
            filter_option_id: None,
        },
        vec![Provider { id: ProviderId("prov-acme".into()), name: "Acme Services".into() }],
    );
    catalog.service_addresses.insert(
        "prov-acme".into(),
        vec![ServiceAddress {
            id: ServiceAddressId("addr-1".into()),
            label: "Warehouse 12".into(),
        }],
    );
    catalog
}

#[tokio::test]
async fn selection_to_order_commit_happy_path() {
    let mut selection = SelectionResolver::new(seeded_catalog());
    selection.load_options(marketdesk_core::SelectionTier::Category).await.expect("categories");
    selection
        .choose(TierChoice::Category(CategoryId("cat-home".into())))
        .await
        .expect("category");
    selection
        .choose(TierChoice::Subcategory(SubcategoryId("sub-cleaning".into())))
        .await
        .expect("subcategory");
    selection
        .choose(TierChoice::Provider(ProviderId("prov-acme".into())))
        .await
        .expect("provider");
    selection
        .choose(TierChoice::ServiceAddress(ServiceAddressId("addr-1".into())))
        .await
        .expect("address");
    selection.set_quantity(2).expect("quantity");

    let pricing = PriceResolver::new(RateCardPricing, Duration::from_millis(1));
    let display = pricing.recompute(selection.state().view()).await.expect("price");
    let PriceDisplay::Quoted(amounts) = &display else {
        panic!("expected a resolved quote, got {display:?}");
    };
    assert_eq!(amounts.final_amount, Decimal::new(118_000, 2));

    let payload = commit_order("cust-17", selection.state(), &display, Utc::now())
        .expect("order payload");
    let order = Order::place(OrderId("ORD-2026-0001".into()), payload, Utc::now());

    // Additional costs attach to the placed order and gate on its status.
    let mut ledger = AdditionalCostLedger::new(CostParent::Order(order.id.clone()));
    let cost_id = ledger
        .add(
            &order,
            AdditionalCostDraft {
                item_name: "Night-shift surcharge".into(),
                description: None,
                quantity: 2,
                unit_price: Decimal::new(150, 0),
                notes: None,
            },
            "ops-admin",
            Utc::now(),
        )
        .expect("cost added")
        .id()
        .clone();
    ledger.set_status(&cost_id, CostResolution::Approved, Utc::now()).expect("cost approved");
    assert_eq!(ledger.approved_total(), Decimal::new(300, 0));
}

#[tokio::test]
async fn quotation_lifecycle_with_costs_drives_the_grand_total() {
    let now = Utc::now();
    let mut quotation = Quotation::create(
        QuotationId("QT-2026-0001".into()),
        "cust-17",
        vec![
            QuotationItem::new("Deep cleaning", 3, Decimal::new(100, 0)).expect("item"),
            QuotationItem::new("Sofa shampoo", 1, Decimal::new(250, 0)).expect("item"),
        ],
        7,
        now,
    )
    .expect("quotation");
    assert_eq!(quotation.total_amount(), Decimal::new(64_900, 2));

    let mut ledger = AdditionalCostLedger::new(CostParent::Quotation(quotation.id().clone()));
    let cost_id = ledger
        .add(
            &quotation,
            AdditionalCostDraft {
                item_name: "Scaffolding rental".into(),
                description: Some("third-floor windows".into()),
                quantity: 2,
                unit_price: Decimal::new(150, 0),
                notes: None,
            },
            "ops-admin",
            now,
        )
        .expect("cost added")
        .id()
        .clone();

    assert_eq!(grand_total(&quotation, &ledger), Decimal::new(64_900, 2));
    ledger.set_status(&cost_id, CostResolution::Approved, now).expect("cost approved");
    assert_eq!(grand_total(&quotation, &ledger), Decimal::new(94_900, 2));

    let sink = InMemoryAuditSink::default();
    let audit = AuditContext::new("req-11", "ops-admin");
    marketdesk_core::apply_with_audit(
        &mut quotation,
        LifecycleAction::Send(SendChannel::Email),
        &sink,
        &audit,
        now,
    )
    .expect("send");
    marketdesk_core::apply_with_audit(
        &mut quotation,
        LifecycleAction::MarkNegotiating { note: Some("customer pushing back".into()) },
        &sink,
        &audit,
        now,
    )
    .expect("negotiating");
    marketdesk_core::apply_with_audit(
        &mut quotation,
        LifecycleAction::Approve { note: None },
        &sink,
        &audit,
        now,
    )
    .expect("approve");
    assert_eq!(quotation.status(), QuotationStatus::Approved);
    assert_eq!(sink.events().len(), 3);

    // The approved quotation now locks its cost ledger.
    let error = ledger
        .add(
            &quotation,
            AdditionalCostDraft {
                item_name: "Extra crew".into(),
                description: None,
                quantity: 1,
                unit_price: Decimal::new(500, 0),
                notes: None,
            },
            "ops-admin",
            now,
        )
        .expect_err("ledger locked");
    assert!(matches!(error, marketdesk_core::DomainError::ParentLocked { .. }));

    // The grand total is unchanged by the lock.
    assert_eq!(grand_total(&quotation, &ledger), Decimal::new(94_900, 2));
}

#[tokio::test]
async fn pricing_failure_for_a_new_provider_keeps_the_previous_quote_visible() {
    let mut catalog = seeded_catalog();
    catalog.insert_providers(
        &ProviderQuery {
            category_id: CategoryId("cat-home".into()),
            subcategory_id: SubcategoryId("sub-cleaning".into()),
            filter_attribute_id: None,
            filter_option_id: None,
        },
        vec![
            Provider { id: ProviderId("prov-acme".into()), name: "Acme Services".into() },
            Provider { id: ProviderId("prov-offline".into()), name: "Offline Co".into() },
        ],
    );

    let mut selection = SelectionResolver::new(catalog);
    selection
        .choose(TierChoice::Category(CategoryId("cat-home".into())))
        .await
        .expect("category");
    selection
        .choose(TierChoice::Subcategory(SubcategoryId("sub-cleaning".into())))
        .await
        .expect("subcategory");
    selection
        .choose(TierChoice::Provider(ProviderId("prov-acme".into())))
        .await
        .expect("provider");

    let pricing = PriceResolver::new(RateCardPricing, Duration::ZERO);
    let display = pricing.recompute(selection.state().view()).await.expect("price");
    assert!(matches!(display, PriceDisplay::Quoted(_)));

    selection
        .choose(TierChoice::Provider(ProviderId("prov-offline".into())))
        .await
        .expect("provider switch");
    let view = selection.state().view();
    pricing.recompute(view.clone()).await.expect_err("pricing fails for the offline provider");

    // The previous quote is retained and shown as stale, not zeroed out.
    let PriceDisplay::Stale(amounts) = pricing.display(&view) else {
        panic!("expected stale display");
    };
    assert_eq!(amounts.unit_price, Decimal::new(500, 0));
}
