use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use orderkit_inventory::{FreeItem, FreeItemSet, StockTarget};
use orderkit_offers::{
    AppliedOffer, BuyGet, CartAggregate, Discount, FreeGrant, Offer, OfferId, OfferKind, OracleOutcome,
};
use orderkit_products::{CatalogSnapshot, ProductId, ProductSnapshot, UserTier};
use orderkit_sales::{OrderLine, PassContext, ReconcileMode, reconcile_pass};

/// Every even product triggers one free unit of the next product.
fn fixture(products: u32) -> (Vec<OrderLine>, Vec<Offer>, CatalogSnapshot) {
    let ids: Vec<ProductId> = (0..products).map(|n| ProductId::from_u128(n as u128 + 1)).collect();

    let catalog = ids
        .iter()
        .enumerate()
        .map(|(i, id)| ProductSnapshot::new(*id, format!("product-{i}"), 1_000 + i as u64))
        .collect();

    let lines = ids
        .iter()
        .enumerate()
        .map(|(i, id)| OrderLine::new(i as u32 + 1, *id, 3, 1_000 + i as u64))
        .collect();

    let offers = ids
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| Offer {
            id: OfferId::from_u128(10_000 + i as u128),
            name: format!("bogo-{i}"),
            active: true,
            kind: OfferKind::BuyGet(BuyGet {
                linked_product_id: pair[0],
                buy_quantity: 1,
                get_product_id: pair[1],
                get_discount: Discount::Free,
                per_trigger_qty: 1,
            }),
        })
        .collect();

    (lines, offers, catalog)
}

fn grant_everything(offers: &[Offer], cart: &CartAggregate) -> OracleOutcome {
    let mut applied_offers = Vec::new();
    let mut free_items = Vec::new();
    for offer in offers {
        let Some(bg) = offer.buy_get() else { continue };
        let quantity = bg.granted_qty(cart.quantity(bg.linked_product_id));
        if quantity == 0 {
            continue;
        }
        applied_offers.push(AppliedOffer {
            offer_id: offer.id,
            offer_name: offer.name.clone(),
            discount_amount: 0,
        });
        free_items.push(FreeGrant {
            offer_id: offer.id,
            product_id: bg.get_product_id,
            quantity,
        });
    }
    OracleOutcome {
        applied_offers,
        free_items,
        total_discount: 0,
    }
}

fn bench_reconcile_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_pass");

    for products in [10_u32, 100, 500] {
        let (lines, offers, catalog) = fixture(products);
        let ctx = PassContext {
            offers: &offers,
            catalog: &catalog,
            tier: UserTier::Retail,
            mode: ReconcileMode::default(),
        };

        group.throughput(Throughput::Elements(products as u64));
        group.bench_with_input(BenchmarkId::new("fresh_draft", products), &lines, |b, lines| {
            b.iter(|| {
                let out = reconcile_pass(lines.clone(), &ctx, |cart| grant_everything(&offers, cart));
                black_box(out)
            })
        });

        // A second pass over an already reconciled draft is the common case while editing.
        let Ok(settled) = reconcile_pass(lines.clone(), &ctx, |cart| grant_everything(&offers, cart)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("settled_draft", products), &settled.items, |b, lines| {
            b.iter(|| {
                let out = reconcile_pass(lines.clone(), &ctx, |cart| grant_everything(&offers, cart));
                black_box(out)
            })
        });
    }

    group.finish();
}

fn bench_free_item_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_item_diff");

    for items in [10_u32, 1_000] {
        let old: FreeItemSet = (0..items)
            .map(|n| FreeItem {
                target: StockTarget::product(ProductId::from_u128(n as u128 + 1)),
                quantity: 2,
            })
            .collect();
        let new: FreeItemSet = (0..items)
            .filter(|n| n % 3 != 0)
            .map(|n| FreeItem {
                target: StockTarget::product(ProductId::from_u128(n as u128 + 1)),
                quantity: 1 + n % 4,
            })
            .collect();

        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &(old, new), |b, (old, new)| {
            b.iter(|| black_box(new.diff_from(old)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile_pass, bench_free_item_diff);
criterion_main!(benches);
