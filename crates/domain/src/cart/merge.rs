use super::{Cart, CartLineItem};
use crate::product::Product;

/// Merges the local cart into the remote one, keeping the larger quantity of
/// each product.
///
/// Remote lines come first in remote order, followed by local-only lines in
/// local order. Where a product is in both, the remote product data wins but
/// inherits the local price, tiers, name and images when the remote copy
/// lacks them.
/// Quantities are never summed.
pub fn merge_max(local: &Cart, remote: impl IntoIterator<Item = CartLineItem>) -> Cart {
    let remote = Cart::hydrate(remote);
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(remote.len() + local.len());

    for remote_line in remote.items() {
        let line = match local.get(remote_line.id()) {
            Some(local_line) => {
                let product = enrich(remote_line.product(), local_line.product());
                let quantity = remote_line.quantity().max(local_line.quantity());
                CartLineItem::new(product, quantity)
            }
            None => remote_line.clone(),
        };
        merged.push(line);
    }

    for local_line in local.items() {
        if !remote.contains(local_line.id()) {
            merged.push(local_line.clone());
        }
    }

    Cart::hydrate(merged)
}

/// Takes the remote cart as authoritative, filling in product data the
/// remote lines lack from matching local lines. Local-only lines are dropped.
pub fn adopt_remote(local: &Cart, remote: impl IntoIterator<Item = CartLineItem>) -> Cart {
    let remote = Cart::hydrate(remote);
    let adopted = remote.items().iter().map(|remote_line| match local.get(remote_line.id()) {
        Some(local_line) => CartLineItem::new(
            enrich(remote_line.product(), local_line.product()),
            remote_line.quantity(),
        ),
        None => remote_line.clone(),
    });
    Cart::hydrate(adopted.collect::<Vec<_>>())
}

fn enrich(remote: &Product, local: &Product) -> Product {
    let mut product = remote.clone();
    if product.price.is_zero() {
        product.price = local.price;
    }
    if product.tier_prices.is_empty() {
        product.tier_prices = local.tier_prices.clone();
    }
    if product.name.is_none() {
        product.name = local.name.clone();
    }
    if product.images.is_empty() && product.image.is_none() {
        product.images = local.images.clone();
        product.image = local.image.clone();
    }
    if product.backend_resolvable.is_none() {
        product.backend_resolvable = local.backend_resolvable;
    }
    product
}
