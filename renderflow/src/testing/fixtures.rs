//! Test fixtures for render runs.

use std::sync::Arc;

use crate::core::{ImagePayload, ItemId, ProductItem, ViewType};
use crate::store::InMemoryWorkItemStore;

/// A valid 1x1 transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Returns [`TINY_PNG`] as a payload.
#[must_use]
pub fn tiny_png() -> ImagePayload {
    ImagePayload::new("image/png", TINY_PNG.to_vec())
}

/// A distinguishable fake render for call `index`.
#[must_use]
pub fn rendered_image(index: usize) -> ImagePayload {
    ImagePayload::new("image/png", format!("render-{index}").into_bytes())
}

/// A distinguishable fake product photo.
#[must_use]
pub fn product_photo(label: &str) -> ImagePayload {
    ImagePayload::new("image/jpeg", format!("photo-{label}").into_bytes())
}

/// A confirmed product with a distinguishable photo.
#[must_use]
pub fn confirmed_product(label: &str) -> ProductItem {
    ProductItem::new(label, product_photo(label), ViewType::Front).confirmed()
}

/// A confirmed product that is selected for staging.
#[must_use]
pub fn staged_product(label: &str) -> ProductItem {
    confirmed_product(label).selected()
}

/// Builds a store holding the given products, returning their ids in order.
#[must_use]
pub fn store_with(products: Vec<ProductItem>) -> (Arc<InMemoryWorkItemStore>, Vec<ItemId>) {
    let store = Arc::new(InMemoryWorkItemStore::new());
    let ids = products
        .into_iter()
        .map(|product| store.add_product(product))
        .collect();
    (store, ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_png_signature() {
        let png = tiny_png();
        assert_eq!(&png.data[..4], b"\x89PNG");
        assert_eq!(png.mime_type, "image/png");
    }

    #[test]
    fn test_store_with_keeps_order() {
        let (store, ids) = store_with(vec![confirmed_product("a"), staged_product("b")]);
        let products = store.products();
        assert_eq!(products.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
        assert!(!products[0].selected);
        assert!(products[1].selected);
    }
}
