//! Boundary mapping from wire DTOs to domain types.
//!
//! Every conversion is total - the DTOs already enforce shape and enum
//! validity at deserialization time, so nothing here can fail.

use lunaria_core::{AddressId, CartItemId, Money, OrderId, ProductId, UserId};

use crate::dto::{
    AddressDto, CartDto, CartItemDto, OrderDto, OrderItemDto, ProductDto, ProductSummaryDto,
    WishlistDto, WishlistItemDto,
};
use crate::types::{Address, CartItem, Order, OrderItem, ProductSummary, WishlistItem};

pub fn convert_cart(dto: CartDto) -> Vec<CartItem> {
    dto.items.into_iter().map(convert_cart_item).collect()
}

fn convert_cart_item(dto: CartItemDto) -> CartItem {
    CartItem {
        id: CartItemId::new(dto.id),
        product: convert_product_summary(dto.product),
        quantity: dto.quantity,
    }
}

fn convert_product_summary(dto: ProductSummaryDto) -> ProductSummary {
    ProductSummary {
        id: ProductId::new(dto.product_id),
        name: dto.product_name,
        unit_price: Money::new(dto.unit_price, dto.currency),
        image_url: dto.image_url,
        rating: dto.rating,
    }
}

pub fn convert_wishlist(dto: WishlistDto) -> Vec<WishlistItem> {
    dto.items.into_iter().map(convert_wishlist_item).collect()
}

fn convert_wishlist_item(dto: WishlistItemDto) -> WishlistItem {
    WishlistItem {
        product: convert_product_summary(dto.product),
        added_at: dto.added_at,
    }
}

pub fn convert_product(dto: ProductDto) -> ProductSummary {
    ProductSummary {
        id: ProductId::new(dto.id),
        name: dto.name,
        unit_price: Money::new(dto.unit_price, dto.currency),
        image_url: dto.image_url,
        rating: dto.rating,
    }
}

pub fn convert_address(dto: AddressDto) -> Address {
    Address {
        id: AddressId::new(dto.id),
        title: dto.title,
        first_name: dto.first_name,
        last_name: dto.last_name,
        street: dto.street,
        city: dto.city,
        state: dto.state,
        postal_code: dto.postal_code,
        country: dto.country,
        phone: dto.phone,
        is_default: dto.is_default,
        is_billing: dto.is_billing,
        is_shipping: dto.is_shipping,
    }
}

pub fn convert_order(dto: OrderDto) -> Order {
    Order {
        id: OrderId::new(dto.id),
        user_id: UserId::new(dto.user_id),
        status: dto.status,
        payment_method: dto.payment_method,
        total: Money::new(dto.total, dto.currency),
        items: dto.items.into_iter().map(convert_order_item).collect(),
        shipping_address_id: AddressId::new(dto.shipping_address_id),
        billing_address_id: AddressId::new(dto.billing_address_id),
        created_at: dto.created_at,
    }
}

fn convert_order_item(dto: OrderItemDto) -> OrderItem {
    OrderItem {
        product_id: ProductId::new(dto.product_id),
        name: dto.name,
        unit_price: Money::new(dto.unit_price, dto.currency),
        quantity: dto.quantity,
    }
}
