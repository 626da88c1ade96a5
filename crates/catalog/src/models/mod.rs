//! Catalog domain types and request payloads.

pub mod category;
pub mod product;

pub use category::{Category, CategoryDetail, CategoryNode, CreateCategory, UpdateCategory};
pub use product::{
    CreateImage, CreateProduct, CreateVariant, Product, ProductDetail, ProductImage,
    ProductVariant, UpdateProduct, UpdateVariant,
};
