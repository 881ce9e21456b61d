//! Catalog domain module.
//!
//! Products, categories, search filters and reviews, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod filter;
pub mod product;
pub mod review;

pub use category::{Category, CategoryInput};
pub use filter::{ProductFilter, ProductSort};
pub use product::{NewProduct, Product, ProductPatch};
pub use review::{NewReview, Review, ReviewPatch, average_rating};
