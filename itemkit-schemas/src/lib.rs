//! itemkit schemas - Concrete item types
//!
//! Item types used by the library itself and a representative product
//! schema:
//!
//! - Metadata family: [`Metadata`], [`ListMetadata`], [`ProbabilityMetadata`]
//! - Request family: [`Request`], [`ProbabilityRequest`], [`Header`]
//! - Product: [`Product`], [`ProductFromList`], [`Image`], [`Breadcrumb`]
//! - Derived product fields: [`DescriptionPair`], [`PriceFields`]
//!
//! Related types are registered as cast targets of each other, see
//! [`itemkit_core::cast`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod derived;
pub mod metadata;
pub mod product;
pub mod request;

pub use derived::{DescriptionPair, ParsedPrice, PriceFields};
pub use metadata::{ListMetadata, Metadata, ProbabilityMetadata};
pub use product::{Breadcrumb, Image, Product, ProductFromList};
pub use request::{Header, ProbabilityRequest, Request};
