//! Product item types
//!
//! [`Product`] is the detail-page form; [`ProductFromList`] is what a
//! product listing page can tell about the same product.

use crate::metadata::ProbabilityMetadata;
use itemkit_core::{CastTarget, FieldType, UnknownFields};

/// An image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Image URL
    pub url: String,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl Image {
    /// Image at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            unknown_fields: UnknownFields::new(),
        }
    }
}

itemkit_core::impl_item! {
    Image {
        url: "url" => required(FieldType::str()),
    }
}

/// One step of a breadcrumb trail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breadcrumb {
    /// Displayed name
    pub name: Option<String>,
    /// Target URL
    pub url: Option<String>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

itemkit_core::impl_item! {
    Breadcrumb {
        name: "name" => optional(FieldType::str()),
        url: "url" => optional(FieldType::str()),
    }
}

/// A product, as found on its detail page
///
/// Prices are decimal strings without thousands separators, e.g.
/// `"1234.50"`; `currency` is an ISO 4217 code and `currencyRaw` the
/// currency as written on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Canonical URL
    pub url: String,
    /// Product name
    pub name: Option<String>,
    /// Current price
    pub price: Option<String>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Currency as written on the page
    pub currency_raw: Option<String>,
    /// Price before discounts
    pub regular_price: Option<String>,
    /// Stock keeping unit
    pub sku: Option<String>,
    /// Plain text description
    pub description: Option<String>,
    /// Normalized HTML description
    pub description_html: Option<String>,
    /// Main product image
    pub main_image: Option<Image>,
    /// All product images
    pub images: Option<Vec<Image>>,
    /// Breadcrumb trail of the page
    pub breadcrumbs: Option<Vec<Breadcrumb>>,
    /// Extraction metadata
    pub metadata: Option<ProbabilityMetadata>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl Product {
    /// Product at `url` with nothing else set
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            price: None,
            currency: None,
            currency_raw: None,
            regular_price: None,
            sku: None,
            description: None,
            description_html: None,
            main_image: None,
            images: None,
            breadcrumbs: None,
            metadata: None,
            unknown_fields: UnknownFields::new(),
        }
    }
}

itemkit_core::impl_item! {
    Product {
        url: "url" => required(FieldType::str()),
        name: "name" => optional(FieldType::str()),
        price: "price" => optional(FieldType::str()),
        currency: "currency" => optional(FieldType::str()),
        currency_raw: "currencyRaw" => optional(FieldType::str()),
        regular_price: "regularPrice" => optional(FieldType::str()),
        sku: "sku" => optional(FieldType::str()),
        description: "description" => optional(FieldType::str()),
        description_html: "descriptionHtml" => optional(FieldType::str()),
        main_image: "mainImage" => nested(Image),
        images: "images" => list(Image),
        breadcrumbs: "breadcrumbs" => list(Breadcrumb),
        metadata: "metadata" => nested(ProbabilityMetadata),
    }
}

/// A product, as found on a product listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFromList {
    /// Canonical URL
    pub url: String,
    /// Product name
    pub name: Option<String>,
    /// Current price
    pub price: Option<String>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Currency as written on the page
    pub currency_raw: Option<String>,
    /// Price before discounts
    pub regular_price: Option<String>,
    /// Stock keeping unit
    pub sku: Option<String>,
    /// Main product image
    pub main_image: Option<Image>,
    /// Extraction metadata
    pub metadata: Option<ProbabilityMetadata>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

itemkit_core::impl_item! {
    ProductFromList {
        url: "url" => required(FieldType::str()),
        name: "name" => optional(FieldType::str()),
        price: "price" => optional(FieldType::str()),
        currency: "currency" => optional(FieldType::str()),
        currency_raw: "currencyRaw" => optional(FieldType::str()),
        regular_price: "regularPrice" => optional(FieldType::str()),
        sku: "sku" => optional(FieldType::str()),
        main_image: "mainImage" => nested(Image),
        metadata: "metadata" => nested(ProbabilityMetadata),
    }
}

impl CastTarget<Product> for ProductFromList {}
impl CastTarget<ProductFromList> for Product {}
