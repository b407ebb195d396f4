//! Small item types shared by the unit tests of this crate

use crate::cast::CastTarget;
use crate::field::FieldType;
use crate::item::UnknownFields;
use crate::value::Float;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub url: String,
    pub text: Option<String>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Link {
        url: "url" => required(FieldType::str()),
        text: "text" => optional(FieldType::str()),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub url: String,
    pub title: Option<String>,
    pub link: Option<Link>,
    pub links: Option<Vec<Link>>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Page {
        url: "url" => required(FieldType::str()),
        title: "title" => optional(FieldType::str()),
        link: "link" => nested(Link),
        links: "links" => list(Link),
    }
}

/// Page reduced to what listings show
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSummary {
    pub url: String,
    pub link: Option<Link>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    PageSummary {
        url: "url" => required(FieldType::str()),
        link: "link" => nested(Link),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub child: Option<Box<Node>>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Node {
        name: "name" => required(FieldType::str()),
        child: "child" => boxed(Node),
    }
}

/// Declares a field that can never be coerced
#[derive(Debug, Clone, PartialEq)]
pub struct Picker {
    pub name: String,
    pub target: Option<Value>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Picker {
        name: "name" => required(FieldType::str()),
        target: "target" => optional(FieldType::union([
            FieldType::item::<Link>(),
            FieldType::item::<Page>(),
        ])),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feed {
    pub entries: Option<Vec<Option<Link>>>,
    pub picker: Option<Picker>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Feed {
        entries: "entries" => nullable_list(Link),
        picker: "picker" => nested(Picker),
    }
}

/// Generic metadata, the usual cast source
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub date_downloaded: Option<String>,
    pub probability: Float,
    pub search_text: Option<String>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    Meta {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
        probability: "probability" => default(FieldType::float(), json!(1.0)),
        search_text: "searchText" => optional(FieldType::str()),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListMeta {
    pub date_downloaded: Option<String>,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    ListMeta {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
    }
}

/// Metadata with a required field no other metadata type has
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedMeta {
    pub date_downloaded: Option<String>,
    pub tag: String,
    pub unknown_fields: UnknownFields,
}

crate::impl_item! {
    TaggedMeta {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
        tag: "tag" => required(FieldType::str()),
    }
}

impl CastTarget<Meta> for ListMeta {}
impl CastTarget<ListMeta> for TaggedMeta {}
impl CastTarget<Page> for PageSummary {}

impl CastTarget<ListMeta> for Meta {
    fn seed(_source: &ListMeta, target: &mut Self) {
        if target.search_text.is_none() {
            target.search_text = Some("seeded".to_string());
        }
    }
}
