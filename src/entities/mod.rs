use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Origin prepended to relative advertisement links.
pub const SITE_ORIGIN: &str = "https://www.polovniautomobili.com";

/// Flat document shape persisted for a listing.
pub type Document = BTreeMap<String, String>;

/// One classified advertisement as extracted from a listings page.
///
/// Every field is optional at the source; a missing value is the empty
/// string. `null` in incoming JSON is accepted and treated the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub price: String,
    #[serde(default, deserialize_with = "nullable")]
    pub year_body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub engine: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mileage: String,
    #[serde(default, deserialize_with = "nullable")]
    pub power: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transmission: String,
    #[serde(default, deserialize_with = "nullable")]
    pub doors_seats: String,
    #[serde(default, deserialize_with = "nullable")]
    pub post_link: String,
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Listing {
    /// Field names in rendering and storage order.
    pub const FIELDS: [&'static str; 9] = [
        "title",
        "price",
        "year_body",
        "engine",
        "mileage",
        "power",
        "transmission",
        "doors_seats",
        "post_link",
    ];

    /// A listing without a link cannot be keyed and is never persisted.
    pub fn has_identity(&self) -> bool {
        !self.post_link.is_empty()
    }

    /// Stable store key: hex MD5 of the link, `None` when there is no link.
    pub fn listing_id(&self) -> Option<String> {
        self.has_identity().then(|| listing_id(&self.post_link))
    }

    /// `(name, value)` pairs in [`Listing::FIELDS`] order.
    pub fn fields(&self) -> [(&'static str, &str); 9] {
        [
            ("title", &self.title),
            ("price", &self.price),
            ("year_body", &self.year_body),
            ("engine", &self.engine),
            ("mileage", &self.mileage),
            ("power", &self.power),
            ("transmission", &self.transmission),
            ("doors_seats", &self.doors_seats),
            ("post_link", &self.post_link),
        ]
    }

    pub fn to_document(&self) -> Document {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Rebuild a listing from a stored document. Unknown keys are ignored.
    pub fn from_document(doc: &Document) -> Self {
        let get = |key: &str| doc.get(key).cloned().unwrap_or_default();
        Self {
            title: get("title"),
            price: get("price"),
            year_body: get("year_body"),
            engine: get("engine"),
            mileage: get("mileage"),
            power: get("power"),
            transmission: get("transmission"),
            doors_seats: get("doors_seats"),
            post_link: get("post_link"),
        }
    }
}

/// Hex-encoded MD5 of the UTF-8 bytes of `post_link`.
pub fn listing_id(post_link: &str) -> String {
    format!("{:x}", md5::compute(post_link.as_bytes()))
}
