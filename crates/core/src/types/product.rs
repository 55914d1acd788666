//! Catalog products and the admin forms that create or edit them.

use serde::{Deserialize, Serialize};

use super::barcode::{Barcode, BarcodeError};
use super::price::Price;

/// A catalog entry keyed by barcode.
///
/// Mirrors the wire shape of the catalog service. `price` and `stock` are
/// accepted either as JSON numbers or as numeric strings, because older
/// admin clients stored form input verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique, immutable key.
    pub barcode: Barcode,
    /// Display name.
    pub name: String,
    /// Selling unit (e.g., "bottle", "strip").
    pub unit: String,
    /// Unit price in whole currency units.
    #[serde(deserialize_with = "lenient::whole_number")]
    pub price: Price,
    /// Units on hand.
    #[serde(deserialize_with = "lenient::whole_number")]
    pub stock: u32,
}

impl Product {
    /// Apply a validated patch in place.
    ///
    /// The barcode is the identity of a product and is never patched.
    pub fn apply(&mut self, patch: &ProductPatch) {
        if let Some(name) = &patch.name {
            name.clone_into(&mut self.name);
        }
        if let Some(unit) = &patch.unit {
            unit.clone_into(&mut self.unit);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
    }
}

/// Errors raised while validating admin input, before any network call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are blank.
    #[error("all fields are required (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The barcode failed to parse.
    #[error("invalid barcode: {0}")]
    Barcode(#[from] BarcodeError),

    /// A numeric field holds something other than a whole number.
    #[error("{field} must be a whole number (got {value:?})")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw input.
        value: String,
    },

    /// An edit carries no fields.
    #[error("nothing to update")]
    EmptyPatch,
}

/// Raw "add product" form input.
///
/// Every field is kept as text because it comes straight from form inputs;
/// JSON numbers are accepted and turned into their text form.
/// [`ProductForm::validate`] turns it into a [`Product`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(default, deserialize_with = "lenient::text")]
    pub barcode: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub stock: String,
}

impl ProductForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] listing every blank field,
    /// or the first parse failure among barcode, price and stock.
    pub fn validate(&self) -> Result<Product, ValidationError> {
        let missing: Vec<&'static str> = [
            ("barcode", &self.barcode),
            ("name", &self.name),
            ("unit", &self.unit),
            ("price", &self.price),
            ("stock", &self.stock),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        Ok(Product {
            barcode: Barcode::parse(&self.barcode)?,
            name: self.name.trim().to_owned(),
            unit: self.unit.trim().to_owned(),
            price: parse_price(&self.price)?,
            stock: parse_stock(&self.stock)?,
        })
    }
}

/// A validated partial update to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl ProductPatch {
    /// Returns true if the patch carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.unit.is_none() && self.price.is_none() && self.stock.is_none()
    }
}

/// Raw "edit product" form input. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatchForm {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub stock: Option<String>,
}

impl ProductPatchForm {
    /// Validate the form.
    ///
    /// Fields that are present must not be blank; clearing a name or unit is
    /// not a valid edit.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPatch`] when no field is present,
    /// [`ValidationError::MissingFields`] for blank fields, or a parse error.
    pub fn validate(&self) -> Result<ProductPatch, ValidationError> {
        let blank: Vec<&'static str> = [
            ("name", &self.name),
            ("unit", &self.unit),
            ("price", &self.price),
            ("stock", &self.stock),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
        .collect();

        if !blank.is_empty() {
            return Err(ValidationError::MissingFields(blank));
        }

        let patch = ProductPatch {
            name: self.name.as_deref().map(|v| v.trim().to_owned()),
            unit: self.unit.as_deref().map(|v| v.trim().to_owned()),
            price: self.price.as_deref().map(parse_price).transpose()?,
            stock: self.stock.as_deref().map(parse_stock).transpose()?,
        };

        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }

        Ok(patch)
    }
}

fn parse_price(raw: &str) -> Result<Price, ValidationError> {
    Price::parse_lenient(raw).ok_or_else(|| ValidationError::InvalidNumber {
        field: "price",
        value: raw.to_owned(),
    })
}

fn parse_stock(raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidNumber {
            field: "stock",
            value: raw.to_owned(),
        })
}

mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    /// Deserialize a whole number given either as a number or a digit string.
    pub fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let raw = match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => n,
            NumberOrText::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| D::Error::custom(format!("expected a whole number, got {s:?}")))?,
        };
        T::try_from(raw).map_err(|_| D::Error::custom(format!("{raw} is out of range")))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Whole(u64),
        Signed(i64),
        Float(f64),
    }

    impl From<Scalar> for String {
        fn from(scalar: Scalar) -> Self {
            match scalar {
                Scalar::Text(s) => s,
                Scalar::Whole(n) => n.to_string(),
                Scalar::Signed(n) => n.to_string(),
                Scalar::Float(n) => n.to_string(),
            }
        }
    }

    /// Deserialize form text given either as a string or a number.
    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Scalar::deserialize(deserializer).map(String::from)
    }

    /// Like [`text`], with `null` meaning absent.
    pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Scalar>::deserialize(deserializer).map(|scalar| scalar.map(String::from))
    }
}
