//! Order submission validation.
//!
//! Every field is checked before anything is written. Prices are not taken
//! from the submission; they are looked up from the catalog when the
//! validated order is priced.

use std::collections::HashMap;

use thiserror::Error;

use foodcart_core::{
    Address, AddressError, PaymentMethod, PhoneNumber, PhoneNumberError, ProductId, Quantity,
    QuantityError,
};

use crate::models::{NewOrder, NewOrderItem, OrderFields, OrderItemFields, Product};

/// Maximum length of a customer name, in characters.
pub const MAX_NAME_LENGTH: usize = 50;

/// Reasons an order submission is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}: this field is required")]
    MissingField(&'static str),

    #[error("{0}: this field cannot be empty")]
    EmptyField(&'static str),

    #[error("{field}: must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("phonenumber: {0}")]
    PhoneNumber(#[from] PhoneNumberError),

    #[error("address: {0}")]
    Address(#[from] AddressError),

    #[error("products: expected a non-empty list")]
    NoItems,

    #[error("products[{index}].{field}: this field is required")]
    MissingItemField { index: usize, field: &'static str },

    #[error("products[{index}].quantity: {source}")]
    Quantity {
        index: usize,
        #[source]
        source: QuantityError,
    },

    #[error("products[{index}].product: unknown product {product}")]
    UnknownProduct { index: usize, product: ProductId },
}

/// An order whose fields are valid but whose lines are not priced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub firstname: String,
    pub lastname: String,
    pub phonenumber: PhoneNumber,
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub comment: String,
    pub items: Vec<(ProductId, Quantity)>,
}

impl OrderDraft {
    /// Validate a raw submission.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking fields in
    /// declaration order and lines in list order.
    pub fn validate(fields: OrderFields) -> Result<Self, ValidationError> {
        let firstname = required_name(fields.firstname, "firstname")?;
        let lastname = required_name(fields.lastname, "lastname")?;

        let phonenumber = fields
            .phonenumber
            .ok_or(ValidationError::MissingField("phonenumber"))?;
        let phonenumber = PhoneNumber::parse(&phonenumber)?;

        let address = fields
            .address
            .ok_or(ValidationError::MissingField("address"))?;
        let address = Address::parse(&address)?;

        let lines = fields
            .products
            .ok_or(ValidationError::MissingField("products"))?;
        if lines.is_empty() {
            return Err(ValidationError::NoItems);
        }
        let items = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| validate_line(index, line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            firstname,
            lastname,
            phonenumber,
            address,
            payment_method: fields.payment_method.unwrap_or_default(),
            comment: fields.comment.unwrap_or_default().trim().to_owned(),
            items,
        })
    }

    /// Products referenced by the draft, in line order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|(product, _)| *product).collect()
    }

    /// Attach current catalog prices to every line.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownProduct`] for the first line whose
    /// product is not in `catalog`.
    pub fn price(self, catalog: &[Product]) -> Result<NewOrder, ValidationError> {
        let prices: HashMap<ProductId, _> = catalog.iter().map(|p| (p.id, p.price)).collect();

        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, &(product_id, quantity))| {
                let price = prices
                    .get(&product_id)
                    .copied()
                    .ok_or(ValidationError::UnknownProduct {
                        index,
                        product: product_id,
                    })?;
                Ok(NewOrderItem {
                    product_id,
                    quantity,
                    price,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(NewOrder {
            firstname: self.firstname,
            lastname: self.lastname,
            phonenumber: self.phonenumber,
            address: self.address,
            payment_method: self.payment_method,
            comment: self.comment,
            items,
        })
    }
}

fn required_name(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_line(
    index: usize,
    line: OrderItemFields,
) -> Result<(ProductId, Quantity), ValidationError> {
    let product = line.product.ok_or(ValidationError::MissingItemField {
        index,
        field: "product",
    })?;
    let quantity = line.quantity.ok_or(ValidationError::MissingItemField {
        index,
        field: "quantity",
    })?;
    let quantity = quantity
        .to_quantity()
        .map_err(|source| ValidationError::Quantity { index, source })?;

    Ok((ProductId::new(product), quantity))
}
