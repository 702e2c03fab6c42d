//! Customer records and name handling.

use crate::error::TicketError;
use crate::types::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer, keyed by contact number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Internal identifier
    pub id: CustomerId,
    /// First name
    pub first_name: String,
    /// Middle name
    pub middle_name: String,
    /// Last name
    pub last_name: String,
    /// Optional suffix (`Jr.`, `III`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Unique contact number
    pub contact_number: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Build a new customer record from validated input.
    #[must_use]
    pub fn new(contact_number: String, name: PersonName, created_at: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::new(),
            first_name: name.first,
            middle_name: name.middle,
            last_name: name.last,
            suffix: name.suffix,
            contact_number,
            created_at,
        }
    }

    /// `First Middle Last Suffix`, single-spaced.
    #[must_use]
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            Some(self.middle_name.as_str()),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Name fields supplied when a customer is first seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// First name
    pub first: String,
    /// Middle name
    pub middle: String,
    /// Last name
    pub last: String,
    /// Optional suffix
    pub suffix: Option<String>,
}

impl PersonName {
    /// Create a name without suffix.
    #[must_use]
    pub fn new(first: impl Into<String>, middle: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            middle: middle.into(),
            last: last.into(),
            suffix: None,
        }
    }

    /// Set the suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Trim every field and reject blank required names.
    ///
    /// A blank suffix becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] naming the first blank field.
    pub fn normalized(self) -> Result<Self, TicketError> {
        Ok(Self {
            first: required("firstName", &self.first)?,
            middle: required("middleName", &self.middle)?,
            last: required("lastName", &self.last)?,
            suffix: optional(self.suffix.as_deref()),
        })
    }
}

/// Partial update of a customer. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    /// New first name
    pub first_name: Option<String>,
    /// New middle name
    pub middle_name: Option<String>,
    /// New last name
    pub last_name: Option<String>,
    /// New suffix; an empty string clears it
    pub suffix: Option<String>,
    /// New contact number
    pub contact_number: Option<String>,
}

impl CustomerUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.suffix.is_none()
            && self.contact_number.is_none()
    }

    /// Apply to a copy of `customer`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] if a supplied name or contact
    /// number is blank.
    pub fn apply(&self, customer: &Customer) -> Result<Customer, TicketError> {
        let mut updated = customer.clone();
        if let Some(first) = &self.first_name {
            updated.first_name = required("firstName", first)?;
        }
        if let Some(middle) = &self.middle_name {
            updated.middle_name = required("middleName", middle)?;
        }
        if let Some(last) = &self.last_name {
            updated.last_name = required("lastName", last)?;
        }
        if let Some(suffix) = &self.suffix {
            updated.suffix = optional(Some(suffix));
        }
        if let Some(contact) = &self.contact_number {
            updated.contact_number = normalize_contact(contact)?;
        }
        Ok(updated)
    }
}

/// Trim a contact number and reject blanks.
///
/// # Errors
///
/// Returns [`TicketError::Validation`] if the number is blank.
pub fn normalize_contact(raw: &str) -> Result<String, TicketError> {
    required("contactNumber", raw)
}

fn required(field: &str, value: &str) -> Result<String, TicketError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TicketError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
