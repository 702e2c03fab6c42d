//! Value objects shared across the ticket core.

use crate::error::TicketError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a customer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new random `CustomerId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CustomerId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a log entry within a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl LogId {
    /// Creates a new random `LogId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `LogId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a log id supplied by a client.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] if `raw` is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, TicketError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| TicketError::Validation(format!("Invalid logId '{raw}'")))
    }
}

impl Default for LogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ticket number
// ============================================================================

/// Human-readable ticket identifier, `TKT-<YYYYMMDD>-<counter>-<SUFFIX>`.
///
/// Immutable once assigned. Lookups accept any string so tickets numbered
/// by older schemes stay addressable; [`TicketNumber::is_well_formed`]
/// checks the current format.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Prefix of every generated number.
    pub const PREFIX: &'static str = "TKT";

    /// Wrap an existing ticket number (e.g. from a URL path).
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Compose a number from its parts.
    #[must_use]
    pub fn compose(day: NaiveDate, counter: u64, suffix: &str) -> Self {
        Self(format!(
            "{}-{}-{counter}-{suffix}",
            Self::PREFIX,
            day.format("%Y%m%d")
        ))
    }

    /// The number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the `TKT-YYYYMMDD-<digits>-<4 x [A-Z0-9]>` shape.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let parts: Vec<&str> = self.0.split('-').collect();
        let [prefix, date, counter, suffix] = parts.as_slice() else {
            return false;
        };
        *prefix == Self::PREFIX
            && date.len() == 8
            && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
            && !counter.is_empty()
            && counter.bytes().all(|b| b.is_ascii_digit())
            && suffix.len() == 4
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Ticket type
// ============================================================================

/// Kind of service requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    /// Diagnostic visit, no repair committed
    #[serde(rename = "Free Checkup")]
    FreeCheckup,
    /// Repair job
    Repair,
}

impl TicketType {
    /// All accepted values, in display order.
    pub const ALL: [Self; 2] = [Self::FreeCheckup, Self::Repair];

    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FreeCheckup => "Free Checkup",
            Self::Repair => "Repair",
        }
    }

    /// Decode a stored value, falling back to `Repair` for legacy rows
    /// that predate the column.
    #[must_use]
    pub fn from_stored(raw: Option<&str>) -> Self {
        if let Some(Ok(ticket_type)) = raw.map(str::parse::<Self>) {
            return ticket_type;
        }
        tracing::warn!(stored = ?raw, "Healing missing or unknown ticket type to Repair");
        Self::Repair
    }
}

impl FromStr for TicketType {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TicketError::InvalidTicketType(s.to_string()))
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticket status
// ============================================================================

/// Lifecycle state of a ticket.
///
/// Any state may follow any other; `Return` marks rework re-entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Received, not started
    #[default]
    Pending,
    /// Being worked on
    Ongoing,
    /// Work finished
    Completed,
    /// Came back for rework
    Return,
}

impl TicketStatus {
    /// All accepted values.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Ongoing, Self::Completed, Self::Return];

    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Return => "Return",
        }
    }

    /// Decode a stored value; anything unknown reads back as `Pending`.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(stored = raw, "Healing unknown ticket status to Pending");
            Self::Pending
        })
    }
}

impl FromStr for TicketStatus {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TicketError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Actors
// ============================================================================

/// Technician role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including account bootstrap
    Admin,
    /// Bench technician
    #[default]
    Tech,
    /// Front desk: may update tickets but not delete them
    Staff,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tech => "tech",
            Self::Staff => "staff",
        }
    }

    /// Whether this role may hard-delete tickets.
    #[must_use]
    pub const fn can_delete_tickets(&self) -> bool {
        matches!(self, Self::Admin | Self::Tech)
    }
}

impl FromStr for Role {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "tech" | "technician" => Ok(Self::Tech),
            "staff" => Ok(Self::Staff),
            other => Err(TicketError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity performing a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Technician username, rendered into system log lines
    pub username: String,
    /// Role used for authorization checks
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_type_accepts_exact_values_only() {
        assert_eq!("Repair".parse::<TicketType>().ok(), Some(TicketType::Repair));
        assert_eq!(
            "Free Checkup".parse::<TicketType>().ok(),
            Some(TicketType::FreeCheckup)
        );
        assert!(matches!(
            "repair".parse::<TicketType>(),
            Err(TicketError::InvalidTicketType(_))
        ));
        assert!("".parse::<TicketType>().is_err());
    }

    #[test]
    fn ticket_type_serializes_with_space() {
        let json = serde_json::to_string(&TicketType::FreeCheckup).unwrap_or_default();
        assert_eq!(json, "\"Free Checkup\"");
    }

    #[test]
    fn legacy_ticket_type_heals_to_repair() {
        assert_eq!(TicketType::from_stored(None), TicketType::Repair);
        assert_eq!(TicketType::from_stored(Some("LCD")), TicketType::Repair);
        assert_eq!(
            TicketType::from_stored(Some("Free Checkup")),
            TicketType::FreeCheckup
        );
    }

    #[test]
    fn status_parse_and_heal() {
        assert_eq!("Return".parse::<TicketStatus>().ok(), Some(TicketStatus::Return));
        assert!(matches!(
            "Done".parse::<TicketStatus>(),
            Err(TicketError::InvalidStatus(_))
        ));
        assert_eq!(TicketStatus::from_stored("garbage"), TicketStatus::Pending);
        assert_eq!(TicketStatus::default(), TicketStatus::Pending);
    }

    #[test]
    fn compose_produces_well_formed_number() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap_or_default();
        let number = TicketNumber::compose(day, 310, "A9Z0");
        assert_eq!(number.as_str(), "TKT-20250307-310-A9Z0");
        assert!(number.is_well_formed());
    }

    #[test]
    fn malformed_numbers_are_detected() {
        for raw in [
            "",
            "TKT-2025-300-ABCD",
            "TKT-20251399-300-ABCD",
            "TKT-20250101-3x0-ABCD",
            "TKT-20250101-300-abcd",
            "TKT-20250101-300-ABCDE",
            "XYZ-20250101-300-ABCD",
        ] {
            assert!(!TicketNumber::new(raw).is_well_formed(), "{raw}");
        }
    }

    #[test]
    fn log_id_parse_rejects_garbage() {
        assert!(LogId::parse("not-an-id").is_err());
        let id = LogId::new();
        assert_eq!(LogId::parse(&id.to_string()).ok(), Some(id));
    }

    #[test]
    fn only_admin_and_tech_delete() {
        assert!(Role::Admin.can_delete_tickets());
        assert!(Role::Tech.can_delete_tickets());
        assert!(!Role::Staff.can_delete_tickets());
        assert_eq!("Technician".parse::<Role>().ok(), Some(Role::Tech));
    }
}
