//! Placement targets: zone paths and intra-zone ordering.
//!
//! Order keys are dotted sequences of numbers compared segment by segment, so
//! `2.0 < 2.1 < 3` and `2 < 2.0`. The literal tokens `before` and `after`
//! request insertion next to the most recently placed shape of the zone
//! instead of a numeric position.

use std::{fmt, str::FromStr};

use crate::domain::error::DomainError;

/// `/`-delimited path of nested zone names, e.g. `content/header`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZonePath(Vec<String>);

impl ZonePath {
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        let segments: Vec<String> = path
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(DomainError::empty_zone_path(path));
        }

        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ZonePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for ZonePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Numeric dotted order key. The derived ordering on the segment vector is the
/// segment-wise comparison placement relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey(Vec<u64>);

impl OrderKey {
    pub fn segments(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for OrderKey {
    type Err = DomainError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let segments = key
            .split('.')
            .map(|segment| {
                segment
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| DomainError::invalid_order_key(key, segment))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Sorted among the zone's other keyed entries.
    Key(OrderKey),
    /// Inserted immediately before the zone's most recently placed shape.
    Before,
    /// Inserted immediately after the zone's most recently placed shape.
    After,
    /// Appended; keeps discovery order.
    Unspecified,
}

impl Order {
    pub fn parse(order: Option<&str>) -> Result<Self, DomainError> {
        match order.map(str::trim) {
            None | Some("") => Ok(Self::Unspecified),
            Some("before") => Ok(Self::Before),
            Some("after") => Ok(Self::After),
            Some(key) => key.parse().map(Self::Key),
        }
    }

    pub fn key(&self) -> Option<&OrderKey> {
        match self {
            Order::Key(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Key(key) => fmt::Display::fmt(key, f),
            Order::Before => f.write_str("before"),
            Order::After => f.write_str("after"),
            Order::Unspecified => Ok(()),
        }
    }
}

/// Where a shape goes: a zone path plus its position inside that zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementTarget {
    pub path: ZonePath,
    pub order: Order,
}

impl PlacementTarget {
    pub fn new(path: ZonePath, order: Order) -> Self {
        Self { path, order }
    }

    pub fn parse(path: &str, order: Option<&str>) -> Result<Self, DomainError> {
        Ok(Self {
            path: ZonePath::parse(path)?,
            order: Order::parse(order)?,
        })
    }

    /// Parse the `zone/path:order` shorthand. The order part is optional.
    pub fn parse_shorthand(value: &str) -> Result<Self, DomainError> {
        let (path, order) = match value.split_once(':') {
            Some((path, order)) => (path, Some(order)),
            None => (value, None),
        };

        Self::parse(path, order)
            .map_err(|err| DomainError::invalid_self_placement(value, err.to_string()))
    }
}

impl fmt::Display for PlacementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            Order::Unspecified => write!(f, "{}", self.path),
            ref order => write!(f, "{}:{}", self.path, order),
        }
    }
}
