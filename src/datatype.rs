//! Literal datatypes.
//!
//! Every literal carries one of a small fixed set of XML Schema datatypes. The
//! datatype decides how a lexical form is validated, and how two literals are
//! ordered when a query filters or sorts on them.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::vocabulary::XSD;

lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*[+-]?(\d+(\.\d+)?|\.\d+)([eE][+-]?\d+)?").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    String,
    Integer,
    Double,
    Boolean,
}

impl Datatype {
    pub const ALL: [Datatype; 4] = [
        Datatype::String,
        Datatype::Integer,
        Datatype::Double,
        Datatype::Boolean,
    ];
    /// Stable identifier used by the snapshot tables.
    pub fn uid(&self) -> u8 {
        match self {
            Datatype::String => 1,
            Datatype::Integer => 2,
            Datatype::Double => 3,
            Datatype::Boolean => 4,
        }
    }
    pub fn from_uid(uid: u8) -> Option<Datatype> {
        Self::ALL.iter().copied().find(|d| d.uid() == uid)
    }
    pub fn local_name(&self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Integer => "integer",
            Datatype::Double => "double",
            Datatype::Boolean => "boolean",
        }
    }
    pub fn uri(&self) -> String {
        format!("{}{}", XSD, self.local_name())
    }
    /// Maps a datatype URI onto one of the supported datatypes. The narrower
    /// and wider XML Schema numeric types are folded into integer and double.
    pub fn from_uri(uri: &str) -> Option<Datatype> {
        let local = uri.strip_prefix(XSD)?;
        match local {
            "string" | "normalizedString" | "token" | "anyURI" => Some(Datatype::String),
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "negativeInteger" | "nonPositiveInteger"
            | "unsignedInt" | "unsignedLong" => Some(Datatype::Integer),
            "double" | "float" | "decimal" => Some(Datatype::Double),
            "boolean" => Some(Datatype::Boolean),
            _ => None,
        }
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self, Datatype::Integer | Datatype::Double)
    }
    /// Checks that a lexical form is legal for this datatype.
    pub fn validate(&self, lexical: &str) -> bool {
        match self {
            Datatype::String => true,
            Datatype::Integer => INTEGER.is_match(lexical) && lexical.parse::<i64>().is_ok(),
            Datatype::Double => parse_double(lexical).is_some(),
            Datatype::Boolean => parse_boolean(lexical).is_some(),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "xsd:{}", self.local_name())
    }
}

pub fn parse_double(lexical: &str) -> Option<f64> {
    match lexical.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

pub fn parse_boolean(lexical: &str) -> Option<bool> {
    match lexical.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// The numeric prefix of a lexical form, so that version strings such as
/// `"1.9.0"` read as `1.9`. Returns `None` when the form does not start with
/// a number.
pub fn leading_number(lexical: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(lexical)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
}
