//! Command parsing for write requests.
//!
//! A `PUT` body is parsed as JSON before the command name is considered, so
//! a malformed body is rejected even for unknown commands. Each [`Command`]
//! variant then checks its own required fields; a missing field yields
//! [`RestError::MissingFields`] carrying the body exactly as received.

use serde::Deserialize;
use serde_json::Value;

use super::errors::RestError;

/// Operand fields accepted in a command body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandBody {
    /// Source path, relative to the root.
    #[serde(default)]
    pub from: Option<String>,
    /// Destination path, relative to the root.
    #[serde(default)]
    pub to: Option<String>,
    /// Entry names inside `from`.
    #[serde(default)]
    pub names: Option<Vec<String>>,
}

impl CommandBody {
    /// Parses a body, returning the typed fields and the raw JSON value.
    ///
    /// Bodies that are valid JSON but not objects carry no fields.
    pub fn parse(raw: &str) -> Result<(Self, Value), RestError> {
        let value: Value = serde_json::from_str(raw).map_err(|error| RestError::malformed(&error))?;
        let body = if value.is_object() {
            Self::deserialize(&value).map_err(|error| RestError::malformed(&error))?
        } else {
            Self::default()
        };
        Ok((body, value))
    }
}

/// A validated write command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `mv`: relocate `names` (or the whole `from`) into `to`.
    Move {
        from: String,
        to: String,
        names: Option<Vec<String>>,
        /// Reply payload: the names when given, otherwise the whole body.
        payload: Value,
    },
    /// `cp`: copy `names` from `from` into `to`.
    Copy {
        from: String,
        to: String,
        names: Vec<String>,
    },
    /// `pack`: archive `names` (or `from` itself) into `to`.
    Pack {
        from: String,
        to: Option<String>,
        names: Option<Vec<String>>,
    },
    /// `extract`: unpack the archive at `from` into `to`.
    Extract { from: String, to: Option<String> },
    /// Any other command name; succeeds without doing anything.
    Unknown(String),
}

impl Command {
    /// Parses `raw` and validates it for the command `name`.
    pub fn parse(name: &str, raw: &str) -> Result<Self, RestError> {
        let (body, value) = CommandBody::parse(raw)?;
        let missing = || RestError::missing_fields(raw);
        let from = present(body.from);
        let to = present(body.to);
        match name {
            "mv" => {
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(missing());
                };
                let payload = body
                    .names
                    .as_ref()
                    .map_or_else(|| value.clone(), |names| Value::from(names.clone()));
                Ok(Self::Move {
                    from,
                    to,
                    names: body.names,
                    payload,
                })
            }
            "cp" => {
                let (Some(from), Some(to), Some(names)) = (from, to, body.names) else {
                    return Err(missing());
                };
                Ok(Self::Copy { from, to, names })
            }
            "pack" => {
                let Some(from) = from else {
                    return Err(missing());
                };
                Ok(Self::Pack {
                    from,
                    to,
                    names: body.names,
                })
            }
            "extract" => {
                let Some(from) = from else {
                    return Err(missing());
                };
                Ok(Self::Extract { from, to })
            }
            other => Ok(Self::Unknown(other.to_owned())),
        }
    }

    /// Command name as sent by the client.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Move { .. } => "mv",
            Self::Copy { .. } => "cp",
            Self::Pack { .. } => "pack",
            Self::Extract { .. } => "extract",
            Self::Unknown(name) => name,
        }
    }
}

/// Empty strings count as absent.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}
