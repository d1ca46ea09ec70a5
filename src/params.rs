//! Values a match callback hands over to its handler.
use regex::Regex;
use std::collections::BTreeMap;

/// The result of a successful match
///
/// Whatever a route's matcher produces is passed to that route's handler
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Matched, with nothing further to say
    Matched,
    /// Capture groups of a regex match
    Captures(Captures),
    /// An arbitrary structured value
    Value(serde_json::Value),
}

impl Params {
    pub fn captures(&self) -> Option<&Captures> {
        match self {
            Params::Captures(caps) => Some(caps),
            _ => None,
        }
    }

    /// Collapses results that carry no information (a bare match, a regex
    /// without groups, an empty object) to `None` before they reach a handler
    pub(crate) fn into_handler_params(self) -> Option<Params> {
        match self {
            Params::Matched => None,
            Params::Captures(caps) if caps.is_empty() && caps.named.is_empty() => None,
            Params::Value(serde_json::Value::Object(map)) if map.is_empty() => None,
            params => Some(params),
        }
    }
}

/// Owned regex capture groups
///
/// Group 0 (the whole match) is not included. Groups that did not take
/// part in the match are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    positional: Vec<Option<String>>,
    named: BTreeMap<String, String>,
}

impl Captures {
    pub(crate) fn from_regex(
        regex: &Regex,
        caps: &regex::Captures<'_>,
    ) -> Self {
        let positional = caps
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_owned()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
            .collect();
        Captures { positional, named }
    }

    /// Positional group `index`, counting from 0 for the first group
    pub fn get(
        &self,
        index: usize,
    ) -> Option<&str> {
        self.positional.get(index).and_then(|group| group.as_deref())
    }

    pub fn name(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.positional.iter().map(|group| group.as_deref())
    }
}

/// Conversion from a match callback's return value into a match decision
///
/// `None` means the route does not apply.
pub trait IntoParams {
    fn into_params(self) -> Option<Params>;
}

impl IntoParams for bool {
    fn into_params(self) -> Option<Params> {
        if self {
            Some(Params::Matched)
        } else {
            None
        }
    }
}

impl IntoParams for Params {
    fn into_params(self) -> Option<Params> {
        Some(self)
    }
}

impl IntoParams for Captures {
    fn into_params(self) -> Option<Params> {
        Some(Params::Captures(self))
    }
}

impl IntoParams for serde_json::Value {
    fn into_params(self) -> Option<Params> {
        match self {
            serde_json::Value::Null | serde_json::Value::Bool(false) => None,
            value => Some(Params::Value(value)),
        }
    }
}

impl<T> IntoParams for Option<T>
where
    T: IntoParams,
{
    fn into_params(self) -> Option<Params> {
        self.and_then(IntoParams::into_params)
    }
}
