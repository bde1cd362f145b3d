use crate::{Error, Result};
use std::collections::HashMap;

/// Ordered reference sequence names; a name's position is its integer id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceNames {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl ReferenceNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from names in id order, rejecting duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for name in names {
            let name = name.into();
            if table.get(&name).is_some() {
                return Err(Error::Format(format!(
                    "duplicate reference sequence name: {}",
                    name
                )));
            }
            table.get_or_insert(&name);
        }
        Ok(table)
    }

    /// Returns the id of `name`, assigning the next unused id on first sight.
    pub fn get_or_insert(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// NUL-terminated names packed in id order.
    pub fn to_packed(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.names.iter().map(|n| n.len() + 1).sum());
        for name in &self.names {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
        }
        buf
    }

    /// Parses a packed name table. A final name without a terminator is accepted.
    pub fn from_packed(buf: &[u8]) -> Result<Self> {
        let names = buf
            .split(|&b| b == 0)
            .filter(|name| !name.is_empty())
            .map(|name| {
                std::str::from_utf8(name).map_err(|e| {
                    Error::Format(format!("invalid UTF-8 in sequence name: {}", e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_names(names)
    }
}
