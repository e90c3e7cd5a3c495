//! Resolves deserializers by type name.

use ingest_file::ResettableSource;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::file::FileDeserializerBuilder;
use crate::{Context, Error, EventDeserializer, EventDeserializerBuilder, Result};

/// Built-in deserializer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeserializerType {
    /// Whole source as one record
    File,
}

impl DeserializerType {
    pub fn as_str(&self) -> &str {
        match self {
            DeserializerType::File => "FILE",
        }
    }

    fn builder(&self) -> Arc<dyn EventDeserializerBuilder> {
        match self {
            DeserializerType::File => Arc::new(FileDeserializerBuilder),
        }
    }
}

impl FromStr for DeserializerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FILE" => Ok(DeserializerType::File),
            _ => Err(Error::UnknownDeserializer(s.to_string())),
        }
    }
}

impl std::fmt::Display for DeserializerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates deserializers from a type name, a context and a source.
///
/// Built-in names are matched case-insensitively. Any other name must have
/// been registered with `register`, and is matched exactly.
#[derive(Default, Clone)]
pub struct EventDeserializerFactory {
    custom: BTreeMap<String, Arc<dyn EventDeserializerBuilder>>,
}

impl EventDeserializerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder under `name`. Built-in names cannot be shadowed.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        builder: Arc<dyn EventDeserializerBuilder>,
    ) -> Result<()> {
        let name = name.into();
        if let Ok(builtin) = name.parse::<DeserializerType>() {
            return Err(Error::Config(format!(
                "'{name}' is reserved for the built-in {builtin} deserializer"
            )));
        }
        self.custom.insert(name, builder);
        Ok(())
    }

    pub fn get_instance(
        &self,
        name: &str,
        context: &Context,
        source: Box<dyn ResettableSource>,
    ) -> Result<Box<dyn EventDeserializer>> {
        let builder = match name.parse::<DeserializerType>() {
            Ok(builtin) => builtin.builder(),
            Err(_) => self
                .custom
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownDeserializer(name.to_string()))?,
        };

        tracing::debug!("Building {} deserializer", name);
        builder.build(context, source)
    }
}
