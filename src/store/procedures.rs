//! Procedure definitions stored by name
//!
//! Definitions are kept as JSON text (`{"params": [...], "body": [...]}`)
//! and parsed on every fetch.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interpreter::types::ProcedureDefinition;

#[async_trait]
pub trait ProcedureStore: Send + Sync {
    /// Look up a procedure by name
    async fn fetch(&self, name: &str) -> Result<Option<ProcedureDefinition>>;

    /// Store or replace a definition; the text is validated first
    async fn store(&self, name: &str, definition: &str) -> Result<()>;

    /// Remove a definition, returning whether it existed
    async fn delete(&self, name: &str) -> Result<bool>;
}

/// Parse definition text
pub fn parse_definition(name: &str, definition: &str) -> Result<ProcedureDefinition> {
    serde_json::from_str(definition)
        .with_context(|| format!("Invalid definition for procedure '{}'", name))
}

/// Procedure store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryProcedureStore {
    definitions: RwLock<HashMap<String, String>>,
}

impl MemoryProcedureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcedureStore for MemoryProcedureStore {
    async fn fetch(&self, name: &str) -> Result<Option<ProcedureDefinition>> {
        let definitions = self.definitions.read().await;
        definitions
            .get(name)
            .map(|text| parse_definition(name, text))
            .transpose()
    }

    async fn store(&self, name: &str, definition: &str) -> Result<()> {
        parse_definition(name, definition)?;
        self.definitions
            .write()
            .await
            .insert(name.to_string(), definition.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.definitions.write().await.remove(name).is_some())
    }
}
