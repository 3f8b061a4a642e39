//! Application wiring
//!
//! Builds the stores selected by configuration and an `Interpreter` that uses
//! them.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::config::{Config, StorageBackend};
use crate::db;
use crate::interpreter::Interpreter;
use crate::store::{
    DocumentStore, MemoryDocumentStore, MemoryProcedureStore, PgDocumentStore, PgProcedureStore,
    ProcedureStore,
};

/// A configured interpreter with its stores
pub struct Application {
    pub config: Config,
    pub pool: Option<PgPool>,
    pub procedures: Arc<dyn ProcedureStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub interpreter: Interpreter,
}

impl Application {
    /// Create an Application from ready-made stores (no I/O)
    pub fn new(
        config: Config,
        pool: Option<PgPool>,
        procedures: Arc<dyn ProcedureStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let interpreter = Interpreter::builder()
            .procedures(Arc::clone(&procedures))
            .documents(Arc::clone(&documents))
            .max_call_depth(config.interpreter.max_call_depth)
            .build();

        Self {
            config,
            pool,
            procedures,
            documents,
            interpreter,
        }
    }

    /// Connect to the configured backend and build the Application
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::info!(backend = "memory", "initializing");
                Ok(Self::new(
                    config,
                    None,
                    Arc::new(MemoryProcedureStore::new()),
                    Arc::new(MemoryDocumentStore::new()),
                ))
            }
            StorageBackend::Postgres => {
                tracing::info!(backend = "postgres", "initializing");
                let pool = db::create_pool(&config.database).await?;
                if config.storage.auto_migrate {
                    db::migrate(&pool).await?;
                }
                let procedures = Arc::new(PgProcedureStore::new(pool.clone()));
                let documents = Arc::new(PgDocumentStore::new(pool.clone()));
                Ok(Self::new(config, Some(pool), procedures, documents))
            }
        }
    }

    /// Get the database pool, if the postgres backend is in use
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::{Expr, Program, Stmt};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_memory_backend_wires_stores() {
        let mut config = Config::default();
        config.interpreter.max_call_depth = 7;

        let app = Application::initialize(config).await.unwrap();

        assert!(app.pool().is_none());
        assert_eq!(app.interpreter.max_call_depth(), 7);
        assert!(app.interpreter.builtins().contains("doc_get"));

        app.procedures
            .store("answer", r#"{"params": [], "body": [{"t": "Return", "value": {"t": "LitNum", "v": 42}}]}"#)
            .await
            .unwrap();
        let program = Program::new(vec![Stmt::ret(Expr::call("answer", vec![]))]);
        let value = app.interpreter.run(&program, HashMap::new()).await.unwrap();
        assert_eq!(value, crate::interpreter::Val::Num(42.0));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore] // Requires database to be running
    async fn test_postgres_backend() {
        let config = Config::builder()
            .backend(Some(StorageBackend::Postgres))
            .build()
            .unwrap();

        let app = Application::initialize(config).await.unwrap();

        assert!(app.pool().is_some());
    }
}
