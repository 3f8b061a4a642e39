//! Collaborators the interpreter reaches through traits
//!
//! - `ProcedureStore`: named procedure definitions, fetched on demand when a
//!   call target is not otherwise known
//! - `DocumentStore`: JSON documents grouped into indexes, backing the `doc_*`
//!   builtins
//!
//! Each has an in-memory implementation and a Postgres one (`postgres`).

pub mod documents;
pub mod postgres;
pub mod procedures;

pub use documents::{DocumentStore, MemoryDocumentStore};
pub use postgres::{PgDocumentStore, PgProcedureStore};
pub use procedures::{parse_definition, MemoryProcedureStore, ProcedureStore};
