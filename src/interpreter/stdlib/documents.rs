//! `doc_*` builtins, forwarded to a `DocumentStore`
//!
//! Store failures become `EXTERNAL_ERROR`s carrying the store's context chain.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{array_arg, doc_arg, str_arg, Builtin, BuiltinRegistry, NativeFunction};
use crate::interpreter::errors::ExecError;
use crate::interpreter::types::{TypeTag, Val};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOp {
    Get,
    Index,
    Update,
    BulkIndex,
    Refresh,
}

impl DocOp {
    pub fn name(&self) -> &'static str {
        match self {
            DocOp::Get => "doc_get",
            DocOp::Index => "doc_index",
            DocOp::Update => "doc_update",
            DocOp::BulkIndex => "doc_bulk_index",
            DocOp::Refresh => "doc_refresh",
        }
    }

    fn params(&self) -> &'static [(&'static str, TypeTag)] {
        match self {
            DocOp::Get => &[("index", TypeTag::String), ("id", TypeTag::String)],
            DocOp::Index => &[
                ("index", TypeTag::String),
                ("id", TypeTag::String),
                ("document", TypeTag::Document),
            ],
            DocOp::Update => &[
                ("index", TypeTag::String),
                ("id", TypeTag::String),
                ("partial", TypeTag::Document),
            ],
            DocOp::BulkIndex => &[("index", TypeTag::String), ("documents", TypeTag::Array)],
            DocOp::Refresh => &[("index", TypeTag::String)],
        }
    }
}

pub struct DocumentFunction {
    op: DocOp,
    store: Arc<dyn DocumentStore>,
}

/// Register every `doc_*` builtin against `store`
pub fn register(registry: &mut BuiltinRegistry, store: Arc<dyn DocumentStore>) {
    for op in [
        DocOp::Get,
        DocOp::Index,
        DocOp::Update,
        DocOp::BulkIndex,
        DocOp::Refresh,
    ] {
        let function = Arc::new(DocumentFunction {
            op,
            store: Arc::clone(&store),
        });
        registry.register(Builtin::native(op.name(), op.params(), function));
    }
}

#[async_trait]
impl NativeFunction for DocumentFunction {
    async fn call(&self, args: Vec<Val>) -> Result<Val, ExecError> {
        let name = self.op.name();
        let index = str_arg(name, &args, 0)?;

        match self.op {
            // A missing document reads as NULL
            DocOp::Get => {
                let id = str_arg(name, &args, 1)?;
                let found = self
                    .store
                    .get(index, id)
                    .await
                    .map_err(ExecError::external)?;
                Ok(found.as_ref().map_or(Val::Null, Val::from_json))
            }

            // A NULL id asks for a generated one; the id is returned
            DocOp::Index => {
                let id = match args.get(1) {
                    Some(Val::Null) => uuid::Uuid::new_v4().to_string(),
                    _ => str_arg(name, &args, 1)?.to_string(),
                };
                let document = Val::Doc(doc_arg(name, &args, 2)?.clone()).to_json();
                self.store
                    .index(index, &id, document)
                    .await
                    .map_err(ExecError::external)?;
                Ok(Val::Str(id))
            }

            DocOp::Update => {
                let id = str_arg(name, &args, 1)?;
                let partial = Val::Doc(doc_arg(name, &args, 2)?.clone()).to_json();
                let updated = self
                    .store
                    .update(index, id, partial)
                    .await
                    .map_err(ExecError::external)?;
                if !updated {
                    return Err(ExecError::builtin(
                        name,
                        format!("document '{}' not found in index '{}'", id, index),
                    ));
                }
                Ok(Val::Bool(true))
            }

            DocOp::BulkIndex => {
                let documents = array_arg(name, &args, 1)?
                    .iter()
                    .map(|doc| with_id(name, doc))
                    .collect::<Result<Vec<_>, _>>()?;
                let written = self
                    .store
                    .bulk_index(index, documents)
                    .await
                    .map_err(ExecError::external)?;
                Ok(Val::Num(written as f64))
            }

            DocOp::Refresh => {
                let count = self
                    .store
                    .refresh(index)
                    .await
                    .map_err(ExecError::external)?;
                Ok(Val::Num(count as f64))
            }
        }
    }
}

/// Split a bulk entry into its id (`_id` field, or generated) and body
fn with_id(name: &str, doc: &Val) -> Result<(String, JsonValue), ExecError> {
    let Val::Doc(map) = doc else {
        return Err(ExecError::builtin(
            name,
            format!("documents must be DOCUMENT values, got {}", doc.type_name()),
        ));
    };

    let mut body = map.clone();
    let id = match body.remove("_id") {
        Some(Val::Str(id)) => id,
        None | Some(Val::Null) => uuid::Uuid::new_v4().to_string(),
        Some(other) => {
            return Err(ExecError::builtin(
                name,
                format!("_id must be STRING, got {}", other.type_name()),
            ))
        }
    };
    Ok((id, Val::Doc(body).to_json()))
}
