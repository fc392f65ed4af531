// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `$ref` resolution.
//!
//! A reference has the form `[document]#[/json/pointer]`. An empty document
//! part points into the document currently being resolved; named documents
//! are looked up among the registered ones first and then handed to the
//! remote provider when they look like a URL. A remote document is fetched
//! once per resolver and reused for every reference into it.
//!
//! Resolution is recursive: the substituted fragment is resolved against its
//! own document. Keys next to `$ref` are resolved too and override keys of
//! the substituted object.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Maximum number of nested references followed from any single `$ref`.
pub const MAX_REFERENCE_DEPTH: usize = 64;

/// Source for documents that are not registered with the resolver.
pub trait ReferenceProvider: Send + Sync {
    /// Fetch and parse the document at `uri`.
    fn fetch(&self, uri: &str) -> Result<Value>;
}

/// Resolves every `$ref` in a document against a set of named documents.
#[derive(Default)]
pub struct ReferenceResolver<'p> {
    documents: BTreeMap<String, Value>,
    remote: Option<&'p dyn ReferenceProvider>,
    fetched: Mutex<BTreeMap<String, Arc<Value>>>,
}

impl<'p> ReferenceResolver<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under the name references use for it.
    pub fn with_document(mut self, name: impl Into<String>, document: Value) -> Self {
        self.documents.insert(name.into(), document);
        self
    }

    /// Fall back to `provider` for `http://` and `https://` documents.
    pub fn with_remote(mut self, provider: &'p dyn ReferenceProvider) -> Self {
        self.remote = Some(provider);
        self
    }

    /// Return a copy of `root` with every reference substituted.
    pub fn resolve(&self, root: &Value) -> Result<Value> {
        let mut stack = Vec::new();
        self.resolve_in(root, root, "", &mut stack)
    }

    fn resolve_in(
        &self,
        value: &Value,
        document: &Value,
        document_name: &str,
        stack: &mut Vec<String>,
    ) -> Result<Value> {
        match value {
            Value::Object(map) => match map.get("$ref") {
                Some(reference) => self.substitute(map, reference, document, document_name, stack),
                None => {
                    let mut resolved = Map::with_capacity(map.len());
                    for (key, child) in map {
                        resolved.insert(
                            key.clone(),
                            self.resolve_in(child, document, document_name, stack)?,
                        );
                    }
                    Ok(Value::Object(resolved))
                }
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_in(item, document, document_name, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn substitute(
        &self,
        map: &Map<String, Value>,
        reference: &Value,
        document: &Value,
        document_name: &str,
        stack: &mut Vec<String>,
    ) -> Result<Value> {
        let Value::String(reference) = reference else {
            return Err(SchemaError::InvalidReference {
                reference: reference.to_string(),
            });
        };

        let (target_name, pointer) = split_reference(reference)?;
        let target_name = if target_name.is_empty() {
            document_name
        } else {
            target_name
        };

        let key = format!("{target_name}#{pointer}");
        if stack.contains(&key) {
            return Err(SchemaError::CyclicReference { reference: key });
        }
        if stack.len() >= MAX_REFERENCE_DEPTH {
            return Err(SchemaError::DepthExceeded {
                reference: key,
                limit: MAX_REFERENCE_DEPTH,
            });
        }

        let fetched;
        let target_document = if target_name == document_name {
            document
        } else if let Some(registered) = self.documents.get(target_name) {
            registered
        } else {
            fetched = self.fetch_remote(target_name, reference)?;
            fetched.as_ref()
        };

        let fragment = target_document
            .pointer(pointer)
            .ok_or_else(|| SchemaError::UnresolvedPointer {
                reference: reference.clone(),
            })?;

        debug!(reference = %reference, "Resolving schema reference");

        stack.push(key);
        let resolved = self.resolve_in(fragment, target_document, target_name, stack);
        stack.pop();
        let mut resolved = resolved?;

        if let Value::Object(target) = &mut resolved {
            for (sibling, child) in map.iter().filter(|(k, _)| k.as_str() != "$ref") {
                target.insert(
                    sibling.clone(),
                    self.resolve_in(child, document, document_name, stack)?,
                );
            }
        }

        Ok(resolved)
    }

    fn fetch_remote(&self, uri: &str, reference: &str) -> Result<Arc<Value>> {
        let is_remote = uri.starts_with("http://") || uri.starts_with("https://");
        let provider = match self.remote {
            Some(provider) if is_remote => provider,
            _ => {
                return Err(SchemaError::UnresolvedDocument {
                    document: uri.to_string(),
                    reference: reference.to_string(),
                });
            }
        };

        if let Some(cached) = self.cached(uri) {
            return Ok(cached);
        }
        debug!(uri = %uri, "Fetching remote schema document");
        let document = Arc::new(provider.fetch(uri)?);
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.to_string(), document.clone());
        Ok(document)
    }

    fn cached(&self, uri: &str) -> Option<Arc<Value>> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }
}

fn split_reference(reference: &str) -> Result<(&str, &str)> {
    let (document, pointer) = reference.split_once('#').unwrap_or((reference, ""));
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(SchemaError::InvalidReference {
            reference: reference.to_string(),
        });
    }
    Ok((document, pointer))
}

/// Fetches `http(s)` reference documents with a blocking `ureq` agent.
///
/// Definitions load synchronously, so the fetch blocks the calling thread.
#[cfg(feature = "http")]
pub struct HttpProvider {
    agent: ureq::Agent,
}

#[cfg(feature = "http")]
impl HttpProvider {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

#[cfg(feature = "http")]
impl ReferenceProvider for HttpProvider {
    fn fetch(&self, uri: &str) -> Result<Value> {
        let remote = |reason: String| SchemaError::RemoteFetch {
            uri: uri.to_string(),
            reason,
        };
        let response = match self.agent.get(uri).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(remote(format!("HTTP {status}"))),
            Err(e) => return Err(remote(e.to_string())),
        };
        response
            .into_json::<Value>()
            .map_err(|e| remote(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_local_and_named_references() {
        let shared = json!({
            "$defs": {
                "repository": {"type": "string", "title": "Repository"},
                "issue": {
                    "type": "object",
                    "properties": {"repo": {"$ref": "#/$defs/repository"}}
                }
            }
        });
        let tasks = json!({
            "$defs": {"page": {"type": "integer", "default": 1}},
            "TASK_GET_ISSUE": {
                "input": {
                    "type": "object",
                    "properties": {
                        "repository": {"$ref": "schema.json#/$defs/repository"},
                        "page": {"$ref": "#/$defs/page"}
                    }
                },
                "output": {"$ref": "schema.json#/$defs/issue"}
            }
        });

        let resolved = ReferenceResolver::new()
            .with_document("schema.json", shared)
            .resolve(&tasks)
            .unwrap();

        let task = &resolved["TASK_GET_ISSUE"];
        assert_eq!(
            task["input"]["properties"]["repository"],
            json!({"type": "string", "title": "Repository"})
        );
        assert_eq!(task["input"]["properties"]["page"]["default"], json!(1));
        // Nested reference is resolved against the document it came from.
        assert_eq!(
            task["output"]["properties"]["repo"]["title"],
            json!("Repository")
        );
    }

    #[test]
    fn test_siblings_override_resolved_keys() {
        let doc = json!({
            "$defs": {"name": {"type": "string", "title": "Name", "uiOrder": 0}},
            "field": {"$ref": "#/$defs/name", "uiOrder": 3}
        });
        let resolved = ReferenceResolver::new().resolve(&doc).unwrap();
        assert_eq!(
            resolved["field"],
            json!({"type": "string", "title": "Name", "uiOrder": 3})
        );
    }

    #[test]
    fn test_cycle_is_detected() {
        let doc = json!({
            "$defs": {
                "a": {"type": "object", "properties": {"b": {"$ref": "#/$defs/b"}}},
                "b": {"type": "object", "properties": {"a": {"$ref": "#/$defs/a"}}}
            },
            "root": {"$ref": "#/$defs/a"}
        });
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(err, SchemaError::CyclicReference { .. }));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let doc = json!({"node": {"$ref": "#/node"}});
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_CYCLIC_REFERENCE");
    }

    #[test]
    fn test_long_reference_chain_hits_depth_limit() {
        let mut defs = Map::new();
        for i in 0..=MAX_REFERENCE_DEPTH + 1 {
            defs.insert(format!("d{i}"), json!({"$ref": format!("#/$defs/d{}", i + 1)}));
        }
        defs.insert(
            format!("d{}", MAX_REFERENCE_DEPTH + 2),
            json!({"type": "string"}),
        );
        let doc = json!({"$defs": defs});

        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::DepthExceeded {
                limit: MAX_REFERENCE_DEPTH,
                ..
            }
        ));
    }

    #[test]
    fn test_repeated_non_cyclic_reference_is_fine() {
        let doc = json!({
            "$defs": {"s": {"type": "string"}},
            "a": {"$ref": "#/$defs/s"},
            "b": {"$ref": "#/$defs/s"}
        });
        let resolved = ReferenceResolver::new().resolve(&doc).unwrap();
        assert_eq!(resolved["a"], resolved["b"]);
    }

    #[test]
    fn test_unresolved_references() {
        let doc = json!({"a": {"$ref": "missing.json#/x"}});
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedDocument { .. }));

        let doc = json!({"a": {"$ref": "#/nowhere"}});
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedPointer { .. }));

        let doc = json!({"a": {"$ref": "#nowhere"}});
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));

        let doc = json!({"a": {"$ref": 7}});
        let err = ReferenceResolver::new().resolve(&doc).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));
    }

    struct RecordingProvider {
        fetched: Mutex<Vec<String>>,
    }

    impl ReferenceProvider for RecordingProvider {
        fn fetch(&self, uri: &str) -> Result<Value> {
            self.fetched.lock().unwrap().push(uri.to_string());
            Ok(json!({"$defs": {"id": {"type": "integer"}}}))
        }
    }

    #[test]
    fn test_remote_documents_use_provider() {
        let provider = RecordingProvider {
            fetched: Mutex::new(Vec::new()),
        };
        let doc = json!({"id": {"$ref": "https://schemas.example.com/common.json#/$defs/id"}});

        let resolved = ReferenceResolver::new()
            .with_remote(&provider)
            .resolve(&doc)
            .unwrap();

        assert_eq!(resolved["id"], json!({"type": "integer"}));
        assert_eq!(
            provider.fetched.lock().unwrap().as_slice(),
            &["https://schemas.example.com/common.json"]
        );
    }

    #[test]
    fn test_remote_document_is_fetched_once() {
        let provider = RecordingProvider {
            fetched: Mutex::new(Vec::new()),
        };
        let doc = json!({
            "id": {"$ref": "https://schemas.example.com/common.json#/$defs/id"},
            "parent": {"$ref": "https://schemas.example.com/common.json#/$defs/id"},
            "all": {"$ref": "https://schemas.example.com/common.json"}
        });

        let resolved = ReferenceResolver::new()
            .with_remote(&provider)
            .resolve(&doc)
            .unwrap();

        assert_eq!(resolved["parent"], json!({"type": "integer"}));
        assert_eq!(resolved["all"]["$defs"]["id"], json!({"type": "integer"}));
        assert_eq!(provider.fetched.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_non_url_documents_never_reach_provider() {
        let provider = RecordingProvider {
            fetched: Mutex::new(Vec::new()),
        };
        let doc = json!({"id": {"$ref": "common.json#/$defs/id"}});
        let err = ReferenceResolver::new()
            .with_remote(&provider)
            .resolve(&doc)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedDocument { .. }));
        assert!(provider.fetched.lock().unwrap().is_empty());
    }
}
