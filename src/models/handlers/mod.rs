//! # Type-Handler Registry
//!
//! Maps schema element signatures to the [`TypeHandler`] that reads and
//! writes them. The default registry carries every built-in leaf and
//! container handler; custom handlers can be registered on top and replace
//! any built-in claiming the same signature.

pub mod nested;
pub mod primitive;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ParquetError, Result};
use crate::models::types::metadata::SchemaElement;
use crate::models::types::parquet::{ConvertedType, PhysicalType};
use crate::models::types::schema::Field;
use crate::options::ParquetOptions;
use crate::traits::type_handler::{TypeHandler, TypeSignature};

pub use nested::{ListHandler, MapHandler, StructHandler};
pub use primitive::{LeafKind, PrimitiveHandler};

#[derive(Clone)]
pub struct TypeRegistry {
    handlers: Vec<Arc<dyn TypeHandler>>,
    by_signature: HashMap<TypeSignature, usize>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeRegistry {
    /// A registry without any handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            by_signature: HashMap::new(),
        }
    }

    /// Every built-in handler.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        for kind in LeafKind::ALL {
            reg.register(Arc::new(PrimitiveHandler::new(kind)));
        }
        reg.register(Arc::new(ListHandler));
        reg.register(Arc::new(MapHandler));
        reg.register(Arc::new(StructHandler));
        reg
    }

    /// Add `handler`. Later registrations win for element lookups and are
    /// consulted first for field lookups.
    pub fn register(&mut self, handler: Arc<dyn TypeHandler>) {
        let idx = self.handlers.len();
        for sig in handler.signatures() {
            self.by_signature.insert(sig, idx);
        }
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler for a physical element.
    ///
    /// # Errors
    /// [`ParquetError::HandlerNotFound`] when no handler claims the element's signature.
    pub fn handler_for_element(
        &self,
        element: &SchemaElement,
        options: &ParquetOptions,
    ) -> Result<&Arc<dyn TypeHandler>> {
        let mut sig = TypeSignature::of(element);
        if options.treat_byte_array_as_string && sig == TypeSignature::leaf(PhysicalType::ByteArray, None) {
            sig = TypeSignature::leaf(PhysicalType::ByteArray, Some(ConvertedType::Utf8));
        }
        self.by_signature
            .get(&sig)
            .map(|&i| &self.handlers[i])
            .ok_or_else(|| ParquetError::HandlerNotFound(describe_signature(element)))
    }

    /// Handler that writes a logical field.
    pub fn handler_for_field(&self, field: &Field) -> Result<&Arc<dyn TypeHandler>> {
        self.handlers
            .iter()
            .rev()
            .find(|h| h.handles_field(field))
            .ok_or_else(|| ParquetError::HandlerNotFound(format!("field '{}'", field.path_string())))
    }

    /// Append the physical elements for `field`.
    pub fn describe_physical(&self, field: &Field, out: &mut Vec<SchemaElement>) -> Result<()> {
        self.handler_for_field(field)?
            .describe_as_physical_elements(field, self, out)
    }
}

fn describe_signature(element: &SchemaElement) -> String {
    let physical = element
        .physical_type
        .map_or_else(|| "group".to_string(), |p| p.to_string());
    match element.converted_type {
        Some(c) => format!("'{}' ({physical} annotated {c:?})", element.name),
        None => format!("'{}' ({physical})", element.name),
    }
}
