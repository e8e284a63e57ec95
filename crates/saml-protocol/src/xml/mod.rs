//! Minimal XML engine: an owned tree, a hardened reader, a writer,
//! exclusive canonicalization and namespace-aware path queries.

mod c14n;
mod node;
mod query;
mod reader;
mod writer;

pub use c14n::{canonicalize, C14nMode, InclusivePrefixes};
pub use node::{Attribute, Document, Element, NamespaceDecl, Node, XML_NAMESPACE};
pub use query::QueryContext;
pub use reader::parse;
pub use writer::{element_to_string, to_string};
