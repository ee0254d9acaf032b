use std::{fs, io::Write as _, path::Path};

use indexmap::IndexMap;
use oxttl::{TurtleParser, TurtleSerializer};
use serde::{Deserialize, Serialize};

use crate::{
    error::IcddError,
    graph::{Term, Triple, TripleStore},
};

/// Layout of a serialized graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStyle {
    /// Prefix header, statements grouped per subject. Used for the index and linksets.
    #[default]
    Pretty,
    /// One fully expanded statement per line.
    Compact,
}

/// Boundary to the graph serialization format.
pub trait GraphCodec: Send + Sync {
    /// File extension (without dot) of files written by this codec.
    fn extension(&self) -> &'static str;

    fn parse_str(&self, text: &str) -> Result<TripleStore, IcddError>;

    fn write_string(&self, store: &TripleStore, style: GraphStyle) -> Result<String, IcddError>;

    fn parse(&self, path: &Path) -> Result<TripleStore, IcddError> {
        tracing::debug!("Reading graph {:?}", path);
        let text = fs::read_to_string(path)?;
        self.parse_str(&text).map_err(|err| match err {
            IcddError::MalformedGraph(msg) => {
                IcddError::MalformedGraph(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    fn serialize(&self, store: &TripleStore, path: &Path, style: GraphStyle) -> Result<(), IcddError> {
        tracing::debug!("Writing graph {:?} ({} statements)", path, store.len());
        let text = self.write_string(store, style)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Adds every prefix of `source` that `target` does not bind yet.
pub fn merge_namespaces(target: &mut TripleStore, source: &TripleStore) {
    for (prefix, ns) in source.prefixes() {
        if prefix.is_empty() || target.prefixes().contains_key(prefix) {
            continue;
        }
        target.add_prefix(prefix, ns);
    }
}

/// Turtle through `oxttl`. Parsed statements keep file order; prefixes and the last `@base`
/// (or `BASE`) directive are carried over to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurtleCodec;

impl GraphCodec for TurtleCodec {
    fn extension(&self) -> &'static str {
        "ttl"
    }

    fn parse_str(&self, text: &str) -> Result<TripleStore, IcddError> {
        let mut reader = TurtleParser::new().for_reader(text.as_bytes());
        let mut store = TripleStore::new();
        for triple in reader.by_ref() {
            let triple = triple.map_err(|err| IcddError::MalformedGraph(err.to_string()))?;
            store.insert(triple.into());
        }
        if let Some(base) = reader.base_iri() {
            store.set_base(base);
        }
        for (prefix, ns) in reader.prefixes() {
            store.add_prefix(prefix, ns);
        }
        Ok(store)
    }

    fn write_string(&self, store: &TripleStore, style: GraphStyle) -> Result<String, IcddError> {
        let mut out = Vec::new();
        if let Some(base) = store.base() {
            writeln!(out, "@base <{base}> .")?;
        }
        match style {
            GraphStyle::Compact => {
                for triple in store.iter() {
                    writeln!(out, "{} .", oxrdf::Triple::try_from(triple)?)?;
                }
            }
            GraphStyle::Pretty => {
                let mut serializer = TurtleSerializer::new();
                for (prefix, ns) in store.prefixes() {
                    serializer = serializer.with_prefix(prefix, ns).map_err(|err| {
                        IcddError::MalformedGraph(format!("prefix {prefix}: {err}"))
                    })?;
                }
                let mut writer = serializer.for_writer(out);
                for triple in grouped_by_subject(store) {
                    writer.serialize_triple(&oxrdf::Triple::try_from(triple)?)?;
                }
                out = writer.finish()?;
            }
        }
        String::from_utf8(out).map_err(|err| IcddError::MalformedGraph(err.to_string()))
    }
}

/// Statements reordered so each subject's statements are adjacent, subjects in discovery order.
fn grouped_by_subject(store: &TripleStore) -> impl Iterator<Item = &Triple> {
    let mut by_subject: IndexMap<&Term, Vec<&Triple>> = IndexMap::new();
    for triple in store.iter() {
        by_subject.entry(&triple.subject).or_default().push(triple);
    }
    by_subject.into_values().flatten()
}
