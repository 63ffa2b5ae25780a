//! The routing table: conflict-checked assembly and immutable dispatch.
//!
//! The builder accumulates [`RouteEntry`] values keyed by
//! (verb, path template); a second registration under the same key is a
//! configuration conflict and fails the build instead of overwriting.
//! `build` hands the entries to `matchit`, which resolves templates
//! per path; the per-verb layering lives in this module.

use std::collections::{BTreeSet, HashMap, HashSet};

use http::Method;
use tracing::debug;

use crate::descriptor::EndpointDescriptor;
use crate::error::BuildError;
use crate::handler::RouteHandler;
use crate::request::PathParams;

/// One registered route, owned by the table.
pub struct RouteEntry {
    verb: Method,
    path_template: String,
    handler: Box<dyn RouteHandler>,
}

impl RouteEntry {
    pub fn verb(&self) -> &Method {
        &self.verb
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RouteEntry({} {})", self.verb, self.path_template)
    }
}

/// Accumulates routes and rejects duplicate (verb, template) keys.
#[derive(Debug, Default)]
pub struct RoutingTableBuilder {
    entries: Vec<RouteEntry>,
    keys: HashSet<(Method, String)>,
}

impl RoutingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one handler under its (verb, template) key.
    pub fn add(
        &mut self,
        verb: Method,
        template: impl Into<String>,
        handler: Box<dyn RouteHandler>,
    ) -> Result<(), BuildError> {
        let template = normalize_template(&template.into());
        let key = (verb.clone(), template.clone());
        if !self.keys.insert(key) {
            return Err(BuildError::RouteConflict { verb, template });
        }
        debug!(%verb, %template, "route registered");
        self.entries.push(RouteEntry { verb, path_template: template, handler });
        Ok(())
    }

    /// Merges another builder's routes, re-checking every key.
    pub fn add_all(&mut self, other: RoutingTableBuilder) -> Result<(), BuildError> {
        for entry in other.entries {
            self.add(entry.verb, entry.path_template, entry.handler)?;
        }
        Ok(())
    }

    /// Finalizes the table. The endpoint set rides along for
    /// documentation tooling and the not-found fallback.
    pub fn build(self, endpoints: BTreeSet<EndpointDescriptor>) -> Result<RoutingTable, BuildError> {
        let mut by_template: HashMap<String, HashMap<Method, Box<dyn RouteHandler>>> = HashMap::new();
        for entry in self.entries {
            by_template.entry(entry.path_template).or_default().insert(entry.verb, entry.handler);
        }

        let mut inner = matchit::Router::new();
        for (template, verbs) in by_template {
            inner
                .insert(template.clone(), verbs)
                .map_err(|source| BuildError::InvalidTemplate { template, source })?;
        }

        Ok(RoutingTable { inner, endpoints })
    }
}

/// The immutable dispatch table. Exactly one handler per
/// (verb, path template); published once, then only read.
pub struct RoutingTable {
    inner: matchit::Router<HashMap<Method, Box<dyn RouteHandler>>>,
    endpoints: BTreeSet<EndpointDescriptor>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::new()
    }

    /// Looks up the handler for a request line.
    pub fn route<'table, 'req>(&'table self, verb: &Method, path: &'req str) -> Option<RouteMatch<'table, 'req>> {
        let matched = self.inner.at(path).ok()?;
        let handler = matched.value.get(verb)?;
        Some(RouteMatch { handler: handler.as_ref(), params: matched.params.into() })
    }

    /// Sorted, de-duplicated descriptors of everything in the table.
    pub fn endpoints(&self) -> &BTreeSet<EndpointDescriptor> {
        &self.endpoints
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable").field("endpoints", &self.endpoints.len()).finish()
    }
}

/// A successful lookup: the handler plus its matched path variables.
pub struct RouteMatch<'table, 'req> {
    handler: &'table dyn RouteHandler,
    params: PathParams<'table, 'req>,
}

impl<'table, 'req> RouteMatch<'table, 'req> {
    pub fn handler(&self) -> &'table dyn RouteHandler {
        self.handler
    }

    pub fn params(&self) -> PathParams<'table, 'req> {
        self.params.clone()
    }
}

impl std::fmt::Debug for RouteMatch<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch").field("params", &self.params.len()).finish()
    }
}

/// Collapses duplicate slashes and guarantees a leading slash.
pub(crate) fn normalize_template(template: &str) -> String {
    let mut normalized = String::with_capacity(template.len() + 1);
    normalized.push('/');
    let mut previous_slash = true;
    for c in template.chars() {
        if c == '/' {
            if !previous_slash {
                normalized.push('/');
            }
            previous_slash = true;
        } else {
            normalized.push(c);
            previous_slash = false;
        }
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
