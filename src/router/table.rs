use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::bloom::{BloomFilter, PathHash};
use super::method::Method;
use super::radix::{Captures, PatternSegment, Trie, TrieLookup};
use super::route::Route;
use crate::constraint::first_rejection;
use crate::error::{MatchError, RegistrationError};

/// One compiled set of routes: trie, static-path prefilter and the routes themselves.
///
/// The router keeps one table for unversioned routes and one per API version.
#[derive(Debug, Clone)]
pub(crate) struct RouteTable {
    trie: Trie,
    bloom: BloomFilter,
    bloom_enabled: bool,
    routes: Vec<Arc<Route>>,
    /// First literal segment of every dynamic route.
    dynamic_roots: HashSet<Box<str>>,
    /// A dynamic route starts with a parameter or catch-all.
    root_dynamic: bool,
}

impl RouteTable {
    pub(crate) fn new(bloom_bits: usize, bloom_hashes: u32, bloom_enabled: bool) -> Self {
        Self {
            trie: Trie::new(),
            bloom: BloomFilter::new(bloom_bits, bloom_hashes),
            bloom_enabled,
            routes: Vec::new(),
            dynamic_roots: HashSet::new(),
            root_dynamic: false,
        }
    }

    /// Add a route, rejecting it if it would make the trie ambiguous.
    pub(crate) fn insert(&mut self, route: Route) -> Result<&mut Arc<Route>, RegistrationError> {
        if let Some(reason) = self.trie.find_conflict(route.method(), route.segments()) {
            return Err(RegistrationError::Conflict {
                method: route.method(),
                pattern: route.pattern().to_string(),
                reason,
            });
        }

        let id = self.routes.len();
        self.trie.insert(route.method(), route.segments(), id);

        if route.is_static() {
            self.bloom.add(PathHash::of(route.pattern()));
        } else {
            match route.segments().first() {
                Some(PatternSegment::Literal(first)) => {
                    self.dynamic_roots.insert(first.clone());
                }
                _ => self.root_dynamic = true,
            }
        }

        self.routes.push(Arc::new(route));
        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index])
    }

    /// `true` when no dynamic route could match `path`, so only static routes are candidates.
    fn is_static_shaped(&self, path: &str) -> bool {
        if self.root_dynamic {
            return false;
        }
        let body = path.strip_prefix('/').unwrap_or(path);
        let first = body.split('/').next().unwrap_or("");
        !self.dynamic_roots.contains(first)
    }

    /// Resolve `path` for `method` (`None` for unroutable methods).
    ///
    /// Parameter constraints are evaluated during the walk; a rejected
    /// candidate does not count as a match.
    pub(crate) fn resolve<'p>(
        &self,
        method: Option<Method>,
        path: &'p str,
    ) -> Result<(&Arc<Route>, Captures<'p>), MatchError> {
        if self.bloom_enabled
            && self.is_static_shaped(path)
            && !self.bloom.might_contain(PathHash::of(path))
        {
            debug!(path = %path, "Bloom prefilter rejected path");
            return Err(MatchError::NotFound);
        }

        let accept = |id: usize, captures: &Captures<'p>| {
            let Some(route) = self.routes.get(id) else {
                return false;
            };
            let rejected = first_rejection(route.constraints(), |name| {
                captures
                    .iter()
                    .rev()
                    .find(|(k, _)| k.as_ref() == name)
                    .map(|(_, v)| *v)
            });
            if let Some(c) = rejected {
                debug!(
                    pattern = %route.pattern(),
                    param = %c.param,
                    constraint = c.constraint.kind(),
                    "Constraint rejected candidate route"
                );
            }
            rejected.is_none()
        };

        match self.trie.lookup(method, path, &accept) {
            TrieLookup::Found(id, captures) => self
                .routes
                .get(id)
                .map(|route| (route, captures))
                .ok_or(MatchError::NotFound),
            TrieLookup::MethodMismatch(allowed) => Err(MatchError::MethodNotAllowed { allowed }),
            TrieLookup::Missing => Err(MatchError::NotFound),
        }
    }

    pub(crate) fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub(crate) fn routes_mut(&mut self) -> &mut [Arc<Route>] {
        &mut self.routes
    }

    pub(crate) fn bloom(&self) -> &BloomFilter {
        &self.bloom
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}
