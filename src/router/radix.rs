//! Segment trie for HTTP route matching.
//!
//! Patterns are split on `/` into segments. Each node holds:
//! - literal children keyed by segment text
//! - at most one parameter child (`:name`)
//! - at most one catch-all (`*` or `*name`), which must be the last segment
//! - one terminal route slot per HTTP method
//!
//! Lookup walks the request segments and, at every node, tries literal, then
//! parameter, then catch-all. A candidate terminal is only accepted when the
//! caller's check (parameter constraints) passes; otherwise the walk backtracks
//! and keeps looking, so `/users/:id` constrained to integers does not hide a
//! catch-all registered next to it.
//!
//! Lookup is O(k) in the number of path segments when no backtracking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use super::method::{Method, MethodSet, METHOD_COUNT};
use crate::context::MAX_INLINE_PARAMS;
use crate::error::RegistrationError;

/// Index of a route inside its table.
pub(crate) type RouteId = usize;

/// Parameters captured during a lookup, borrowed from the request path.
pub(crate) type Captures<'p> = SmallVec<[(Arc<str>, &'p str); MAX_INLINE_PARAMS]>;

/// Key a bare `*` catch-all is captured under.
pub const WILDCARD_KEY: &str = "*";

/// One parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternSegment {
    Literal(Box<str>),
    Param(Arc<str>),
    Wildcard(Arc<str>),
}

impl PatternSegment {
    pub(crate) fn is_dynamic(&self) -> bool {
        !matches!(self, PatternSegment::Literal(_))
    }
}

/// Split a route pattern into segments.
///
/// Rules:
/// - the pattern must start with `/`; `/` alone is the root
/// - `:name` is a parameter, `*`/`*name` a catch-all allowed only as the last segment
/// - empty segments (`//`) are rejected; a single trailing `/` is kept as a
///   distinct empty literal so `/users` and `/users/` are different routes
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<PatternSegment>, RegistrationError> {
    let invalid = |reason: &str| RegistrationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let body = pattern
        .strip_prefix('/')
        .ok_or_else(|| invalid("pattern must start with '/'"))?;
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<&str> = body.split('/').collect();
    let last = raw.len() - 1;
    let mut segments = Vec::with_capacity(raw.len());
    let mut seen_params: SmallVec<[&str; MAX_INLINE_PARAMS]> = SmallVec::new();

    for (idx, seg) in raw.iter().enumerate() {
        if seg.is_empty() {
            if idx == last {
                segments.push(PatternSegment::Literal(Box::from("")));
                continue;
            }
            return Err(invalid("empty path segment"));
        }
        if let Some(name) = seg.strip_prefix(':') {
            if name.is_empty() {
                return Err(invalid("parameter segment needs a name after ':'"));
            }
            if seen_params.contains(&name) {
                return Err(invalid("duplicate parameter name"));
            }
            seen_params.push(name);
            segments.push(PatternSegment::Param(Arc::from(name)));
        } else if let Some(name) = seg.strip_prefix('*') {
            if idx != last {
                return Err(invalid("catch-all '*' must be the last segment"));
            }
            let name = if name.is_empty() { WILDCARD_KEY } else { name };
            if seen_params.contains(&name) {
                return Err(invalid("duplicate parameter name"));
            }
            segments.push(PatternSegment::Wildcard(Arc::from(name)));
        } else {
            segments.push(PatternSegment::Literal(Box::from(*seg)));
        }
    }

    Ok(segments)
}

type Slots = [Option<RouteId>; METHOD_COUNT];

#[derive(Debug, Clone)]
struct ParamEdge {
    name: Arc<str>,
    node: TrieNode,
}

#[derive(Debug, Clone)]
struct WildcardEdge {
    name: Arc<str>,
    routes: Slots,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    literals: HashMap<Box<str>, TrieNode>,
    param: Option<Box<ParamEdge>>,
    wildcard: Option<WildcardEdge>,
    routes: Slots,
}

/// Outcome of a trie lookup.
#[derive(Debug)]
pub(crate) enum TrieLookup<'p> {
    /// A route for the requested method matched and its constraints passed.
    Found(RouteId, Captures<'p>),
    /// The path matched, but only for these other methods.
    MethodMismatch(MethodSet),
    /// Nothing matched.
    Missing,
}

/// The segment trie for one route table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trie {
    root: TrieNode,
}

impl Trie {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Report why `segments` cannot be inserted for `method`, without modifying the trie.
    pub(crate) fn find_conflict(&self, method: Method, segments: &[PatternSegment]) -> Option<String> {
        let m = method.index();
        let mut node = &self.root;

        for seg in segments {
            match seg {
                PatternSegment::Literal(text) => match node.literals.get(text) {
                    Some(child) => node = child,
                    None => return None,
                },
                PatternSegment::Param(name) => match node.param.as_deref() {
                    Some(edge) if edge.name != *name => {
                        return Some(format!(
                            "parameter ':{name}' conflicts with existing ':{}' at the same position",
                            edge.name
                        ));
                    }
                    Some(edge) => node = &edge.node,
                    None => return None,
                },
                // Literal and parameter siblings outrank the catch-all and it needs a
                // non-empty remainder, so only a second catch-all here is ambiguous.
                PatternSegment::Wildcard(name) => {
                    let Some(w) = &node.wildcard else {
                        return None;
                    };
                    if w.name != *name {
                        return Some(format!(
                            "catch-all '{}' conflicts with existing '{}' at the same position",
                            catch_all_label(name),
                            catch_all_label(&w.name)
                        ));
                    }
                    return w.routes[m].map(|_| "route already registered".to_string());
                }
            }
        }

        node.routes[m].map(|_| "route already registered".to_string())
    }

    /// Insert a route. Callers must run [`Trie::find_conflict`] first.
    pub(crate) fn insert(&mut self, method: Method, segments: &[PatternSegment], id: RouteId) {
        let m = method.index();
        let mut node = &mut self.root;

        for seg in segments {
            match seg {
                PatternSegment::Literal(text) => {
                    node = node.literals.entry(text.clone()).or_default();
                }
                PatternSegment::Param(name) => {
                    let edge = node.param.get_or_insert_with(|| {
                        Box::new(ParamEdge {
                            name: Arc::clone(name),
                            node: TrieNode::default(),
                        })
                    });
                    node = &mut edge.node;
                }
                PatternSegment::Wildcard(name) => {
                    let edge = node.wildcard.get_or_insert_with(|| WildcardEdge {
                        name: Arc::clone(name),
                        routes: [None; METHOD_COUNT],
                    });
                    edge.routes[m] = Some(id);
                    return;
                }
            }
        }

        node.routes[m] = Some(id);
    }

    /// Resolve a request path.
    ///
    /// `method` is `None` for methods the router does not route; such requests can
    /// only produce [`TrieLookup::MethodMismatch`] or [`TrieLookup::Missing`].
    /// `accept` is consulted for every structurally matching terminal.
    pub(crate) fn lookup<'p>(
        &self,
        method: Option<Method>,
        path: &'p str,
        accept: &dyn Fn(RouteId, &Captures<'p>) -> bool,
    ) -> TrieLookup<'p> {
        let Some(body) = path.strip_prefix('/') else {
            return TrieLookup::Missing;
        };

        // (start, end) offsets of each segment within `body`
        let mut spans: SmallVec<[(usize, usize); 16]> = SmallVec::new();
        if !body.is_empty() {
            let mut start = 0;
            for (i, b) in body.bytes().enumerate() {
                if b == b'/' {
                    spans.push((start, i));
                    start = i + 1;
                }
            }
            spans.push((start, body.len()));
        }

        let mut walk = Walk {
            body,
            spans: &spans,
            method,
            accept,
            captures: Captures::new(),
            allowed: MethodSet::empty(),
        };

        match walk.search(&self.root, 0) {
            Some(id) => TrieLookup::Found(id, walk.captures),
            None if !walk.allowed.is_empty() => TrieLookup::MethodMismatch(walk.allowed),
            None => TrieLookup::Missing,
        }
    }
}

/// `*` for the anonymous catch-all, `*name` otherwise.
fn catch_all_label(name: &str) -> String {
    if name == WILDCARD_KEY {
        WILDCARD_KEY.to_string()
    } else {
        format!("*{name}")
    }
}

struct Walk<'a, 'p> {
    body: &'p str,
    spans: &'a [(usize, usize)],
    method: Option<Method>,
    accept: &'a dyn Fn(RouteId, &Captures<'p>) -> bool,
    captures: Captures<'p>,
    allowed: MethodSet,
}

impl<'a, 'p> Walk<'a, 'p> {
    fn search(&mut self, node: &TrieNode, depth: usize) -> Option<RouteId> {
        let Some(&(start, end)) = self.spans.get(depth) else {
            return self.terminal(&node.routes);
        };
        let body = self.body;
        let segment = &body[start..end];

        if let Some(child) = node.literals.get(segment) {
            if let Some(id) = self.search(child, depth + 1) {
                return Some(id);
            }
        }

        if let Some(edge) = node.param.as_deref() {
            if !segment.is_empty() {
                self.captures.push((Arc::clone(&edge.name), segment));
                if let Some(id) = self.search(&edge.node, depth + 1) {
                    return Some(id);
                }
                self.captures.pop();
            }
        }

        if let Some(edge) = &node.wildcard {
            let rest = &body[start..];
            if !rest.is_empty() {
                self.captures.push((Arc::clone(&edge.name), rest));
                if let Some(id) = self.terminal(&edge.routes) {
                    return Some(id);
                }
                self.captures.pop();
            }
        }

        None
    }

    fn terminal(&mut self, routes: &Slots) -> Option<RouteId> {
        if let Some(method) = self.method {
            if let Some(id) = routes[method.index()] {
                if (self.accept)(id, &self.captures) {
                    return Some(id);
                }
            }
        }
        for other in Method::ALL {
            if Some(other) == self.method {
                continue;
            }
            if let Some(id) = routes[other.index()] {
                if (self.accept)(id, &self.captures) {
                    self.allowed.insert(other);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie_with(routes: &[(Method, &str)]) -> Trie {
        let mut trie = Trie::new();
        for (id, (method, pattern)) in routes.iter().enumerate() {
            let segments = parse_pattern(pattern).unwrap();
            assert!(trie.find_conflict(*method, &segments).is_none(), "{pattern}");
            trie.insert(*method, &segments, id);
        }
        trie
    }

    fn accept_all(_: RouteId, _: &Captures<'_>) -> bool {
        true
    }

    fn found(lookup: TrieLookup<'_>) -> (RouteId, Vec<(String, String)>) {
        match lookup {
            TrieLookup::Found(id, caps) => (
                id,
                caps.iter()
                    .map(|(k, v)| (k.to_string(), (*v).to_string()))
                    .collect(),
            ),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_malformed_patterns() {
        assert!(parse_pattern("users").is_err());
        assert!(parse_pattern("/a//b").is_err());
        assert!(parse_pattern("/a/:").is_err());
        assert!(parse_pattern("/a/*/b").is_err());
        assert!(parse_pattern("/a/:id/b/:id").is_err());
        assert_eq!(parse_pattern("/").unwrap(), Vec::new());
    }

    #[test]
    fn parse_keeps_trailing_slash_distinct() {
        let segments = parse_pattern("/users/").unwrap();
        assert_eq!(
            segments,
            vec![
                PatternSegment::Literal(Box::from("users")),
                PatternSegment::Literal(Box::from("")),
            ]
        );
    }

    #[test]
    fn literal_beats_parameter() {
        let trie = trie_with(&[(Method::Get, "/users/:id"), (Method::Get, "/users/static")]);
        let (id, caps) = found(trie.lookup(Some(Method::Get), "/users/static", &accept_all));
        assert_eq!(id, 1);
        assert!(caps.is_empty());
        let (id, caps) = found(trie.lookup(Some(Method::Get), "/users/42", &accept_all));
        assert_eq!(id, 0);
        assert_eq!(caps, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn parameter_beats_wildcard_and_wildcard_takes_the_rest() {
        let trie = trie_with(&[(Method::Get, "/files/:name/meta"), (Method::Get, "/files/*path")]);
        let (id, _) = found(trie.lookup(Some(Method::Get), "/files/a/meta", &accept_all));
        assert_eq!(id, 0);
        let (id, caps) = found(trie.lookup(Some(Method::Get), "/files/a/b/c.txt", &accept_all));
        assert_eq!(id, 1);
        assert_eq!(caps, vec![("path".to_string(), "a/b/c.txt".to_string())]);
    }

    #[test]
    fn wildcard_needs_a_non_empty_remainder() {
        let trie = trie_with(&[(Method::Get, "/static/*")]);
        assert!(matches!(
            trie.lookup(Some(Method::Get), "/static/", &accept_all),
            TrieLookup::Missing
        ));
        let (_, caps) = found(trie.lookup(Some(Method::Get), "/static/app.js", &accept_all));
        assert_eq!(caps, vec![(WILDCARD_KEY.to_string(), "app.js".to_string())]);
    }

    #[test]
    fn rejected_candidate_backtracks_to_the_next_branch() {
        let trie = trie_with(&[(Method::Get, "/items/:id/x"), (Method::Get, "/items/*rest")]);
        let digits_only = |id: RouteId, caps: &Captures<'_>| {
            id != 0 || caps.iter().all(|(_, v)| v.bytes().all(|b| b.is_ascii_digit()))
        };
        let (id, _) = found(trie.lookup(Some(Method::Get), "/items/12/x", &digits_only));
        assert_eq!(id, 0);
        let (id, caps) = found(trie.lookup(Some(Method::Get), "/items/ab/x", &digits_only));
        assert_eq!(id, 1);
        assert_eq!(caps, vec![("rest".to_string(), "ab/x".to_string())]);
    }

    #[test]
    fn method_mismatch_lists_allowed_methods() {
        let trie = trie_with(&[(Method::Get, "/a"), (Method::Post, "/a")]);
        match trie.lookup(Some(Method::Delete), "/a", &accept_all) {
            TrieLookup::MethodMismatch(allowed) => {
                assert_eq!(allowed.to_header_value(), "GET, POST");
            }
            other => panic!("expected method mismatch, got {other:?}"),
        }
        assert!(matches!(
            trie.lookup(None, "/a", &accept_all),
            TrieLookup::MethodMismatch(_)
        ));
        assert!(matches!(
            trie.lookup(Some(Method::Get), "/b", &accept_all),
            TrieLookup::Missing
        ));
    }

    #[test]
    fn conflicts_are_detected_before_insert() {
        let trie = trie_with(&[(Method::Get, "/users/:id")]);
        let clash = parse_pattern("/users/:user_id/posts").unwrap();
        assert!(trie.find_conflict(Method::Get, &clash).is_some());
        let same = parse_pattern("/users/:id").unwrap();
        assert!(trie.find_conflict(Method::Get, &same).is_some());
        assert!(trie.find_conflict(Method::Post, &same).is_none());
        // the catch-all sits below the parameter in precedence
        let catch_all = parse_pattern("/users/*").unwrap();
        assert!(trie.find_conflict(Method::Get, &catch_all).is_none());
        assert!(trie.find_conflict(Method::Put, &catch_all).is_none());
    }

    #[test]
    fn literal_param_and_catch_all_siblings_coexist() {
        let trie = trie_with(&[
            (Method::Get, "/files/readme"),
            (Method::Get, "/files/:name"),
            (Method::Get, "/files/*path"),
        ]);
        let literal = parse_pattern("/files/license").unwrap();
        assert!(trie.find_conflict(Method::Get, &literal).is_none());

        let (id, caps) = found(trie.lookup(Some(Method::Get), "/files/readme", &accept_all));
        assert_eq!((id, caps.len()), (0, 0));
        let (id, _) = found(trie.lookup(Some(Method::Get), "/files/notes", &accept_all));
        assert_eq!(id, 1);
        let (id, caps) = found(trie.lookup(Some(Method::Get), "/files/a/b", &accept_all));
        assert_eq!(id, 2);
        assert_eq!(caps, vec![("path".to_string(), "a/b".to_string())]);
    }

    #[test]
    fn only_a_second_catch_all_conflicts() {
        let trie = trie_with(&[(Method::Get, "/files/readme"), (Method::Get, "/files/*")]);

        let same = parse_pattern("/files/*").unwrap();
        assert_eq!(
            trie.find_conflict(Method::Get, &same).as_deref(),
            Some("route already registered")
        );
        assert!(trie.find_conflict(Method::Post, &same).is_none());

        let renamed = parse_pattern("/files/*path").unwrap();
        assert_eq!(
            trie.find_conflict(Method::Post, &renamed).as_deref(),
            Some("catch-all '*path' conflicts with existing '*' at the same position")
        );
    }

    #[test]
    fn trailing_slash_is_not_normalized() {
        let trie = trie_with(&[(Method::Get, "/users")]);
        assert!(matches!(
            trie.lookup(Some(Method::Get), "/users/", &accept_all),
            TrieLookup::Missing
        ));
        assert!(matches!(
            trie.lookup(Some(Method::Get), "/users", &accept_all),
            TrieLookup::Found(..)
        ));
    }

    #[test]
    fn root_route() {
        let trie = trie_with(&[(Method::Get, "/")]);
        assert!(matches!(
            trie.lookup(Some(Method::Get), "/", &accept_all),
            TrieLookup::Found(0, _)
        ));
        assert!(matches!(
            trie.lookup(Some(Method::Get), "", &accept_all),
            TrieLookup::Missing
        ));
    }
}
