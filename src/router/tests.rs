use std::sync::{Arc, Mutex};

use http::Method as HttpMethod;

use super::bloom::PathHash;
use super::radix::parse_pattern;
use super::table::RouteTable;
use super::{Handler, Method, MethodSet, Route, Router};
use crate::context::Context;
use crate::error::{MatchError, RegistrationError};
use crate::middleware::Next;
use crate::runtime_config::RouterConfig;
use crate::server::{CapturedResponse, Request, Response};
use crate::versioning::{VersionConfig, VersionStrategy};

fn noop(_ctx: &mut Context) {}

fn handler_for(router: &Router, method: HttpMethod, path: &str) -> Result<String, MatchError> {
    router
        .match_route(method, path)
        .map(|m| m.handler_name().to_string())
}

fn serve(router: &Router, req: Request) -> Response {
    let mut out = CapturedResponse::new();
    router.serve(req, &mut out);
    out.take().unwrap()
}

#[test]
fn test_root_path() {
    let mut router = Router::default();
    let _ = router.get("/", noop).unwrap().name("root");
    router.freeze();
    assert_eq!(handler_for(&router, HttpMethod::GET, "/").unwrap(), "root");
    assert_eq!(
        handler_for(&router, HttpMethod::GET, "/x"),
        Err(MatchError::NotFound)
    );
}

#[test]
fn test_literal_beats_param_beats_wildcard() {
    let mut router = Router::default();
    let _ = router.get("/files/readme", noop).unwrap().name("literal");
    let _ = router.get("/files/:name", noop).unwrap().name("param");
    let _ = router.get("/files/*path", noop).unwrap().name("wildcard");
    router.freeze();

    assert_eq!(handler_for(&router, HttpMethod::GET, "/files/readme").unwrap(), "literal");
    assert_eq!(handler_for(&router, HttpMethod::GET, "/files/notes").unwrap(), "param");

    let found = router.match_route(HttpMethod::GET, "/files/a/b/c").unwrap();
    assert_eq!(found.handler_name(), "wildcard");
    assert_eq!(found.get_param("path"), Some("a/b/c"));
}

#[test]
fn test_constraint_rejection_backtracks_to_wildcard() {
    let mut router = Router::default();
    let _ = router.get("/items/:id", noop).unwrap().where_int("id").name("by_id");
    let _ = router.get("/items/*", noop).unwrap().name("rest");
    router.freeze();

    assert_eq!(handler_for(&router, HttpMethod::GET, "/items/7").unwrap(), "by_id");
    let found = router.match_route(HttpMethod::GET, "/items/seven").unwrap();
    assert_eq!(found.handler_name(), "rest");
    assert_eq!(found.get_param(super::WILDCARD_KEY), Some("seven"));
}

#[test]
fn test_trailing_slash_is_distinct() {
    let mut router = Router::default();
    let _ = router.get("/users", noop).unwrap().name("no_slash");
    router.freeze();
    assert!(router.match_route(HttpMethod::GET, "/users").is_ok());
    assert_eq!(
        router.match_route(HttpMethod::GET, "/users/").err(),
        Some(MatchError::NotFound)
    );
}

#[test]
fn test_method_not_allowed_ignores_rejecting_constraints() {
    let mut router = Router::default();
    let _ = router.get("/orders/:id", noop).unwrap().where_int("id");
    let _ = router.put("/orders/:id", noop).unwrap().where_uuid("id");
    router.freeze();

    let err = router.match_route(HttpMethod::DELETE, "/orders/12").err();
    assert_eq!(
        err,
        Some(MatchError::MethodNotAllowed {
            allowed: [Method::Get].into_iter().collect::<MethodSet>()
        })
    );
}

#[test]
fn test_unroutable_method_reports_allowed_set() {
    let mut router = Router::default();
    let _ = router.get("/ping", noop).unwrap();
    router.freeze();
    match router.match_route(HttpMethod::TRACE, "/ping") {
        Err(MatchError::MethodNotAllowed { allowed }) => assert!(allowed.contains(Method::Get)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_conflicting_param_names_rejected() {
    let mut router = Router::default();
    router.get("/users/:id", noop).unwrap();
    let err = router.get("/users/:name/posts", noop).err().unwrap();
    assert!(matches!(err, RegistrationError::Conflict { .. }), "{err}");

    router.post("/users/:id", noop).unwrap();
    let err = router.get("/users/:id", noop).err().unwrap();
    assert!(matches!(err, RegistrationError::Conflict { .. }));
}

#[test]
fn test_catch_all_next_to_param_is_not_a_conflict() {
    let mut router = Router::default();
    router.get("/assets/:file", noop).unwrap();
    router.get("/assets/*", noop).unwrap();
    router.get("/assets/logo.svg", noop).unwrap();

    let err = router.get("/assets/*", noop).err().unwrap();
    match err {
        RegistrationError::Conflict { reason, .. } => assert_eq!(reason, "route already registered"),
        other => panic!("unexpected {other:?}"),
    }
    let err = router.post("/assets/*rest", noop).err().unwrap();
    match err {
        RegistrationError::Conflict { reason, .. } => assert!(
            reason.contains("'*rest'") && reason.contains("existing '*'"),
            "{reason}"
        ),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_bloom_never_rejects_registered_static_paths() {
    let mut router = Router::default();
    let mut paths = Vec::new();
    for i in 0..200 {
        let path = format!("/static/page{i}");
        router.get(&path, noop).unwrap();
        paths.push(path);
    }
    router.freeze();
    for path in &paths {
        assert!(router.match_route(HttpMethod::GET, path).is_ok(), "{path}");
    }
    for i in 200..400 {
        assert_eq!(
            router.match_route(HttpMethod::GET, &format!("/static/page{i}")).err(),
            Some(MatchError::NotFound)
        );
    }
}

#[test]
fn test_table_bloom_contains_only_static_patterns() {
    let route = |pattern: &str| {
        let handler: Handler = Arc::new(noop);
        Route::new(
            Method::Get,
            pattern,
            parse_pattern(pattern).unwrap(),
            handler,
            Arc::from("h"),
            None,
            Vec::new(),
        )
    };
    let mut table = RouteTable::new(256, 3, true);
    table.insert(route("/health")).unwrap();
    table.insert(route("/users/:id")).unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.bloom().might_contain(PathHash::of("/health")));
    assert_eq!(table.bloom().len(), 1);
    // dynamic root: the prefilter is skipped for /users/...
    assert!(table.resolve(Some(Method::Get), "/users/1").is_ok());
    assert!(matches!(
        table.resolve(Some(Method::Get), "/healthz"),
        Err(MatchError::NotFound)
    ));
}

#[test]
fn test_dynamic_route_disables_bloom_for_its_root() {
    let mut router = Router::default();
    router.get("/health", noop).unwrap();
    router.get("/users/:id", noop).unwrap();
    router.freeze();
    // "/users/..." is never answered by the prefilter alone
    assert!(router.match_route(HttpMethod::GET, "/users/9").is_ok());
    assert!(router.match_route(HttpMethod::GET, "/health").is_ok());
}

fn versioned_router(config: RouterConfig) -> Router {
    let mut router = Router::new(config);
    let _ = router.get("/users", noop).unwrap().name("base_users");
    let _ = router.get("/status", noop).unwrap().name("status");
    {
        let mut v1 = router.version("v1");
        let _ = v1.get("/users", noop).unwrap().name("v1_users");
    }
    {
        let mut v2 = router.version("v2");
        let _ = v2.get("/users", noop).unwrap().name("v2_users");
        let _ = v2.get("/users/:id", noop).unwrap().name("v2_user");
    }
    router.freeze();
    router
}

#[test]
fn test_version_from_path_header_and_query() {
    let router = versioned_router(RouterConfig::default());

    let found = router.match_route(HttpMethod::GET, "/v2/users/5").unwrap();
    assert_eq!(found.handler_name(), "v2_user");
    assert_eq!(found.version.as_deref(), Some("v2"));

    let req = Request::new(HttpMethod::GET, "/users").with_header("X-API-Version", "v1");
    assert_eq!(router.resolve(&req).unwrap().handler_name(), "v1_users");

    let req = Request::new(HttpMethod::GET, "/users?version=2");
    assert_eq!(router.resolve(&req).unwrap().handler_name(), "v2_users");

    assert_eq!(handler_for(&router, HttpMethod::GET, "/users").unwrap(), "base_users");
}

#[test]
fn test_unknown_version_is_distinct_from_not_found() {
    let router = versioned_router(RouterConfig::default());
    assert_eq!(
        router.match_route(HttpMethod::GET, "/v9/users").err(),
        Some(MatchError::UnknownVersion {
            version: "v9".to_string()
        })
    );
    let req = Request::new(HttpMethod::GET, "/users").with_header("X-API-Version", "v3");
    assert!(matches!(
        router.resolve(&req),
        Err(MatchError::UnknownVersion { .. })
    ));
}

#[test]
fn test_versioned_request_falls_back_to_unversioned_routes() {
    let router = versioned_router(RouterConfig::default());
    let req = Request::new(HttpMethod::GET, "/status").with_header("X-API-Version", "v1");
    let found = router.resolve(&req).unwrap();
    assert_eq!(found.handler_name(), "status");
    assert_eq!(found.version, None);
}

#[test]
fn test_default_version_applies_when_nothing_detected() {
    let mut config = RouterConfig::default();
    config.versioning = VersionConfig::new()
        .strategies([VersionStrategy::Header])
        .default_version("v2");
    let router = versioned_router(config);
    assert_eq!(handler_for(&router, HttpMethod::GET, "/users").unwrap(), "v2_users");
    // path strategy disabled: the segment is an ordinary literal
    assert_eq!(
        router.match_route(HttpMethod::GET, "/v1/users").err(),
        Some(MatchError::NotFound)
    );
}

#[test]
fn test_freeze_builds_chains_in_router_group_route_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let record = |tag: &'static str| {
        let order = Arc::clone(&order);
        move |ctx: &mut Context, next: Next<'_>| {
            order.lock().unwrap().push(tag);
            next.run(ctx);
        }
    };

    let mut router = Router::default();
    {
        let mut api = router.group("/api").with(record("group"));
        let _ = api.get("/x", noop).unwrap().with(record("route"));
    }
    router.use_middleware(record("router")).unwrap();
    router.freeze();

    let res = serve(&router, Request::new(HttpMethod::GET, "/api/x"));
    assert_eq!(res.status, http::StatusCode::OK);
    assert_eq!(*order.lock().unwrap(), vec!["router", "group", "route"]);
}

#[test]
fn test_settings_after_freeze_are_rejected() {
    let mut router = Router::default();
    router.freeze();
    assert!(matches!(
        router.use_middleware(|ctx: &mut Context, next: Next<'_>| next.run(ctx)),
        Err(RegistrationError::AlreadyFrozenSetting { .. })
    ));
    assert!(router.fallback(noop).is_err());
    assert!(matches!(
        router.get("/late", noop),
        Err(RegistrationError::AlreadyFrozen { .. })
    ));
    assert!(router.version("v1").get("/late", noop).is_err());
    assert!(router.routes().is_empty());
}

#[test]
fn test_serve_before_freeze_is_unavailable() {
    let mut router = Router::default();
    router.get("/ready", noop).unwrap();
    let res = serve(&router, Request::new(HttpMethod::GET, "/ready"));
    assert_eq!(res.status, http::StatusCode::SERVICE_UNAVAILABLE);
}
