use std::io::{Cursor, Read};

use http::{Method, StatusCode};
use sealroute::context::Context;
use sealroute::echo::echo_handler;
use sealroute::router::Router;
use sealroute::server::{Request, Response};
use sealroute::RequestId;

mod common;
use common::{get, serve};

fn app() -> Router {
    let mut router = Router::default();
    router.get("/echo/:name", echo_handler).unwrap().name("echo");
    router
        .post("/upload", |ctx: &mut Context| {
            let mut body = String::new();
            if let Some(mut reader) = ctx.take_body() {
                let _ = reader.read_to_string(&mut body);
            }
            ctx.text(StatusCode::CREATED, body.to_uppercase());
        })
        .unwrap();
    router
        .get("/trace", |ctx: &mut Context| {
            let body = serde_json::json!({
                "trace_id": ctx.trace_id(),
                "span_id": ctx.span_id(),
            });
            ctx.json(StatusCode::OK, &body);
        })
        .unwrap();
    router.freeze();
    router
}

#[test]
fn test_not_found_has_json_error_body() {
    let res = get(&app(), "/nothing/here");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.get_header("content-type"), Some("application/json"));
    assert_eq!(res.body_json().unwrap()["error"], "Not Found");
}

#[test]
fn test_method_not_allowed_lists_allowed_methods() {
    let res = serve(&app(), Request::new(Method::PUT, "/upload"));
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.get_header("allow"), Some("POST"));
}

#[test]
fn test_request_id_is_propagated_or_generated() {
    let router = app();
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let res = serve(
        &router,
        Request::new(Method::GET, "/echo/x").with_header("X-Request-Id", id),
    );
    assert_eq!(res.get_header("x-request-id"), Some(id));
    assert_eq!(res.body_json().unwrap()["request_id"], id);

    let res = serve(
        &router,
        Request::new(Method::GET, "/echo/x").with_header("X-Request-Id", "not-a-ulid"),
    );
    let generated = res.get_header("x-request-id").unwrap();
    assert_ne!(generated, "not-a-ulid");
    assert!(generated.parse::<RequestId>().is_ok());

    // error responses carry one too
    assert!(get(&router, "/missing").get_header("x-request-id").is_some());
}

#[test]
fn test_traceparent_is_parsed() {
    let res = serve(
        &app(),
        Request::new(Method::GET, "/trace").with_header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ),
    );
    let body = res.body_json().unwrap();
    assert_eq!(body["trace_id"], "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(body["span_id"], "00f067aa0ba902b7");

    let res = serve(
        &app(),
        Request::new(Method::GET, "/trace").with_header("traceparent", "garbage"),
    );
    assert!(res.body_json().unwrap()["trace_id"].is_null());
}

#[test]
fn test_handler_reads_streaming_body() {
    let req = Request::new(Method::POST, "/upload").with_body(Cursor::new(b"hello".to_vec()));
    let res = serve(&app(), req);
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body_str(), Some("HELLO"));
}

#[test]
fn test_echo_reports_params_and_handler() {
    let res = get(&app(), "/echo/world?x=1");
    let body = res.body_json().unwrap();
    assert_eq!(body["params"]["name"], "world");
    assert_eq!(body["handler"], "echo");
    assert_eq!(body["path"], "/echo/world");
}

#[test]
fn test_closure_sink_receives_response() {
    let router = app();
    let mut seen: Vec<Response> = Vec::new();
    router.serve(Request::new(Method::GET, "/echo/a"), &mut |res: Response| seen.push(res));
    router.serve(Request::new(Method::GET, "/nope"), &mut |res: Response| seen.push(res));
    let statuses: Vec<_> = seen.iter().map(|r| r.status).collect();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::NOT_FOUND]);
}

#[test]
fn test_unfrozen_router_answers_503() {
    let mut router = Router::default();
    router.get("/", echo_handler).unwrap();
    let res = get(&router, "/");
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}
