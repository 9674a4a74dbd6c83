#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use http::Method;
use sealroute::context::Context;
use sealroute::router::Router;
use sealroute::server::{CapturedResponse, Request, Response};
use tracing_subscriber::fmt::MakeWriter;

pub fn noop(_ctx: &mut Context) {}

/// Handler that answers with its own name as plain text.
pub fn named(name: &'static str) -> impl Fn(&mut Context) + Send + Sync + 'static {
    move |ctx: &mut Context| ctx.text(http::StatusCode::OK, name)
}

pub fn serve(router: &Router, req: Request) -> Response {
    let mut out = CapturedResponse::new();
    router.serve(req, &mut out);
    out.take().expect("serve always sends a response")
}

pub fn get(router: &Router, path: &str) -> Response {
    serve(router, Request::new(Method::GET, path))
}

/// Shared order log for middleware tests.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// In-memory log sink for a scoped `tracing` subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Run `f` with a JSON subscriber writing into this buffer.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(Arc::clone(&self.0))
    }
}
