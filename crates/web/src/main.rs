//! AI Writer in the browser: a small local HTTP server for the editor page
//! and its JSON API.

mod routes;

use anyhow::{anyhow, Context, Result};
use routes::{handle, ServerState};
use shared::ConfigStore;
use std::io::Read;
use std::thread;

const DEFAULT_ADDR: &str = "127.0.0.1:5000";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = ConfigStore::default_location().context("cannot locate the config file")?;
    tracing::info!(path = %store.path().display(), "using config");
    let state = ServerState { store };

    let addr = std::env::var("AI_WRITER_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| anyhow!("could not listen on {}: {}", addr, e))?;
    let page = format!("http://{}", addr);
    tracing::info!(url = %page, "AI Writer web server listening");

    if std::env::var_os("AI_WRITER_NO_BROWSER").is_none() {
        if let Err(e) = open::that(&page) {
            tracing::warn!(error = %e, "could not open a browser");
        }
    }

    for request in server.incoming_requests() {
        let state = state.clone();
        thread::spawn(move || serve(request, &state));
    }
    Ok(())
}

fn serve(mut request: tiny_http::Request, state: &ServerState) {
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        tracing::warn!(error = %e, "could not read request body");
    }
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();
    let reply = handle(state, &method, &url, &body);

    let mut response = tiny_http::Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        tracing::debug!(error = %e, url, "client went away");
    }
}
