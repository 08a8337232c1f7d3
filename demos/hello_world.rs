//! Minimal server showing routes, params, a route bundle and middleware.
//!
//! ```text
//! RUST_LOG=debug cargo run --example hello_world
//! curl http://127.0.0.1:3000/users/42
//! curl http://127.0.0.1:3000/api/files/docs/readme.txt
//! ```

use rttp_router::middleware::{BodyLimit, LoggerMiddleware, Next};
use rttp_router::router::RoutesWrapper;
use rttp_router::security::CorsMiddleware;
use rttp_router::server::{Server, ServerConfig};
use rttp_router::{Context, Response, Result, Router, StatusCode};
use serde_json::json;
use tracing_subscriber::EnvFilter;

async fn hello(_ctx: Context) -> Result<Response> {
    Ok(Response::new(StatusCode::Ok).body("Hello, World!"))
}

async fn show_user(ctx: Context) -> Result<Response> {
    let id = ctx.params().get("id").unwrap_or_default();
    Response::new(StatusCode::Ok).json(&json!({ "id": id }))
}

async fn show_file(ctx: Context) -> Result<Response> {
    Response::new(StatusCode::Ok).json(ctx.params())
}

async fn create_note(ctx: Context) -> Result<Response> {
    let bytes = ctx.request().body().len();
    Response::new(StatusCode::Created).json(&json!({ "received": bytes }))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api = RoutesWrapper::new().inject(|r| {
        r.get("/files/[...path]", show_file)?
            .post("/notes", create_note)?
            .middleware("/notes", "64kb".parse::<BodyLimit>()?, false)?;
        Ok(())
    })?;

    let mut builder = Router::builder();
    builder
        .get("/", hello)?
        .get("/users/[id]", show_user)?
        .inject_wrapper("/api", &api)?
        .switch_to_ws("/ws")?
        .middleware("/api", CorsMiddleware::new(), false)?
        .middleware(
            "/",
            |ctx: Context, next: Next| async move {
                let response = next.run(ctx).await;
                response.map(|r| r.header("X-Powered-By", "rttp"))
            },
            true,
        )?
        .middleware("/", LoggerMiddleware, true)?;

    let server = Server::bind(ServerConfig::from_env()).await?;
    println!("Listening on http://{}", server.local_addr());
    server.serve(builder.finalize()).await?;
    Ok(())
}
