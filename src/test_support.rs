//! Helpers shared by unit tests: in-process fake panels served by axum.

use axum::Router;
use std::net::SocketAddr;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_panel(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve fake panel");
    });
    format!("http://{}", addr)
}
