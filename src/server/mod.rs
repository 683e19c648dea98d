pub mod api;
pub mod middleware;

use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use axum::Router;
use log::{ error, info, warn };

pub use api::{ router, AppState };

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = resolve(&self.addr).await?;
        let app = router(self.state.clone());

        if self.args.enable_tls {
            match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    return self.serve_tls(addr, app, cert_path, key_path).await;
                }
                (Some(_), None) | (None, Some(_)) => {
                    error!(
                        "Both --tls-cert-path and --tls-key-path must be provided to enable TLS."
                    );
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            }
        }

        warn!("TLS not enabled. Running plain HTTP server.");
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal()).await?;
        info!("HTTP server stopped");
        Ok(())
    }

    async fn serve_tls(
        &self,
        addr: SocketAddr,
        app: Router,
        cert_path: &str,
        key_path: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig
            ::from_pem_file(cert_path, key_path).await
            .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(None);
        });

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service()).await?;
        info!("HTTPS server stopped");
        Ok(())
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr, Box<dyn Error + Send + Sync>> {
    tokio::net
        ::lookup_host(addr).await
        .map_err(|e| format!("Invalid server address '{}': {}", addr, e))?
        .next()
        .ok_or_else(|| format!("Server address '{}' did not resolve", addr).into())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
