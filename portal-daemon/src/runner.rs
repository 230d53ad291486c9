use portal_core::{
    config::PortalConfig,
    disabler::ScriptDisabler,
    frontends::create_frontend,
    probe::PingProbe,
    traits::NetworkControl,
    verification_log::FileVerificationLog,
    verifier::{Verifier, VerifierSettings},
    web_server::{self, AppState, RedirectPolicy},
};
use std::sync::Arc;

#[cfg(feature = "backend_mock")]
fn create_control(_config: &PortalConfig) -> Arc<dyn NetworkControl> {
    tracing::info!("🤖 Backend: mock network control");
    Arc::new(portal_core::backends::mock::MockControl::new())
}

#[cfg(not(feature = "backend_mock"))]
fn create_control(config: &PortalConfig) -> Arc<dyn NetworkControl> {
    tracing::info!("📡 Backend: nmcli on {}", config.network.interface_name);
    Arc::new(portal_core::backends::nmcli::NmcliControl::new(&config.network))
}

/// 组装各组件并运行 Web 服务器，直到收到退出信号
pub async fn run_portal(config: PortalConfig) -> anyhow::Result<()> {
    let control = create_control(&config);

    let disabler = ScriptDisabler::new(&config.disabler);
    tracing::info!("Portal disable script: {}", disabler.script().display());

    let log = FileVerificationLog::new(&config.verifier.log_path);
    tracing::info!("Verification log: {}", log.path().display());

    let verifier = Arc::new(Verifier::new(
        Arc::new(PingProbe::new(&config.probe)),
        Arc::new(disabler),
        Arc::new(log),
        VerifierSettings::from(&config.verifier),
    ));

    let state = Arc::new(AppState {
        control,
        verifier,
        frontend: create_frontend(config.server.assets_dir.as_deref()),
        redirect: RedirectPolicy::from_config(&config.portal),
    });

    tracing::info!(
        "🚀 Captive portal at {} (or port {} on the access point address)",
        config.portal.redirect_url(),
        config.server.port
    );
    web_server::run_server(config.server.bind_addr(), state, shutdown_signal()).await?;

    tracing::info!("🛑 Shutting down. Verifications still in flight are abandoned.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
