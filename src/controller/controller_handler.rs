use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};

use crate::configuration::config::Config;
use crate::data_capture::signature_catalog::SignatureCatalog;
use crate::error_handling::types::*;
use crate::lobby::{FallbackDirectory, FileLobbyStore, LobbyDirectory};
use crate::reporting::summary_reporter::SummaryReport;
use crate::session_management::CaptureSession;
use crate::storage::file_storage::FileExportStorage;

/// How many lobbies are listed at start-up.
const LOBBY_PREVIEW: usize = 3;

/// Wires the configuration into one capture session and drives it from start to summary.
pub struct Controller {
    config: Config,
    session: CaptureSession,
    lobbies: Option<FallbackDirectory>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;

        let catalog = SignatureCatalog::with_extra(&config.signatures)?;
        info!(
            "Signature catalog loaded with {} entries",
            catalog.len()
        );
        let storage = FileExportStorage::new(&config.export_dir);
        let session = CaptureSession::new(&config, Arc::new(catalog), Arc::new(storage));

        let lobbies = if config.lobby_sources.is_empty() {
            None
        } else {
            let sources = config
                .lobby_sources
                .iter()
                .map(|p| Box::new(FileLobbyStore::new(p)) as Box<dyn LobbyDirectory>)
                .collect();
            Some(FallbackDirectory::new(sources))
        };

        Ok(Self {
            config,
            session,
            lobbies,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Captures until Ctrl+C, then stops the session and prints the summary.
    pub async fn run(&mut self) -> Result<SummaryReport, ControllerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl+C: {}", e);
            }
        })
        .await
    }

    /// Captures until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<SummaryReport, ControllerError>
    where
        F: Future<Output = ()>,
    {
        self.log_lobbies();

        for listener in &self.config.listeners {
            info!("Listening on {}", listener);
        }
        self.session.start()?;
        info!("Start PES 2021 and try to reach the online menu. Press Ctrl+C to stop.");

        shutdown.await;
        info!("Stopping capture");

        let report = self.session.stop().await?;
        println!("{}", report);
        Ok(report)
    }

    fn log_lobbies(&self) {
        let Some(directory) = &self.lobbies else {
            return;
        };
        match directory.list_lobbies() {
            Ok(lobbies) => {
                info!("Lobby server advertises {} lobbies", lobbies.len());
                for lobby in lobbies.iter().take(LOBBY_PREVIEW) {
                    info!("   - {}", lobby);
                }
            }
            Err(e) => warn!("Could not list lobbies: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::{ListenerConfig, Protocol, SignatureConfig};
    use crate::session_management::SessionState;
    use serial_test::serial;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let port = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Config {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listeners: vec![ListenerConfig::new("stun", port, Protocol::UDP)],
            poll_timeout_ms: 100,
            export_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut bad = config(&dir);
        bad.listeners.clear();
        assert!(matches!(
            Controller::new(bad),
            Err(ControllerError::ConfigurationError(_))
        ));

        let mut bad_signature = config(&dir);
        bad_signature.signatures.push(SignatureConfig {
            label: "Broken".into(),
            text: None,
            hex: Some("zz".into()),
        });
        assert!(Controller::new(bad_signature).is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_run_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let lobby_file = dir.path().join("lobbies.json");
        std::fs::write(&lobby_file, r#"[{"lobby_name": "Europe 1"}]"#).unwrap();
        let mut config = config(&dir);
        config.lobby_sources = vec![dir.path().join("missing.json"), lobby_file];

        let mut controller = Controller::new(config).unwrap();
        let report = controller
            .run_until(tokio::time::sleep(Duration::from_millis(150)))
            .await
            .unwrap();

        assert_eq!(controller.session().state(), SessionState::Stopped);
        assert_eq!(report.total_records, 0);
        assert_eq!(report.listeners.len(), 1);
    }
}
