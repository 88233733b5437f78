// src/supervisor/artifact.rs

//! Post-run artifact retrieval.

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::RunError;
use crate::fs::FileSystem;

/// Line emitted right before the artifact content. Kept in the same
/// language as [`COST_REPORT`]; both are fixed report text.
pub const RESULTS_HEADER: &str = "\n--- Resultados del procesamiento ---\n";

/// Static cost report appended after every successful run.
pub const COST_REPORT: &str = "
--- Costos AWS ---

Instancia: c6g.4xlarge
Tenancy: Shared Instances
Sistema Operativo: Linux
EBS Storage: 30 GB
Transferencia de datos: 12 GB/mes
Monitoreo: Desactivado
Capacidad de procesamiento: Lunes a Viernes, 8 horas diarias

| Concepto           | Costo (USD) |
| ------------------ | ----------- |
| Upfront cost anual | $7,541.28   |
| Costo mensual      | $628.44     |

Detalles adicionales:
- Workload: Diario (lunes a viernes)
- Horario pico: 8 horas por d\u{ed}a
- Pricing: Amazon EC2 Savings Plans 3yr All Upfront
- DT Inbound: 0 TB/mes
- DT Outbound Internet: 12 GB/mes
- DT Intra-Region: 0 TB/mes
";

/// Where the results artifact lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// File name, relative to the working directory.
    pub file: String,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            file: "results.txt".to_string(),
            poll_attempts: 30,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Wait for the artifact at `path` to appear and read it.
///
/// Checks once per interval for `poll_attempts` intervals, then one last
/// time. The content is returned exactly as read.
pub async fn retrieve_artifact(
    fs: &dyn FileSystem,
    path: &Path,
    settings: &ArtifactSettings,
) -> Result<String, RunError> {
    for attempt in 0..settings.poll_attempts {
        if fs.exists(path) {
            debug!(?path, attempt, "results artifact found");
            return read_artifact(fs, path, settings);
        }
        sleep(settings.poll_interval).await;
    }

    if fs.exists(path) {
        return read_artifact(fs, path, settings);
    }

    warn!(
        ?path,
        attempts = settings.poll_attempts,
        "results artifact did not appear in time"
    );
    Err(RunError::ArtifactTimeout {
        file: settings.file.clone(),
        attempts: settings.poll_attempts,
    })
}

fn read_artifact(
    fs: &dyn FileSystem,
    path: &Path,
    settings: &ArtifactSettings,
) -> Result<String, RunError> {
    fs.read_to_string(path).map_err(|e| {
        warn!(?path, error = %e, "failed to read results artifact");
        RunError::ArtifactRead {
            file: settings.file.clone(),
            reason: format!("{e:#}"),
        }
    })
}
