use crate::service::ContractService;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("a contract bridge is already installed for this process")]
pub struct AlreadyInstalled;

/// Holds the one bridge service of a process.
///
/// The service is built explicitly by the host's startup code and installed
/// once; the first install wins and later ones are rejected.
#[derive(Default)]
pub struct BridgeRegistry {
    slot: OnceLock<Arc<ContractService>>,
}

impl BridgeRegistry {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    pub fn install(
        &self,
        service: Arc<ContractService>,
    ) -> Result<Arc<ContractService>, AlreadyInstalled> {
        let mut installed = false;
        let current = self.slot.get_or_init(|| {
            installed = true;
            service
        });

        if installed {
            Ok(current.clone())
        } else {
            tracing::warn!("Ignoring duplicate contract bridge instance");
            Err(AlreadyInstalled)
        }
    }

    pub fn get(&self) -> Option<Arc<ContractService>> {
        self.slot.get().cloned()
    }
}

static GLOBAL: BridgeRegistry = BridgeRegistry::new();

/// Install the process-wide bridge.
pub fn install_global(
    service: Arc<ContractService>,
) -> Result<Arc<ContractService>, AlreadyInstalled> {
    GLOBAL.install(service)
}

pub fn global() -> Option<Arc<ContractService>> {
    GLOBAL.get()
}
