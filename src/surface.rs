//! Exposure surface - where generated clients are published.
//!
//! The host environment decides how a client mapping becomes reachable from
//! restricted code; this crate only requires a [`Surface`] it can install
//! into. [`LocalSurface`] is the in-process implementation: a root-name
//! keyed registry of installed clients, enough for same-process hosting
//! and for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::Client;

/// The restricted execution surface a client mapping is installed into.
pub trait Surface: Send + Sync {
    /// Install (or re-install) the client under the given root name.
    fn install(&self, root: &str, client: Client);
}

/// In-process surface keeping installed clients in a map.
#[derive(Default)]
pub struct LocalSurface {
    installed: Mutex<HashMap<String, Arc<Client>>>,
}

impl LocalSurface {
    /// Create a new empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the client installed under a root name.
    pub fn get(&self, root: &str) -> Option<Arc<Client>> {
        self.lock().get(root).cloned()
    }

    /// Root names with an installed client.
    pub fn roots(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Client>>> {
        self.installed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Surface for LocalSurface {
    fn install(&self, root: &str, client: Client) {
        self.lock().insert(root.to_string(), Arc::new(client));
    }
}
