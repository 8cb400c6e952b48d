use crate::client::LogClient;
use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::record::Data;
use crate::transport::HttpTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Memoized factory of [`LogClient`]s keyed by log name.
///
/// All clients share one configuration and one transport. A global context
/// set on the registry is copied into every client it hands out, and
/// re-applied to existing clients whenever it changes.
///
/// The registry is an ordinary value: build one per process and pass it (or
/// an `Arc` of it) to whatever needs clients.
pub struct ClientRegistry {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    clients: HashMap<String, LogClient>,
    global_context: Data,
}

impl ClientRegistry {
    pub fn new(config: impl Into<Arc<ClientConfig>>, transport: Arc<dyn HttpTransport>) -> Self {
        ClientRegistry {
            config: config.into(),
            transport,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Build a registry that talks HTTP through [`ReqwestTransport`](crate::reqwest_transport::ReqwestTransport).
    #[cfg(feature = "reqwest-transport")]
    pub fn with_reqwest(config: ClientConfig) -> Result<Self, crate::error::TransportError> {
        let transport = crate::reqwest_transport::ReqwestTransport::from_config(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the client for `log_name`, creating it on first use.
    pub fn get_or_create(&self, log_name: &str) -> Result<LogClient, RegistryError> {
        let mut state = self.lock();
        if let Some(client) = state.clients.get(log_name) {
            return Ok(client.clone());
        }
        let client = self.build(log_name, &state.global_context)?;
        state.clients.insert(log_name.to_string(), client.clone());
        Ok(client)
    }

    /// Create the client for `log_name`, failing if one already exists.
    pub fn create(&self, log_name: &str) -> Result<LogClient, RegistryError> {
        let mut state = self.lock();
        if state.clients.contains_key(log_name) {
            return Err(RegistryError::AlreadyExists(log_name.to_string()));
        }
        let client = self.build(log_name, &state.global_context)?;
        state.clients.insert(log_name.to_string(), client.clone());
        Ok(client)
    }

    pub fn get(&self, log_name: &str) -> Option<LogClient> {
        self.lock().clients.get(log_name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().clients.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the global context and copy it into every existing client.
    pub fn set_global_context(&self, context: Data) {
        let mut state = self.lock();
        state.global_context = context;
        for client in state.clients.values() {
            client.set_context(state.global_context.clone());
        }
    }

    pub fn global_context(&self) -> Data {
        self.lock().global_context.clone()
    }

    /// Flush every client once, concurrently.
    pub async fn flush_all(&self) {
        let clients: Vec<LogClient> = self.lock().clients.values().cloned().collect();
        let mut tasks = Vec::with_capacity(clients.len());
        for client in clients {
            tasks.push(tokio::spawn(async move { client.flush().await }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Close and forget every client and clear the global context.
    ///
    /// Returns the total number of pending records discarded by the clients'
    /// close behavior.
    pub async fn reset(&self) -> usize {
        let clients: Vec<LogClient> = {
            let mut state = self.lock();
            state.global_context.clear();
            state.clients.drain().map(|(_, c)| c).collect()
        };
        let mut discarded = 0;
        for client in clients {
            discarded += client.close().await;
        }
        discarded
    }

    fn build(&self, log_name: &str, global_context: &Data) -> Result<LogClient, RegistryError> {
        let client = LogClient::new(log_name, Arc::clone(&self.config), Arc::clone(&self.transport))?;
        if !global_context.is_empty() {
            client.set_context(global_context.clone());
        }
        Ok(client)
    }
}
