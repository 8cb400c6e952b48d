use crate::client::LogClient;
use crate::error::InitError;
use crate::layer::ShipperLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Settings for the globally installed subscriber.
///
/// **Fields**
/// - `max_level`: least severe level that is forwarded to the client.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is added
///   next to the [`ShipperLayer`] so events are also printed locally.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: Level,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: Level::INFO,
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that ships events through `client`.
///
/// **Parameters**
/// - `client`: [`LogClient`] receiving one record per event.
/// - `config`: [`LayerConfig`] controlling level and local output.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config(client: LogClient, config: LayerConfig) -> Result<(), InitError> {
    let layer = ShipperLayer::new(client).with_max_level(config.max_level);

    // The two subscriber stacks have different types, so each branch installs
    // its own.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Install the global subscriber with [`LayerConfig::default`].
pub fn init_tracing(client: LogClient) -> Result<(), InitError> {
    init_tracing_with_config(client, LayerConfig::default())
}
