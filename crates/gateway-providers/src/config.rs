//! # Provider Configuration
//!
//! Each provider is configured from `{ID}_SECRET_KEY`, `{ID}_PUBLIC_KEY`,
//! `{ID}_BASE_URL` and `{ID}_CHANNELS`, e.g. `PAYSTACK_SECRET_KEY`.
//! A provider without a secret key is left out of the settings.

use crate::ProviderKind;
use gateway_core::{GatewayResult, GatewaySettings, ProviderSettings};
use tracing::{debug, warn};

/// Gateway settings plus every provider found in the environment
pub fn settings_from_env() -> GatewayResult<GatewaySettings> {
    let mut settings = GatewaySettings::from_env()?;

    for kind in ProviderKind::ALL {
        match ProviderSettings::from_env(kind.name(), kind.default_base_url(), kind.default_channels())? {
            Some(provider) => {
                debug!("Loaded {} settings: base_url={}", kind, provider.base_url);
                settings = settings.with_provider(kind.name(), provider);
            }
            None => debug!("{} not configured, skipping", kind),
        }
    }

    if settings.providers.is_empty() {
        warn!("No payment providers configured");
    }

    Ok(settings)
}

/// Fill in default channels for providers configured without any
pub fn apply_default_channels(settings: &mut GatewaySettings) {
    for kind in ProviderKind::ALL {
        if let Some(provider) = settings.providers.get_mut(kind.name()) {
            if provider.channels.is_empty() {
                provider.channels = kind.default_channels().to_vec();
            }
        }
    }
}
