//! Gateway registry
//!
//! Routes an order's payer (id or display name, as entered at intake) to the
//! gateway that serves it. Resolution is case-insensitive with a substring
//! fallback so "Aetna Better Health of Texas" still routes through the
//! Aetna entry. A payer with no route is an expected business outcome, not
//! an error: the orchestrator turns it into an `unsupported_payer` result.

use std::collections::HashMap;
use std::sync::Arc;

use meridian_core::{GatewayRegistry, PayerGateway};

/// Static payer-organization routes applied by [`PayerRegistry::with_default_routes`];
/// every listed organization is served through the Availity gateway.
const DEFAULT_AVAILITY_PAYERS: &[&str] = &[
    "medicare",
    "medicaid",
    "aetna",
    "anthem",
    "cigna",
    "humana",
    "blue cross blue shield",
    "bcbs",
    "unitedhealthcare",
    "uhc",
];

/// Maps payer names/ids to configured gateways
#[derive(Default)]
pub struct PayerRegistry {
    routes: HashMap<String, String>,
    gateways: HashMap<String, Arc<dyn PayerGateway>>,
}

impl PayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its profile id and display name.
    pub fn register(mut self, gateway: Arc<dyn PayerGateway>) -> Self {
        let payer_id = gateway.profile().payer_id.clone();
        self.routes.insert(payer_id.to_lowercase(), payer_id.clone());
        self.routes.insert(gateway.profile().display_name.to_lowercase(), payer_id.clone());
        self.gateways.insert(payer_id, gateway);
        self
    }

    /// Route a payer organization name to a registered gateway.
    pub fn route(mut self, payer_name: &str, gateway_id: &str) -> Self {
        self.routes.insert(payer_name.to_lowercase(), gateway_id.to_string());
        self
    }

    /// Apply the built-in payer-organization routing table.
    pub fn with_default_routes(mut self) -> Self {
        for payer in DEFAULT_AVAILITY_PAYERS {
            self.routes.insert((*payer).to_string(), "availity".to_string());
        }
        self
    }
}

impl GatewayRegistry for PayerRegistry {
    fn resolve_payer_id(&self, payer_name_or_id: &str) -> Option<String> {
        let lowered = payer_name_or_id.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        if let Some(gateway_id) = self.routes.get(&lowered) {
            return Some(gateway_id.clone());
        }

        // substring fallback: "Aetna Better Health" routes via "aetna"
        self.routes
            .iter()
            .find(|(route, _)| lowered.contains(route.as_str()))
            .map(|(_, gateway_id)| gateway_id.clone())
    }

    fn is_supported(&self, payer_id: &str) -> bool {
        self.gateways.contains_key(payer_id)
    }

    fn gateway_for(&self, payer_id: &str) -> Option<Arc<dyn PayerGateway>> {
        self.gateways.get(payer_id).map(Arc::clone)
    }
}
