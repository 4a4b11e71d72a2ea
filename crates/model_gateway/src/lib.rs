#![deny(unused)]
//! Model gateway for Taskforge.
//!
//! Wraps Rig provider clients behind the engine's [`ModelGateway`] contract.

pub mod rig_client;

pub use rig_client::{RigGateway, RigGatewayConfig, RigProvider};

use std::sync::Arc;
use taskforge_core::config::{ModelAssignment, ModelAssignments};
use taskforge_core::traits::ModelGateway;
use taskforge_core::{Error, Result};

/// Build a gateway from one model assignment.
pub fn gateway_for(assignment: &ModelAssignment) -> Result<Arc<dyn ModelGateway>> {
    let provider = match assignment.provider.as_str() {
        "openai" => RigProvider::OpenAI,
        "anthropic" => RigProvider::Anthropic,
        other => {
            return Err(Error::gateway(format!("unknown model provider: {other}")));
        }
    };
    let mut config = RigGatewayConfig::new(provider, &assignment.model);
    config.max_tokens = assignment.max_tokens;
    Ok(Arc::new(RigGateway::new(config)))
}

/// Build the (chat, bulk) gateway pair from the configured assignments.
pub fn gateways_for(assignments: &ModelAssignments) -> Result<(Arc<dyn ModelGateway>, Arc<dyn ModelGateway>)> {
    Ok((gateway_for(&assignments.chat)?, gateway_for(&assignments.bulk)?))
}
