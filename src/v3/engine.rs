//! Engine parameter state.
//!
//! A v3 agent identifies itself by an opaque engine ID and two monotonic
//! counters (boots, time). Discovery obtains all three; every subsequent
//! response refreshes them so keys and IVs stay bound to the agent's
//! current epoch.

use bytes::Bytes;

use crate::error::{DecodeErrorKind, Error, Result};
use crate::v3::UsmSecurityParams;

/// Engine parameters adopted from the remote agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    /// Authoritative engine ID (non-empty after discovery).
    pub engine_id: Bytes,
    /// Engine boot count.
    pub engine_boots: u32,
    /// Engine time at the last exchange.
    pub engine_time: u32,
}

impl EngineState {
    /// Create engine state from received parameters.
    pub fn new(engine_id: Bytes, engine_boots: u32, engine_time: u32) -> Self {
        Self {
            engine_id,
            engine_boots,
            engine_time,
        }
    }

    /// Adopt the parameters reported in a response.
    pub fn adopt(&mut self, params: &UsmSecurityParams) {
        if !params.engine_id.is_empty() {
            self.engine_id = params.engine_id.clone();
        }
        self.engine_boots = params.engine_boots;
        self.engine_time = params.engine_time;
    }
}

/// Extract engine state from a discovery Report's security parameters.
///
/// The Report carries the agent's engine ID, boots, and time in the USM
/// parameters field; an empty engine ID means discovery failed.
pub fn parse_discovery_response(security_params: Bytes) -> Result<EngineState> {
    let params = UsmSecurityParams::decode(security_params)?;

    if params.engine_id.is_empty() {
        return Err(Error::decode(0, DecodeErrorKind::EmptyEngineId));
    }

    Ok(EngineState::new(
        params.engine_id,
        params.engine_boots,
        params.engine_time,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discovery_response() {
        let params = UsmSecurityParams::new(b"engine-xyz".as_slice(), 4, 987, b"".as_slice());
        let state = parse_discovery_response(params.encode()).unwrap();

        assert_eq!(state.engine_id.as_ref(), b"engine-xyz");
        assert_eq!(state.engine_boots, 4);
        assert_eq!(state.engine_time, 987);
    }

    #[test]
    fn test_empty_engine_id_rejected() {
        let params = UsmSecurityParams::empty();
        assert!(matches!(
            parse_discovery_response(params.encode()),
            Err(Error::Decode {
                kind: DecodeErrorKind::EmptyEngineId,
                ..
            })
        ));
    }

    #[test]
    fn test_adopt_updates_counters() {
        let mut state = EngineState::new(Bytes::from_static(b"e1"), 1, 100);

        let newer = UsmSecurityParams::new(b"e1".as_slice(), 1, 250, b"u".as_slice());
        state.adopt(&newer);
        assert_eq!(state.engine_time, 250);

        // An empty engine ID in a reply leaves the adopted ID intact
        let mut no_id = UsmSecurityParams::new(b"".as_slice(), 2, 5, b"u".as_slice());
        no_id.engine_id = Bytes::new();
        state.adopt(&no_id);
        assert_eq!(state.engine_id.as_ref(), b"e1");
        assert_eq!(state.engine_boots, 2);
        assert_eq!(state.engine_time, 5);
    }
}
