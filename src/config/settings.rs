use serde::{Deserialize, Serialize};

use crate::harness::{RequestStyle, ResponseMode};

/// Settings of the `tlm-bridge trace` runner.
///
/// Every field has a default, so a settings file only needs the values it
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceSettings {
    pub simulation: SimulationSettings,
    pub blocking_target: BlockingTargetSettings,
    pub non_blocking_target: NonBlockingTargetSettings,
    pub transaction: TransactionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Stop each scenario after this much simulated time
    pub time_limit_ns: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockingTargetSettings {
    pub response_delay_ns: u64,
    /// Suspend inside the handler instead of annotating the delay
    pub wait_in_handler: bool,
    pub response_mode: ResponseModeSetting,
}

impl Default for BlockingTargetSettings {
    fn default() -> Self {
        Self {
            response_delay_ns: 100,
            wait_in_handler: false,
            response_mode: ResponseModeSetting::Complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NonBlockingTargetSettings {
    pub end_request_delay_ns: u64,
    pub begin_response_delay_ns: u64,
    pub style: RequestStyleSetting,
}

impl Default for NonBlockingTargetSettings {
    fn default() -> Self {
        Self {
            end_request_delay_ns: 10,
            begin_response_delay_ns: 25,
            style: RequestStyleSetting::Backward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionSettings {
    pub address: u64,
    pub length: usize,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            address: 0x1000,
            length: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseModeSetting {
    #[default]
    Complete,
    Accept,
}

impl From<ResponseModeSetting> for ResponseMode {
    fn from(value: ResponseModeSetting) -> Self {
        match value {
            ResponseModeSetting::Complete => ResponseMode::Complete,
            ResponseModeSetting::Accept => ResponseMode::Accept,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStyleSetting {
    #[default]
    Backward,
    ReturnEndRequest,
    ReturnBeginResponse,
    Complete,
}

impl From<RequestStyleSetting> for RequestStyle {
    fn from(value: RequestStyleSetting) -> Self {
        match value {
            RequestStyleSetting::Backward => RequestStyle::Backward,
            RequestStyleSetting::ReturnEndRequest => RequestStyle::ReturnEndRequest,
            RequestStyleSetting::ReturnBeginResponse => RequestStyle::ReturnBeginResponse,
            RequestStyleSetting::Complete => RequestStyle::Complete,
        }
    }
}
