use crate::{
    config::DeviceConfig,
    http_client::{response_body, unix_socket_client},
};
use anyhow::{Context, Result};
use log::{debug, info};
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_repr::Serialize_repr;
use std::fmt::{self, Debug};
use trait_variant::make;

/// Raw connection-test status reported by the card on each poll
pub type StatusCode = u8;

/// What the card should do with the network named in a [`NetworkRequest`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkIntent {
    Test,
    Add,
    Remove,
}

/// Security type of a wireless network as the card encodes it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr)]
#[repr(u8)]
pub enum NetType {
    Unsecured = 0,
    Wep = 1,
    Wpa = 2,
    Unknown1 = 3,
    Wpa2 = 4,
}

impl NetType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unsecured),
            1 => Some(Self::Wep),
            2 => Some(Self::Wpa),
            3 => Some(Self::Unknown1),
            4 => Some(Self::Wpa2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsecured => "No security",
            Self::Wep => "WEP",
            Self::Wpa => "WPA",
            Self::Unknown1 => "unknown1",
            Self::Wpa2 => "WPA2",
        }
    }
}

/// Display name for a raw network type code as reported by a scan
pub fn net_type_name(code: u8) -> &'static str {
    NetType::from_code(code).map_or("unknown", |t| t.name())
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRequest {
    pub action: NetworkIntent,
    pub essid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(rename = "type")]
    pub net_type: NetType,
}

impl Debug for NetworkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkRequest")
            .field("action", &self.action)
            .field("essid", &self.essid)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("net_type", &self.net_type)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ScannedNetwork {
    pub essid: String,
    #[serde(rename = "type")]
    pub net_type: u8,
    pub strength: u8,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ConfiguredNetwork {
    pub essid: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Deserialize)]
struct TestStatusResponse {
    status: StatusCode,
}

#[derive(Deserialize)]
struct FirmwareInfoResponse {
    info: String,
}

#[derive(Deserialize)]
struct CardKeyResponse {
    key: String,
}

#[derive(Deserialize)]
struct MacAddressResponse {
    mac: MacAddress,
}

/// One request/response transaction with the card per call.
///
/// Every error is a transport error: the transaction could not be completed
/// or the card bridge answered with something unexpected.
#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait CardClient {
    async fn send_network_action(&self, request: NetworkRequest) -> Result<()>;
    async fn test_status(&self) -> Result<StatusCode>;
    async fn scan_networks(&self) -> Result<Vec<ScannedNetwork>>;
    async fn configured_networks(&self) -> Result<Vec<ConfiguredNetwork>>;
    async fn firmware_info(&self) -> Result<String>;
    async fn card_key(&self) -> Result<String>;
    async fn mac_address(&self) -> Result<MacAddress>;
    async fn reboot(&self) -> Result<()>;
    async fn card_log(&self) -> Result<Vec<u8>>;
}

/// Card client talking HTTP/JSON to the local card bridge over a unix socket
#[derive(Clone)]
pub struct EyeFiCardClient {
    client: Client,
}

impl EyeFiCardClient {
    const NETWORK_ENDPOINT: &str = "/network/v1";
    const TEST_STATUS_ENDPOINT: &str = "/network/status/v1";
    const SCAN_ENDPOINT: &str = "/networks/scan/v1";
    const CONFIGURED_ENDPOINT: &str = "/networks/v1";
    const FIRMWARE_ENDPOINT: &str = "/card/firmware/v1";
    const KEY_ENDPOINT: &str = "/card/key/v1";
    const MAC_ENDPOINT: &str = "/card/mac/v1";
    const REBOOT_ENDPOINT: &str = "/card/reboot/v1";
    const LOG_ENDPOINT: &str = "/card/log/v1";

    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let client = unix_socket_client(&config.socket_path.to_string_lossy())?;

        Ok(EyeFiCardClient { client })
    }

    fn build_url(&self, path: &str) -> String {
        let normalized_path = path.trim_start_matches('/');
        format!("http://localhost/{normalized_path}")
    }

    async fn transact(&self, request: RequestBuilder, label: &str) -> Result<Vec<u8>> {
        let res = request
            .send()
            .await
            .context(format!("{label}: card bridge did not answer"))?;

        response_body(res, label).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        debug!("GET {path}");
        let request = self.client.get(self.build_url(path));

        self.transact(request, &format!("GET {path}")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body).context(format!("failed to parse reply to GET {path}"))
    }

    async fn post(&self, path: &str) -> Result<()> {
        debug!("POST {path}");
        let request = self.client.post(self.build_url(path));

        self.transact(request, &format!("POST {path}")).await?;
        Ok(())
    }

    async fn post_json(&self, path: &str, body: &(impl Debug + Serialize)) -> Result<()> {
        debug!("POST {path} with body: {body:?}");
        let request = self.client.post(self.build_url(path)).json(body);

        self.transact(request, &format!("POST {path}")).await?;
        Ok(())
    }
}

impl CardClient for EyeFiCardClient {
    async fn send_network_action(&self, request: NetworkRequest) -> Result<()> {
        info!("{:?} network '{}'", request.action, request.essid);
        self.post_json(Self::NETWORK_ENDPOINT, &request).await
    }

    async fn test_status(&self) -> Result<StatusCode> {
        let response: TestStatusResponse = self.get_json(Self::TEST_STATUS_ENDPOINT).await?;
        Ok(response.status)
    }

    async fn scan_networks(&self) -> Result<Vec<ScannedNetwork>> {
        self.get_json(Self::SCAN_ENDPOINT).await
    }

    async fn configured_networks(&self) -> Result<Vec<ConfiguredNetwork>> {
        self.get_json(Self::CONFIGURED_ENDPOINT).await
    }

    async fn firmware_info(&self) -> Result<String> {
        let response: FirmwareInfoResponse = self.get_json(Self::FIRMWARE_ENDPOINT).await?;
        Ok(response.info)
    }

    async fn card_key(&self) -> Result<String> {
        let response: CardKeyResponse = self.get_json(Self::KEY_ENDPOINT).await?;
        Ok(response.key)
    }

    async fn mac_address(&self) -> Result<MacAddress> {
        let response: MacAddressResponse = self.get_json(Self::MAC_ENDPOINT).await?;
        Ok(response.mac)
    }

    async fn reboot(&self) -> Result<()> {
        self.post(Self::REBOOT_ENDPOINT).await
    }

    async fn card_log(&self) -> Result<Vec<u8>> {
        self.get(Self::LOG_ENDPOINT).await
    }
}
