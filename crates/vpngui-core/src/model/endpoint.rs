use serde::{Deserialize, Serialize};

/// Address and location of the active proxy outbound, shown next to the
/// connect button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub address: String,
    pub country_code: String,
}
