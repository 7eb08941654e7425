use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchResult {
    pub esearchresult: ESearchData,
}

/// The ESearch JSON envelope. NCBI serializes the numeric fields as strings.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchData {
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub retmax: Option<String>,
    #[serde(default)]
    pub idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
}
