// speedtest.net response types
//
// The public server list is a JSON array of server objects. Field types
// drift between API revisions (ids and distances arrive as strings or
// numbers), so numeric-ish fields are decoded leniently.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::Error;

/// One entry of the speedtest.net server list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Upload endpoint, e.g. `http://host:8080/speedtest/upload.php`.
    /// Every other resource lives next to it.
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sponsor: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "optional_f64")]
    pub distance: Option<f64>,
    /// Best observed round trip, filled in by server selection.
    #[serde(skip)]
    pub latency: Option<Duration>,
}

impl Server {
    /// Upload URL as parsed [`Url`].
    pub fn upload_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.url)?)
    }

    /// Resolve a sibling resource of the upload endpoint
    /// (`latency.txt`, `random350x350.jpg`, ...).
    pub fn resource(&self, name: &str) -> Result<Url, Error> {
        Ok(self.upload_url()?.join(name)?)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}
