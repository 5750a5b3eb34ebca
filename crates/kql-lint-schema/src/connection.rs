//! Cluster connection strings
//!
//! Connection strings are `key=value` pairs separated by `;`. A leading segment
//! without `=` is the data source, so `https://help.kusto.windows.net;Fed=true`
//! is accepted.

use crate::{Result, SchemaError};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Catalog used when connecting to a cluster without a database in mind
pub const NET_DEFAULT_DB: &str = "NetDefaultDB";

const DATA_SOURCE: &str = "Data Source";
const INITIAL_CATALOG: &str = "Initial Catalog";
const FEDERATED: &str = "AAD Federated Security";
const USER_TOKEN: &str = "User Token";
const APPLICATION_TOKEN: &str = "Application Token";

fn canonical_key(key: &str) -> Option<&'static str> {
    let key = key.trim().to_ascii_lowercase();
    let canonical = match key.as_str() {
        "data source" | "server" | "addr" | "address" | "network address" => DATA_SOURCE,
        "initial catalog" | "database" => INITIAL_CATALOG,
        "fed" | "federated" | "aad federated security" => FEDERATED,
        "user token" | "usertoken" | "usrtoken" => USER_TOKEN,
        "application token" | "apptoken" => APPLICATION_TOKEN,
        _ => return None,
    };
    Some(canonical)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Canonical keys for known properties, original keys otherwise
    properties: IndexMap<String, String>,
}

impl ConnectionString {
    pub fn parse(text: &str) -> Result<Self> {
        let mut properties = IndexMap::new();

        for (i, segment) in text.split(';').enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = match segment.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None if i == 0 => (DATA_SOURCE, segment),
                None => {
                    return Err(SchemaError::InvalidConnection(format!(
                        "expected key=value, found '{}'",
                        segment
                    )));
                }
            };
            let key = canonical_key(key).map(str::to_string).unwrap_or_else(|| key.to_string());
            properties.insert(key, value.to_string());
        }

        let connection = Self { properties };
        if connection.data_source().is_empty() {
            return Err(SchemaError::InvalidConnection(format!(
                "no data source in '{}'",
                text
            )));
        }
        connection.url()?;
        Ok(connection)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn data_source(&self) -> &str {
        self.get(DATA_SOURCE).unwrap_or_default()
    }

    pub fn initial_catalog(&self) -> Option<&str> {
        self.get(INITIAL_CATALOG).filter(|c| !c.is_empty())
    }

    pub fn is_federated(&self) -> bool {
        self.get(FEDERATED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Bearer token to present, preferring the user token
    pub fn token(&self) -> Option<&str> {
        self.get(USER_TOKEN)
            .or_else(|| self.get(APPLICATION_TOKEN))
            .filter(|t| !t.is_empty())
    }

    /// Data source as a URL; a bare host defaults to https
    pub fn url(&self) -> Result<Url> {
        let source = self.data_source();
        let text = if source.contains("://") {
            source.to_string()
        } else {
            format!("https://{}", source)
        };
        let url = Url::parse(&text).map_err(|e| {
            SchemaError::InvalidConnection(format!("bad data source '{}': {}", source, e))
        })?;
        if url.host_str().is_none() {
            return Err(SchemaError::InvalidConnection(format!(
                "data source '{}' has no host",
                source
            )));
        }
        Ok(url)
    }

    /// Host name of the data source
    pub fn host(&self) -> Result<String> {
        let url = self.url()?;
        Ok(url.host_str().unwrap_or_default().to_string())
    }

    pub fn scheme(&self) -> String {
        self.url()
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string())
    }

    /// A connection to another cluster reusing this connection's security settings
    pub fn for_cluster(&self, host: &str) -> Self {
        let data_source = if host.contains("://") {
            host.to_string()
        } else {
            format!("{}://{}", self.scheme(), host)
        };
        let mut properties = self.properties.clone();
        properties.insert(DATA_SOURCE.to_string(), data_source);
        properties.insert(INITIAL_CATALOG.to_string(), NET_DEFAULT_DB.to_string());
        Self { properties }
    }
}

impl FromStr for ConnectionString {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&parts.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_leading_data_source() {
        let cs = ConnectionString::parse("https://help.kusto.windows.net;Fed=true").unwrap();
        assert_eq!(cs.data_source(), "https://help.kusto.windows.net");
        assert_eq!(cs.host().unwrap(), "help.kusto.windows.net");
        assert!(cs.is_federated());
        assert_eq!(cs.initial_catalog(), None);
    }

    #[test]
    fn test_parse_aliases() {
        let cs = ConnectionString::parse(
            "Server=http://localhost:8080; Database=Samples; User Token=abc; Custom=1",
        )
        .unwrap();
        assert_eq!(cs.host().unwrap(), "localhost");
        assert_eq!(cs.scheme(), "http");
        assert_eq!(cs.initial_catalog(), Some("Samples"));
        assert_eq!(cs.token(), Some("abc"));
        assert!(cs.to_string().contains("Custom=1"));
    }

    #[test]
    fn test_for_cluster_keeps_security() {
        let cs = ConnectionString::parse("Data Source=https://help.kusto.windows.net;Initial Catalog=Samples;Application Token=t").unwrap();
        let other = cs.for_cluster("other.kusto.windows.net");
        assert_eq!(other.data_source(), "https://other.kusto.windows.net");
        assert_eq!(other.initial_catalog(), Some(NET_DEFAULT_DB));
        assert_eq!(other.token(), Some("t"));
    }

    #[test]
    fn test_invalid_connections() {
        assert!(matches!(
            ConnectionString::parse("Fed=true"),
            Err(SchemaError::InvalidConnection(_))
        ));
        assert!(matches!(
            ConnectionString::parse("https://help;oops"),
            Err(SchemaError::InvalidConnection(_))
        ));
    }
}
