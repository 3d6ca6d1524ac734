use serde_json::Value;

use crate::error::{SimpleApiError, SimpleApiResult};

const CLUSTERS: &str = include_str!("../data/clusters.json");
const ENCLAVES: &str = include_str!("../data/enclaves.json");
const SERVICES: &str = include_str!("../data/services.json");
const LOGS: &str = include_str!("../data/logs.json");

/// The fixture records served by the API, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub clusters: Vec<Value>,
    pub enclaves: Vec<Value>,
    pub services: Vec<Value>,
    pub logs: Vec<Value>,
}

impl Dataset {
    pub fn embedded() -> SimpleApiResult<Self> {
        Ok(Self {
            clusters: parse("clusters", CLUSTERS)?,
            enclaves: parse("enclaves", ENCLAVES)?,
            services: parse("services", SERVICES)?,
            logs: parse("logs", LOGS)?,
        })
    }
}

fn parse(name: &'static str, raw: &str) -> SimpleApiResult<Vec<Value>> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| SimpleApiError::Fixture { name, source })?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(SimpleApiError::NotAnArray(name)),
    }
}
