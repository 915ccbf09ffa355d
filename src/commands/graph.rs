//! Knowledge-graph command implementation

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::{GraphClient, NewEntity};
use serde_json::{Map, Value};
use tracing::info;

/// One call against the graph service
#[derive(Debug, Clone)]
pub enum GraphRequest {
    CreateEntity(NewEntity),
    AddObservation {
        entity_name: String,
        content: String,
        source: Option<String>,
    },
    Search {
        query: String,
    },
    Get {
        entity_name: String,
    },
}

/// Build an entity from CLI input; `data` is an optional JSON object of
/// extra fields sent alongside name and type
pub fn parse_entity(name: &str, entity_type: &str, data: Option<&str>) -> Result<NewEntity> {
    let extra = match data {
        None => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => {
                return Err(Error::InvalidInput(
                    "--data must be a JSON object".to_string(),
                ))
            }
        },
    };

    Ok(NewEntity {
        name: name.to_string(),
        entity_type: entity_type.to_string(),
        extra,
    })
}

pub async fn cmd_graph(config: &GraphConfig, request: GraphRequest) -> Result<Value> {
    let client = GraphClient::new(config)?;
    info!("Contacting graph service at {}", config.url);

    match request {
        GraphRequest::CreateEntity(entity) => client.create_entity(&entity).await,
        GraphRequest::AddObservation {
            entity_name,
            content,
            source,
        } => {
            client
                .add_observation(&entity_name, &content, source.as_deref())
                .await
        }
        GraphRequest::Search { query } => client.search_entities(&query).await,
        GraphRequest::Get { entity_name } => client.get_graph(&entity_name).await,
    }
}

/// Print a graph service response as pretty JSON
pub fn print_graph_response(response: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
