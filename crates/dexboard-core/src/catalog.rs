use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::pagination::{PageRequest, page_count};

pub const CATALOG_PAGE_LIMIT: u32 = 12;

pub const POKEMON_LIST_QUERY: &str = "query GetPokemonList($offset: Int!, $limit: Int!) {
  pokemon_v2_pokemon(offset: $offset, limit: $limit) {
    id
    name
    image: pokemon_v2_pokemonsprites {
      sprites
    }
  }
  pokemon_v2_pokemon_aggregate {
    aggregate {
      count
    }
  }
}";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CatalogRequest {
    pub query: &'static str,
    pub variables: PageRequest,
}

impl CatalogRequest {
    pub fn for_page(page: u32, limit: u32) -> Self {
        Self {
            query: POKEMON_LIST_QUERY,
            variables: PageRequest::for_page(page, limit),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to encode catalog request")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonEntry {
    pub id: u64,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub entries: Vec<PokemonEntry>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(default)]
    pokemon_v2_pokemon: Vec<RawPokemon>,
    pokemon_v2_pokemon_aggregate: Option<Aggregate>,
}

#[derive(Debug, Deserialize)]
struct RawPokemon {
    id: u64,
    name: String,
    #[serde(default)]
    image: Vec<RawSprites>,
}

#[derive(Debug, Deserialize)]
struct RawSprites {
    #[serde(default)]
    sprites: Value,
}

#[derive(Debug, Deserialize)]
struct Aggregate {
    aggregate: Option<AggregateCount>,
}

#[derive(Debug, Deserialize)]
struct AggregateCount {
    count: u64,
}

impl CatalogPage {
    #[tracing::instrument(skip(raw))]
    pub fn from_response(raw: &str) -> anyhow::Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(raw).context("failed parsing catalog response")?;

        if !envelope.errors.is_empty() {
            let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(anyhow!("catalog query failed: {}", messages.join("; ")));
        }

        let data = envelope
            .data
            .ok_or_else(|| anyhow!("catalog response had no data"))?;

        let entries: Vec<PokemonEntry> = data
            .pokemon_v2_pokemon
            .into_iter()
            .map(|raw| PokemonEntry {
                image_url: raw.image.first().and_then(|s| dream_world_image(&s.sprites)),
                id: raw.id,
                name: raw.name,
            })
            .collect();

        let total_count = data
            .pokemon_v2_pokemon_aggregate
            .and_then(|agg| agg.aggregate)
            .map(|agg| agg.count);

        debug!(entries = entries.len(), ?total_count, "parsed catalog page");
        Ok(Self {
            entries,
            total_count,
        })
    }

    /// `None` when the response carried no aggregate count.
    pub fn total_pages(&self, limit: u32) -> Option<u32> {
        self.total_count.map(|count| page_count(count, limit))
    }
}

// Some deployments return the sprites column as a JSON-encoded string.
fn dream_world_image(sprites: &Value) -> Option<String> {
    let decoded;
    let sprites = match sprites {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).ok()?;
            &decoded
        }
        other => other,
    };

    sprites
        .pointer("/other/dream_world/front_default")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_offset_and_limit() {
        let request = CatalogRequest::for_page(3, CATALOG_PAGE_LIMIT);
        let json: Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(json["variables"]["offset"], 24);
        assert_eq!(json["variables"]["limit"], 12);
        assert!(json["query"].as_str().unwrap().contains("pokemon_v2_pokemon_aggregate"));
    }

    #[test]
    fn parses_entries_images_and_count() {
        let raw = r#"{"data":{
            "pokemon_v2_pokemon":[
              {"id":1,"name":"bulbasaur","image":[{"sprites":{"other":{"dream_world":{"front_default":"https://img/1.svg"}}}}]},
              {"id":2,"name":"ivysaur","image":[{"sprites":"{\"other\":{\"dream_world\":{\"front_default\":\"https://img/2.svg\"}}}"}]},
              {"id":10001,"name":"deoxys-attack","image":[{"sprites":{"other":{"dream_world":{"front_default":null}}}}]},
              {"id":10002,"name":"no-sprites","image":[]}
            ],
            "pokemon_v2_pokemon_aggregate":{"aggregate":{"count":1302}}
        }}"#;

        let page = CatalogPage::from_response(raw).unwrap();
        assert_eq!(page.entries.len(), 4);
        assert_eq!(page.entries[0].image_url.as_deref(), Some("https://img/1.svg"));
        assert_eq!(page.entries[1].image_url.as_deref(), Some("https://img/2.svg"));
        assert_eq!(page.entries[2].image_url, None);
        assert_eq!(page.entries[3].image_url, None);
        assert_eq!(page.total_pages(CATALOG_PAGE_LIMIT), Some(109));
    }

    #[test]
    fn missing_aggregate_leaves_total_unknown() {
        let raw = r#"{"data":{"pokemon_v2_pokemon":[]}}"#;
        let page = CatalogPage::from_response(raw).unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total_pages(CATALOG_PAGE_LIMIT), None);
    }

    #[test]
    fn graphql_errors_fail() {
        let raw = r#"{"data":null,"errors":[{"message":"field not found"}]}"#;
        let err = CatalogPage::from_response(raw).unwrap_err();
        assert!(err.to_string().contains("field not found"));
    }
}
