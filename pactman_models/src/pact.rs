//! The Pact document model and pact file reading/writing

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::anyhow;
use itertools::Itertools;
use lazy_static::lazy_static;
use maplit::btreemap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::{Consumer, PactFileError, PactSpecification, Provider};
use crate::file_utils::write_locked;
use crate::interaction::Interaction;
use crate::json_utils::json_to_string;

/// How the writer treats an existing pact file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Truncate and rewrite the file with the session's interactions
  Overwrite,
  /// Merge the session's interactions with any existing file, replacing
  /// interactions with colliding descriptions
  Merge,
  /// Write nothing
  Never
}

/// A pact between a consumer and a provider, aggregating the agreed
/// interactions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pact {
  /// Consumer side of the pact
  pub consumer: Consumer,
  /// Provider side of the pact
  pub provider: Provider,
  /// List of interactions between the consumer and provider
  pub interactions: Vec<Interaction>,
  /// Metadata associated with this pact
  pub metadata: BTreeMap<String, BTreeMap<String, String>>
}

impl Pact {
  /// Creates an empty pact between the named consumer and provider
  pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Pact {
    Pact {
      consumer: Consumer { name: consumer.into() },
      provider: Provider { name: provider.into() },
      .. Pact::default()
    }
  }

  /// Constructs a pact from its JSON form. The specification version is
  /// taken from the document metadata and stamped onto each interaction.
  pub fn from_json(source_name: &str, pact_json: &Value) -> anyhow::Result<Pact> {
    let map = match pact_json {
      Value::Object(map) => map,
      _ => return Err(PactFileError::PactFormatError {
        source_name: source_name.to_string(),
        detail: "pact JSON is not an object".to_string()
      }.into())
    };
    let metadata = parse_meta_data(pact_json);
    let spec_version = determine_spec_version(source_name, &metadata)?;
    let consumer = match map.get("consumer") {
      Some(v) => Consumer::from_json(v),
      None => Consumer { name: "consumer".into() }
    };
    let provider = match map.get("provider") {
      Some(v) => Provider::from_json(v),
      None => Provider { name: "provider".into() }
    };
    let interactions = match map.get("interactions") {
      Some(Value::Array(array)) => array.iter().enumerate()
        .map(|(index, json)| Interaction::from_json(index, json, spec_version)
          .map_err(|err| PactFileError::PactFormatError {
            source_name: source_name.to_string(),
            detail: format!("interaction {}: {}", index, err)
          }.into()))
        .collect::<anyhow::Result<Vec<Interaction>>>()?,
      Some(_) => return Err(PactFileError::PactFormatError {
        source_name: source_name.to_string(),
        detail: "'interactions' is not an array".to_string()
      }.into()),
      None => vec![]
    };
    let descriptions: Vec<&str> = interactions.iter()
      .map(|i| i.description.as_str())
      .duplicates()
      .collect();
    if !descriptions.is_empty() {
      return Err(PactFileError::PactFormatError {
        source_name: source_name.to_string(),
        detail: format!("duplicate interaction descriptions: {}", descriptions.join(", "))
      }.into());
    }
    Ok(Pact { consumer, provider, interactions, metadata })
  }

  /// The specification version shared by the interactions of this pact.
  /// Returns a `SpecVersionMismatch` error if the interactions disagree.
  pub fn spec_version(&self) -> anyhow::Result<PactSpecification> {
    let versions: Vec<PactSpecification> = self.interactions.iter()
      .map(|i| i.spec_version)
      .unique()
      .collect();
    match versions.as_slice() {
      [] => Ok(PactSpecification::default()),
      [version] => Ok(*version),
      _ => Err(PactFileError::SpecVersionMismatch {
        versions: versions.iter().map(|v| v.version_str()).collect()
      }.into())
    }
  }

  /// Converts this pact to its JSON form for the given spec version
  pub fn to_json(&self, spec_version: PactSpecification) -> Value {
    json!({
      "consumer": self.consumer.to_json(),
      "provider": self.provider.to_json(),
      "interactions": Value::Array(self.interactions.iter()
        .map(|i| i.to_json(spec_version)).collect()),
      "metadata": self.metadata_json(spec_version)
    })
  }

  fn metadata_json(&self, spec_version: PactSpecification) -> Value {
    let mut metadata = self.metadata.clone();
    metadata.insert("pactSpecification".to_string(), btreemap!{
      "version".to_string() => spec_version.version_str()
    });
    Value::Object(metadata.iter().fold(Map::new(), |mut map, (key, values)| {
      map.insert(key.clone(), json!(values));
      map
    }))
  }

  /// Merges the other pact into this one. Interactions of the other pact
  /// whose description collides with one of ours are dropped; the result is
  /// sorted by description. Merging pacts for different consumer/provider
  /// pairs is an error.
  pub fn merge(&self, other: &Pact) -> anyhow::Result<Pact> {
    if self.consumer.name != other.consumer.name || self.provider.name != other.provider.name {
      return Err(anyhow!("Unable to merge pacts, as they have different consumers or providers"));
    }
    let interactions = self.interactions.iter()
      .chain(other.interactions.iter()
        .filter(|other_interaction| !self.interactions.iter()
          .any(|i| i.description == other_interaction.description)))
      .cloned()
      .sorted_by(|a, b| Ord::cmp(&a.description, &b.description))
      .collect();
    Ok(Pact {
      interactions,
      metadata: self.metadata.clone(),
      .. self.clone()
    })
  }

  /// The default file name for this pact:
  /// `<consumer>-<provider>.json`, lower-cased, whitespace replaced by `_`
  pub fn default_file_name(&self) -> String {
    let name = format!("{}-{}.json", self.consumer.name, self.provider.name);
    name.to_lowercase().split_whitespace().join("_")
  }
}

/// Reads the pact file and parses the resulting JSON into a `Pact` struct
pub fn read_pact(file: &Path) -> anyhow::Result<Pact> {
  let contents = fs::read_to_string(file)?;
  let pact_json: Value = serde_json::from_str(&contents)
    .map_err(|err| PactFileError::PactFormatError {
      source_name: file.display().to_string(),
      detail: err.to_string()
    })?;
  Pact::from_json(&file.display().to_string(), &pact_json)
}

lazy_static! {
  // One test session owns one file; this guards concurrent writes from
  // threads within the session.
  static ref WRITE_LOCK: Mutex<()> = Mutex::new(());
}

/// Writes the pact to the file at the given path, according to the write
/// mode. The spec version is taken from the pact's interactions, which must
/// agree on one.
pub fn write_pact(pact: &Pact, path: &Path, mode: WriteMode) -> anyhow::Result<()> {
  if mode == WriteMode::Never {
    debug!("Pact file writing is disabled, skipping write to {:?}", path);
    return Ok(());
  }
  let spec_version = pact.spec_version()?;
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let _lock = WRITE_LOCK.lock().unwrap();
  let pact_to_write = if mode == WriteMode::Merge && path.exists() {
    debug!("Merging pact with file {:?}", path);
    let existing = read_pact(path)?;
    if let Ok(existing_version) = existing.spec_version() {
      if existing_version < spec_version {
        warn!("Existing pact is an older specification version ({}), and will be upgraded",
          existing_version);
      }
    }
    pact.merge(&existing)?
  } else {
    pact.clone()
  };
  let contents = serde_json::to_string_pretty(&pact_to_write.to_json(spec_version))?;
  let mut file = File::create(path)?;
  write_locked(path, &mut file, &contents)
}

/// Construct the metadata map from the pact JSON
pub fn parse_meta_data(pact_json: &Value) -> BTreeMap<String, BTreeMap<String, String>> {
  match pact_json.get("metadata") {
    Some(Value::Object(obj)) => obj.iter().map(|(k, v)| {
      let values = match v {
        Value::Object(obj) => obj.iter()
          .map(|(k, v)| (k.clone(), json_to_string(v)))
          .collect(),
        _ => btreemap!{}
      };
      let key = match k.as_str() {
        "pact-specification" => "pactSpecification".to_string(),
        _ => k.clone()
      };
      (key, values)
    }).collect(),
    _ => btreemap!{}
  }
}

/// Determines the Pact specification version from the metadata of the pact
/// file. Documents with no version metadata are treated as V2, which is how
/// the wider ecosystem reads them.
pub fn determine_spec_version(
  source_name: &str,
  metadata: &BTreeMap<String, BTreeMap<String, String>>
) -> anyhow::Result<PactSpecification> {
  match metadata.get("pactSpecification")
    .or_else(|| metadata.get("pactSpecificationVersion"))
    .and_then(|spec| spec.get("version")) {
    Some(version) => match PactSpecification::parse_version(version) {
      PactSpecification::Unknown => Err(PactFileError::PactFormatError {
        source_name: source_name.to_string(),
        detail: format!("'{}' is not a supported specification version", version)
      }.into()),
      version => Ok(version)
    },
    None => Ok(PactSpecification::V2)
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use serde_json::json;

  use super::*;
  use crate::PactSpecification;

  fn pact_json(spec: &str) -> Value {
    json!({
      "consumer": { "name": "Consumer" },
      "provider": { "name": "Provider" },
      "interactions": [
        {
          "description": "a request for something",
          "request": { "method": "GET", "path": "/something" },
          "response": { "status": 200 }
        }
      ],
      "metadata": { "pactSpecification": { "version": spec } }
    })
  }

  #[test]
  fn loads_a_v3_pact() {
    let pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    expect!(pact.consumer.name).to(be_equal_to("Consumer"));
    expect!(pact.interactions.len()).to(be_equal_to(1));
    expect!(pact.interactions[0].spec_version).to(be_equal_to(PactSpecification::V3));
  }

  #[test]
  fn documents_without_version_metadata_load_as_v2() {
    let mut json = pact_json("3.0.0");
    json.as_object_mut().unwrap().remove("metadata");
    let pact = Pact::from_json("<json>", &json).unwrap();
    expect!(pact.interactions[0].spec_version).to(be_equal_to(PactSpecification::V2));
  }

  #[test]
  fn rejects_unsupported_versions() {
    let result = Pact::from_json("<json>", &pact_json("4.0.0"));
    expect!(result).to(be_err());
  }

  #[test]
  fn rejects_duplicate_descriptions() {
    let json = json!({
      "consumer": { "name": "C" },
      "provider": { "name": "P" },
      "interactions": [
        { "description": "a request" },
        { "description": "a request" }
      ],
      "metadata": { "pactSpecification": { "version": "3.0.0" } }
    });
    let result = Pact::from_json("<json>", &json);
    expect!(result).to(be_err());
  }

  #[test]
  fn spec_version_rejects_a_mix() {
    let mut pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    let mut other = pact.interactions[0].clone();
    other.description = "another request".to_string();
    other.spec_version = PactSpecification::V2;
    pact.interactions.push(other);
    let result = pact.spec_version();
    expect!(result).to(be_err());
  }

  #[test]
  fn merge_replaces_colliding_descriptions() {
    let pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    let mut older = pact.clone();
    older.interactions[0].response.status = 404;
    let mut extra = older.interactions[0].clone();
    extra.description = "an earlier request".to_string();
    older.interactions.push(extra);

    let merged = pact.merge(&older).unwrap();
    expect!(merged.interactions.len()).to(be_equal_to(2));
    let current = merged.interactions.iter()
      .find(|i| i.description == "a request for something").unwrap();
    expect!(current.response.status).to(be_equal_to(200));
  }

  #[test]
  fn merge_rejects_different_pairs() {
    let pact = Pact::new("A", "B");
    let other = Pact::new("A", "C");
    expect!(pact.merge(&other)).to(be_err());
  }

  #[test]
  fn default_file_name_is_normalised() {
    let pact = Pact::new("Big Consumer", "Some Provider");
    expect!(pact.default_file_name()).to(be_equal_to("big_consumer-some_provider.json"));
  }

  #[test]
  fn writes_and_reads_a_pact_file() {
    let dir = std::env::temp_dir().join("pactman-write-test");
    let _ = fs::remove_dir_all(&dir);
    let pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    let path = dir.join(pact.default_file_name());

    write_pact(&pact, &path, WriteMode::Overwrite).unwrap();
    let loaded = read_pact(&path).unwrap();
    expect!(loaded).to(be_equal_to(pact));

    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn write_mode_never_writes_nothing() {
    let dir = std::env::temp_dir().join("pactman-never-test");
    let _ = fs::remove_dir_all(&dir);
    let pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    let path = dir.join(pact.default_file_name());

    write_pact(&pact, &path, WriteMode::Never).unwrap();
    expect!(path.exists()).to(be_false());
  }

  #[test]
  fn merge_mode_merges_with_the_existing_file() {
    let dir = std::env::temp_dir().join("pactman-merge-test");
    let _ = fs::remove_dir_all(&dir);
    let pact = Pact::from_json("<json>", &pact_json("3.0.0")).unwrap();
    let path = dir.join(pact.default_file_name());
    write_pact(&pact, &path, WriteMode::Overwrite).unwrap();

    let mut next = pact.clone();
    next.interactions[0].description = "a second request".to_string();
    write_pact(&next, &path, WriteMode::Merge).unwrap();

    let merged = read_pact(&path).unwrap();
    expect!(merged.interactions.len()).to(be_equal_to(2));

    let _ = fs::remove_dir_all(&dir);
  }
}
