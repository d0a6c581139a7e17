//! Compiled contract artifacts, in the layout Hardhat writes under `artifacts/`.
//!
//! Each contract lives in `artifacts/<source path>/<ContractName>.json`, next to a
//! `<ContractName>.dbg.json` pointer into `artifacts/build-info/`. Only the former is read.

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use getset::Getters;
use serde::Deserialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};
use tracing::debug;

const BUILD_INFO_DIR: &str = "build-info";
const DBG_SUFFIX: &str = ".dbg.json";
const LINK_PLACEHOLDER: &str = "__$";
const MAX_SUGGESTIONS: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot read artifacts directory {0:?}: {1}")]
    CannotReadDir(PathBuf, io::Error),
    #[error("cannot read artifact {0:?}: {1}")]
    CannotRead(PathBuf, io::Error),
    #[error("invalid artifact {0:?}: {1}")]
    Invalid(PathBuf, serde_json::Error),
    #[error("artifact for contract {name:?} not found{}", did_you_mean(.similar))]
    NotFound { name: String, similar: Vec<String> },
    #[error(
        "there are multiple artifacts for contract {name:?}, use a fully qualified name instead: {}",
        .candidates.join(", ")
    )]
    Ambiguous { name: String, candidates: Vec<String> },
    #[error("contract {0} is abstract or an interface and cannot be deployed")]
    AbstractContract(String),
    #[error("contract {contract} has unlinked libraries: {}", .libraries.join(", "))]
    UnlinkedLibraries { contract: String, libraries: Vec<String> },
    #[error("contract {contract} constructor expects {expected} arguments, {given} given")]
    ConstructorArgs { contract: String, expected: usize, given: usize },
    #[error("invalid bytecode for contract {0}: {1}")]
    InvalidBytecode(String, hex::FromHexError),
}

fn did_you_mean(similar: &[String]) -> String {
    if similar.is_empty() {
        String::new()
    } else {
        format!(", did you mean {}?", similar.join(", "))
    }
}

/// Header fields shared by every artifact, used while scanning the directory.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactId {
    contract_name: String,
    source_name: String,
}

impl ArtifactId {
    fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

#[derive(Debug, Clone, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
#[getset(get = "pub")]
/// A compiled contract: its ABI and creation bytecode.
pub struct Artifact {
    #[serde(rename = "_format", default)]
    format: String,
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    /// Hex creation bytecode, `0x`-prefixed. Empty (`0x`) for abstract contracts.
    bytecode: String,
    #[serde(default)]
    deployed_bytecode: String,
    /// Source file -> library name -> placeholder positions.
    #[serde(default)]
    link_references: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Artifact {
    /// Parses an artifact from its JSON text.
    pub fn from_json(path: &Path, json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Invalid(path.into(), e))
    }

    /// `<sourceName>:<contractName>`, e.g. `contracts/Board.sol:Board`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Fails if the constructor declares any inputs: deployments here never pass arguments.
    pub fn check_no_constructor_args(&self) -> Result<(), Error> {
        let expected = self.abi.constructor().map(|c| c.inputs.len()).unwrap_or(0);
        if expected > 0 {
            return Err(Error::ConstructorArgs {
                contract: self.contract_name.clone(),
                expected,
                given: 0,
            });
        }
        Ok(())
    }

    /// Decoded creation bytecode, ready to be sent as the deployment payload.
    pub fn creation_code(&self) -> Result<Bytes, Error> {
        let code = self.bytecode.trim();
        let code = code.strip_prefix("0x").unwrap_or(code);
        if code.is_empty() {
            return Err(Error::AbstractContract(self.contract_name.clone()));
        }

        let mut libraries: Vec<String> = self
            .link_references
            .iter()
            .flat_map(|(source, libs)| libs.keys().map(move |lib| format!("{source}:{lib}")))
            .collect();
        if libraries.is_empty() && code.contains(LINK_PLACEHOLDER) {
            libraries.push("<unknown>".to_string());
        }
        if !libraries.is_empty() {
            return Err(Error::UnlinkedLibraries {
                contract: self.contract_name.clone(),
                libraries,
            });
        }

        hex::decode(code)
            .map(Bytes::from)
            .map_err(|e| Error::InvalidBytecode(self.contract_name.clone(), e))
    }
}

/// The set of artifacts below one directory, resolved by contract name.
pub struct Artifacts {
    dir: PathBuf,
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the artifact for `name`.
    ///
    /// `name` is either a bare contract name (`Board`), which must be unique across the
    /// directory, or a fully qualified name (`contracts/Board.sol:Board`).
    pub fn read(&self, name: &str) -> Result<Artifact, Error> {
        let index = self.index()?;
        let matches: Vec<&(PathBuf, ArtifactId)> = match name.rsplit_once(':') {
            Some((source, contract)) => index
                .iter()
                .filter(|(_, id)| id.source_name == source && id.contract_name == contract)
                .collect(),
            None => index.iter().filter(|(_, id)| id.contract_name == name).collect(),
        };

        match matches.as_slice() {
            [] => Err(Error::NotFound { name: name.to_string(), similar: similar(name, &index) }),
            [(path, _)] => {
                debug!(path = path.to_str(), "reading artifact");
                let json =
                    std::fs::read_to_string(path).map_err(|e| Error::CannotRead(path.clone(), e))?;
                Artifact::from_json(path, &json)
            },
            many => {
                let mut candidates: Vec<String> =
                    many.iter().map(|(_, id)| id.fully_qualified_name()).collect();
                candidates.sort();
                Err(Error::Ambiguous { name: name.to_string(), candidates })
            },
        }
    }

    /// Collects the id of every artifact file below the directory.
    fn index(&self) -> Result<Vec<(PathBuf, ArtifactId)>, Error> {
        let mut index = Vec::new();
        let mut pending = vec![self.dir.clone()];
        while let Some(dir) = pending.pop() {
            let entries =
                std::fs::read_dir(&dir).map_err(|e| Error::CannotReadDir(dir.clone(), e))?;
            for entry in entries {
                let path = entry.map_err(|e| Error::CannotReadDir(dir.clone(), e))?.path();
                let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                if path.is_dir() {
                    if file_name != BUILD_INFO_DIR {
                        pending.push(path);
                    }
                    continue;
                }
                if !file_name.ends_with(".json") || file_name.ends_with(DBG_SUFFIX) {
                    continue;
                }
                let json =
                    std::fs::read_to_string(&path).map_err(|e| Error::CannotRead(path.clone(), e))?;
                match serde_json::from_str::<ArtifactId>(&json) {
                    Ok(id) => index.push((path, id)),
                    Err(err) => debug!(path = path.to_str(), %err, "skipping non-artifact json"),
                }
            }
        }
        Ok(index)
    }
}

/// Contract names close to `name`, closest first.
fn similar(name: &str, index: &[(PathBuf, ArtifactId)]) -> Vec<String> {
    let wanted = name.to_lowercase();
    let max_distance = wanted.len() / 3 + 1;
    let mut scored: Vec<(usize, &str)> = index
        .iter()
        .map(|(_, id)| {
            let distance = strsim::levenshtein(&wanted, &id.contract_name.to_lowercase());
            (distance, id.contract_name.as_str())
        })
        .filter(|(distance, _)| *distance <= max_distance)
        .collect();
    scored.sort();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, name)| name.to_string()).collect()
}
