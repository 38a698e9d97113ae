//! # Automaton Cache
//!
//! Persists built automata so a grammar is only analyzed once per machine.
//!
//! # Cache Directory Structure
//!
//! ```text
//! <cache_dir>/
//! ├── <key>-lr1.bin    # Bincode-encoded StateGraph (also used for LALR)
//! ├── <key>-lr0.bin
//! └── ...
//! ```
//!
//! The key is a hash of the grammar text and the whitespace flag. LALR tables
//! are derived from the cached LR(1) graph with
//! [`StateGraph::convert_lalr`] after loading. A blob is written once after a
//! fresh build and never rewritten.

use super::{LrMode, StateGraph, SyntaxTable};
use crate::error::{CacheError, Error};
use crate::grammar::{Grammar, GrammarSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache key: hash of (grammar text, whitespace flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(pub u64);

impl CacheKey {
    /// Key for a grammar text.
    ///
    /// Stable for a given build of this crate.
    #[must_use]
    pub fn new(grammar_text: &str, whitespace: bool) -> Self {
        let state = ahash::RandomState::with_seeds(
            0x6563_6f5f_6772_616d,
            0x6d61_725f_6361_6368,
            u64::from(whitespace),
            env!("CARGO_PKG_VERSION").len() as u64,
        );
        Self(state.hash_one((grammar_text, whitespace, env!("CARGO_PKG_VERSION"))))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Directory of persisted automata.
#[derive(Debug, Clone)]
pub struct AutomatonCache {
    dir: PathBuf,
}

impl AutomatonCache {
    /// Open a cache directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Blob path for a key. LALR shares the LR(1) blob.
    #[must_use]
    pub fn path(&self, key: CacheKey, mode: LrMode) -> PathBuf {
        let base = match mode {
            LrMode::Lr0 => LrMode::Lr0,
            LrMode::Lr1 | LrMode::Lalr => LrMode::Lr1,
        };
        self.dir.join(format!("{key}-{base}.bin"))
    }

    /// Load the graph stored for `key`, checking it was built from `grammar`.
    ///
    /// Returns `Ok(None)` on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the blob exists but cannot be read, decoded,
    /// or belongs to a different grammar.
    pub fn load(
        &self,
        key: CacheKey,
        grammar: &Grammar,
        mode: LrMode,
    ) -> Result<Option<StateGraph>, CacheError> {
        let path = self.path(key, mode);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let graph: StateGraph = bincode::deserialize(&bytes).map_err(|source| CacheError::Decode {
            path: path.clone(),
            source,
        })?;
        if graph.fingerprint() != grammar.fingerprint() {
            return Err(CacheError::Mismatch { path });
        }
        debug!(path = %path.display(), states = graph.state_count(), "loaded cached automaton");
        Ok(Some(graph))
    }

    /// Store a freshly built graph. Existing blobs are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the blob cannot be written.
    pub fn store(&self, key: CacheKey, graph: &StateGraph) -> Result<(), CacheError> {
        let path = self.path(key, graph.mode());
        if path.exists() {
            return Ok(());
        }
        let bytes = bincode::serialize(graph).map_err(|source| CacheError::Decode {
            path: path.clone(),
            source,
        })?;
        let temp = path.with_extension(format!("tmp{}", std::process::id()));
        std::fs::write(&temp, &bytes).map_err(|source| CacheError::Io {
            path: temp.clone(),
            source,
        })?;
        std::fs::rename(&temp, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "stored automaton");
        Ok(())
    }

    /// Read a grammar and produce its syntax table, reusing a cached
    /// automaton when one exists and persisting a fresh one otherwise.
    ///
    /// A corrupt or mismatched blob is reported with a warning and rebuilt
    /// in memory; it is not overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Grammar`] for a malformed grammar and
    /// [`Error::Cache`] if a fresh automaton cannot be written.
    pub fn load_or_build(
        &self,
        grammar_text: &str,
        whitespace: bool,
        mode: LrMode,
    ) -> Result<(GrammarSource, Arc<SyntaxTable>), Error> {
        let source = GrammarSource::parse_with_whitespace(grammar_text, whitespace)?;
        let key = CacheKey::new(grammar_text, whitespace);
        let base = if mode == LrMode::Lr0 { LrMode::Lr0 } else { LrMode::Lr1 };

        let cached = match self.load(key, &source.grammar, base) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(error = %err, "ignoring unusable cached automaton");
                None
            }
        };
        let mut graph = match cached {
            Some(graph) => graph,
            None => {
                let graph = StateGraph::build(&source.grammar, base);
                self.store(key, &graph)?;
                graph
            }
        };
        if mode == LrMode::Lalr {
            graph.convert_lalr();
        }
        let table = SyntaxTable::build(graph, Arc::new(source.grammar.clone()));
        Ok((source, Arc::new(table)))
    }
}
