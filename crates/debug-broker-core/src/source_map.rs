//! Source-map engine: resolves a script's source-map reference, parses it
//! with the real `sourcemap` crate, and serves the four bidirectional-
//! position queries. A failure anywhere in loading is swallowed — the
//! script stays debuggable without original-source projection, logged at
//! warn level rather than surfaced as a session error.
//!
//! Line numbers are 1-based and columns 0-based throughout this module's
//! public API. Callers crossing the wire boundary (0-based generated lines)
//! convert via `GeneratedLine0::to_source_map_line`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::RwLock;
use tracing::warn;
use url::Url;

use crate::types::ScriptId;

const DATA_URL_PREFIX: &str = "data:application/json";

/// Fetches the bytes behind a resolved source-map URL. Injected so tests can
/// substitute scripted maps instead of touching the filesystem or network.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<Vec<u8>>;
}

/// `file://` via `tokio::fs`, `http(s)://` via `reqwest`. Any other scheme,
/// or any I/O failure, yields `None` rather than an error — the caller
/// already treats a missing map as "swallow and continue".
pub struct DefaultSourceFetcher {
    http: reqwest::Client,
}

impl Default for DefaultSourceFetcher {
    fn default() -> Self {
        DefaultSourceFetcher {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SourceFetcher for DefaultSourceFetcher {
    async fn fetch(&self, url: &Url) -> Option<Vec<u8>> {
        match url.scheme() {
            "file" => {
                let path = url.to_file_path().ok()?;
                tokio::fs::read(path).await.ok()
            }
            "http" | "https" => {
                let resp = self.http.get(url.clone()).send().await.ok()?;
                resp.bytes().await.ok().map(|b| b.to_vec())
            }
            _ => None,
        }
    }
}

/// A resolved generated→original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

/// A resolved original→generated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedPosition {
    pub line: u32,
    pub column: u32,
}

struct LoadedMap {
    consumer: sourcemap::SourceMap,
    /// Reverse index: (source index, 1-based original line, 0-based original
    /// column) → 1-based generated line, 0-based generated column. The
    /// `sourcemap` crate only natively supports generated→original lookup,
    /// so original→generated is served from this hand-built index.
    reverse: HashMap<(u32, u32, u32), GeneratedPosition>,
}

/// Owns every loaded source-map consumer for one session, keyed by the
/// script that declared it. Scoped to the session: released wholesale on
/// session teardown, no cross-session sharing.
pub struct SourceMapEngine {
    fetcher: Arc<dyn SourceFetcher>,
    maps: RwLock<HashMap<ScriptId, LoadedMap>>,
}

impl SourceMapEngine {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        SourceMapEngine {
            fetcher,
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// Load (or attempt to load) the source map for `script_id`, declared by
    /// a `scriptParsed` event carrying `source_map_url` relative to
    /// `script_url`. Non-blocking for the event stream: callers should
    /// `tokio::spawn` this rather than await it inline.
    pub async fn load_for_script(&self, script_id: ScriptId, script_url: &str, source_map_url: &str) {
        let bytes = match self.resolve_and_fetch(script_url, source_map_url).await {
            Some(bytes) => bytes,
            None => {
                warn!(script = %script_id, "source map unavailable, continuing without it");
                return;
            }
        };

        let consumer = match sourcemap::SourceMap::from_slice(&bytes) {
            Ok(c) => c,
            Err(e) => {
                warn!(script = %script_id, error = %e, "source map failed to parse");
                return;
            }
        };

        let reverse = build_reverse_index(&consumer);
        self.maps.write().await.insert(script_id, LoadedMap { consumer, reverse });
    }

    async fn resolve_and_fetch(&self, script_url: &str, source_map_url: &str) -> Option<Vec<u8>> {
        if let Some(encoded) = source_map_url.strip_prefix(DATA_URL_PREFIX) {
            let b64 = encoded.split_once(";base64,").map(|(_, b)| b)?;
            return BASE64.decode(b64).ok();
        }

        let resolved = resolve_source_map_url(script_url, source_map_url)?;
        self.fetcher.fetch(&resolved).await
    }

    pub async fn has_map(&self, script_id: &ScriptId) -> bool {
        self.maps.read().await.contains_key(script_id)
    }

    /// Query 1: generated position → original position.
    pub async fn generated_to_original(
        &self,
        script_id: &ScriptId,
        line: u32,
        column: u32,
    ) -> Option<OriginalPosition> {
        let maps = self.maps.read().await;
        let loaded = maps.get(script_id)?;
        let token = loaded.consumer.lookup_token(line.saturating_sub(1), column)?;
        let source = token.get_source()?.to_owned();
        Some(OriginalPosition {
            source,
            line: token.get_src_line() + 1,
            column: token.get_src_col(),
            name: token.get_name().map(str::to_owned),
        })
    }

    /// Query 2: original position → generated position, via the reverse
    /// index built when the map was loaded.
    pub async fn original_to_generated(
        &self,
        script_id: &ScriptId,
        source: &str,
        line: u32,
        column: u32,
    ) -> Option<GeneratedPosition> {
        let maps = self.maps.read().await;
        let loaded = maps.get(script_id)?;
        let source_index = loaded.consumer.sources().position(|s| s == source)? as u32;
        loaded.reverse.get(&(source_index, line, column)).copied()
    }

    /// Query 3: the text of one declared original source, if the map
    /// carried `sourcesContent` for it.
    pub async fn source_content(&self, script_id: &ScriptId, source: &str) -> Option<String> {
        let maps = self.maps.read().await;
        let loaded = maps.get(script_id)?;
        let index = loaded.consumer.sources().position(|s| s == source)?;
        loaded.consumer.get_source_contents(index as u32).map(str::to_owned)
    }

    /// Query 4: every source path the map declares, in map order.
    pub async fn sources(&self, script_id: &ScriptId) -> Option<Vec<String>> {
        let maps = self.maps.read().await;
        let loaded = maps.get(script_id)?;
        Some(loaded.consumer.sources().map(str::to_owned).collect())
    }
}

fn build_reverse_index(consumer: &sourcemap::SourceMap) -> HashMap<(u32, u32, u32), GeneratedPosition> {
    let mut index = HashMap::new();
    for token in consumer.tokens() {
        if let Some(src_id) = token.get_source_id() {
            index.entry((src_id, token.get_src_line() + 1, token.get_src_col())).or_insert(GeneratedPosition {
                line: token.get_dst_line() + 1,
                column: token.get_dst_col(),
            });
        }
    }
    index
}

/// Resolve a (possibly relative, possibly data-URL already handled by the
/// caller) source-map URL against the script's own URL, per standard URL
/// join rules.
fn resolve_source_map_url(script_url: &str, source_map_url: &str) -> Option<Url> {
    if let Ok(absolute) = Url::parse(source_map_url) {
        return Some(absolute);
    }
    let base = Url::parse(script_url).ok()?;
    base.join(source_map_url).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_source_map_url_against_script_url() {
        let resolved = resolve_source_map_url("file:///d/b.js", "b.js.map").unwrap();
        assert_eq!(resolved.as_str(), "file:///d/b.js.map");
    }

    #[test]
    fn preserves_absolute_source_map_urls() {
        let resolved = resolve_source_map_url("file:///d/b.js", "https://cdn.example/b.js.map").unwrap();
        assert_eq!(resolved.scheme(), "https");
    }

    #[tokio::test]
    async fn unknown_script_id_yields_no_map_results() {
        let engine = SourceMapEngine::new(Arc::new(DefaultSourceFetcher::default()));
        let script = ScriptId("s-missing".to_owned());
        assert!(!engine.has_map(&script).await);
        assert!(engine.generated_to_original(&script, 1, 0).await.is_none());
        assert!(engine.sources(&script).await.is_none());
    }

    struct StaticFetcher {
        body: Vec<u8>,
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        async fn fetch(&self, _url: &Url) -> Option<Vec<u8>> {
            Some(self.body.clone())
        }
    }

    /// Maps generated (1-based line 11, col 0) -> original (src/a.ts,
    /// 1-based line 6, col 2, name "f"). Same `mappings` payload as the
    /// broader paused-call-stack integration scenario.
    fn static_source_map_json() -> Vec<u8> {
        let doc = serde_json::json!({
            "version": 3,
            "sources": ["src/a.ts"],
            "sourcesContent": ["// contents"],
            "names": ["f"],
            "mappings": ";;;;;;;;;;AAKEA",
        });
        serde_json::to_vec(&doc).unwrap()
    }

    #[tokio::test]
    async fn reverse_projection_round_trips_back_to_the_original_generated_line() {
        let engine = SourceMapEngine::new(Arc::new(StaticFetcher { body: static_source_map_json() }));
        let script = ScriptId("s-1".to_owned());
        engine.load_for_script(script.clone(), "file:///d/b.js", "b.js.map").await;

        let original = engine
            .generated_to_original(&script, 11, 0)
            .await
            .expect("forward projection resolves");
        assert_eq!(original.source, "src/a.ts");
        assert_eq!(original.line, 6);

        let generated = engine
            .original_to_generated(&script, &original.source, original.line, original.column)
            .await
            .expect("reverse projection resolves");
        assert_eq!(generated.line, 11, "reverse projection must land back on the original generated line");
    }
}
