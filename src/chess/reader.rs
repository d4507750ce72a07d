use super::error::SourceError;
use super::metadata::variant;
use super::types::GameRecord;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read + Send>;

static EVENT_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\[Event\s+""#).unwrap());
static GAME_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\[Event\s+""#).unwrap());

const STANDARD_VARIANTS: [&str; 2] = ["standard", "chess"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(SourceError::Compression(normalized.to_string()))
        }
    }

    /// `.zst` files are decoded, everything else is read as text.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Splits a multi-game blob at every `[Event "` tag. Segments that do not
/// start with that tag are dropped, as are non-standard variants. Returned
/// records are numbered in blob order.
pub fn split(blob: &str) -> Vec<GameRecord> {
    split_segments(blob)
        .into_iter()
        .filter(|segment| is_standard_variant(segment))
        .enumerate()
        .map(|(index, raw_pgn)| GameRecord {
            index,
            raw_pgn: raw_pgn.to_string(),
        })
        .collect()
}

fn split_segments(blob: &str) -> Vec<&str> {
    let mut cuts: Vec<usize> = EVENT_TAG.find_iter(blob).map(|m| m.start()).collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }
    cuts.push(blob.len());

    cuts.windows(2)
        .map(|w| blob[w[0]..w[1]].trim())
        .filter(|segment| !segment.is_empty() && GAME_START.is_match(segment))
        .collect()
}

fn is_standard_variant(game: &str) -> bool {
    match variant(game) {
        Some(name) => STANDARD_VARIANTS
            .iter()
            .any(|standard| name.trim().eq_ignore_ascii_case(standard)),
        None => true,
    }
}

/// Single path, or every match of a glob pattern.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, SourceError> {
    if pattern.contains('*') || pattern.contains('?') {
        let entries = glob::glob(pattern).map_err(|e| SourceError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
        if paths.is_empty() {
            return Err(SourceError::NoMatch(pattern.to_string()));
        }
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| SourceError::Decoder {
                path: path.to_path_buf(),
                source,
            }),
    }
}

fn read_one(path: &Path, compression: Option<CompressionMode>) -> Result<String, SourceError> {
    let mode = compression.unwrap_or_else(|| CompressionMode::detect(path));
    let mut input = open_input_stream(path, mode)?;
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads and concatenates every file matched by `pattern`. With an explicit
/// `compression` all files are decoded that way, otherwise per extension.
/// A bad file fails the call only when it is the sole match.
pub fn read_source(
    pattern: &str,
    compression: Option<CompressionMode>,
) -> Result<String, SourceError> {
    let paths = expand_paths(pattern)?;
    if paths.len() == 1 {
        return read_one(&paths[0], compression);
    }

    let mut blob = String::new();
    for path in &paths {
        match read_one(path, compression) {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "read PGN source");
                blob.push_str(&text);
                blob.push_str("\n\n");
            }
            Err(err) => warn!("{}", err),
        }
    }
    Ok(blob)
}
