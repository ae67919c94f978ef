//! Symbol resolution: mapping a raw observation to a symbol id.
//!
//! Resolution is deterministic and side-effect free. An observation that maps
//! to no symbol resolves to `None` and is skipped by the classifiers.

use clap::ValueEnum;
use gm_config::SymbolSpec;
use serde::{Deserialize, Serialize};

/// Maps a raw observation to a symbol id, given the model's ordered symbols.
pub trait SymbolResolver<T> {
    /// Returns the symbol id, or `None` when nothing matches.
    fn resolve(&self, symbols: &[T], raw: &str) -> Option<usize>;
}

impl<T, F> SymbolResolver<T> for F
where
    F: Fn(&[T], &str) -> Option<usize>,
{
    fn resolve(&self, symbols: &[T], raw: &str) -> Option<usize> {
        self(symbols, raw)
    }
}

/// Axis-aligned latitude/longitude box, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_lat, min_lon, max_lat, max_lon]: [f64; 4]) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }
}

/// Symbol payload for geographic models: a named sub-area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bounds: Option<BoundingBox>,
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl From<SymbolSpec> for Region {
    fn from(symbol: SymbolSpec) -> Self {
        Self {
            name: symbol.name,
            bounds: symbol.bbox.map(BoundingBox::from),
        }
    }
}

/// Resolves an observation by exact symbol name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl<T: AsRef<str>> SymbolResolver<T> for NameResolver {
    fn resolve(&self, symbols: &[T], raw: &str) -> Option<usize> {
        let key = raw.trim();
        symbols.iter().position(|s| s.as_ref() == key)
    }
}

/// Resolves a `"lat,lon"` observation to the first region containing it.
///
/// Regions are scanned in id order, so overlapping boxes resolve to the lowest id.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBoxResolver;

impl BoundingBoxResolver {
    /// Parse `"lat,lon"`; anything else is None.
    pub fn parse_point(raw: &str) -> Option<(f64, f64)> {
        let (lat, lon) = raw.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        Some((lat, lon))
    }
}

impl SymbolResolver<Region> for BoundingBoxResolver {
    fn resolve(&self, symbols: &[Region], raw: &str) -> Option<usize> {
        let (lat, lon) = Self::parse_point(raw)?;
        symbols
            .iter()
            .position(|r| r.bounds.is_some_and(|b| b.contains(lat, lon)))
    }
}

/// Resolver choice for command-line use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Bounding boxes when every symbol has one, names otherwise
    #[default]
    Auto,
    /// Exact symbol name
    Name,
    /// `lat,lon` point inside a symbol's bounding box
    Bbox,
}

/// Either resolver, picked at runtime.
#[derive(Debug, Clone, Copy)]
pub enum RegionResolver {
    Name(NameResolver),
    BoundingBox(BoundingBoxResolver),
}

impl RegionResolver {
    /// Pick a resolver for a set of regions.
    pub fn for_regions(kind: ResolverKind, regions: &[Region]) -> Self {
        match kind {
            ResolverKind::Name => RegionResolver::Name(NameResolver),
            ResolverKind::Bbox => RegionResolver::BoundingBox(BoundingBoxResolver),
            ResolverKind::Auto => {
                if !regions.is_empty() && regions.iter().all(|r| r.bounds.is_some()) {
                    RegionResolver::BoundingBox(BoundingBoxResolver)
                } else {
                    RegionResolver::Name(NameResolver)
                }
            }
        }
    }
}

impl SymbolResolver<Region> for RegionResolver {
    fn resolve(&self, symbols: &[Region], raw: &str) -> Option<usize> {
        match self {
            RegionResolver::Name(r) => r.resolve(symbols, raw),
            RegionResolver::BoundingBox(r) => r.resolve(symbols, raw),
        }
    }
}
