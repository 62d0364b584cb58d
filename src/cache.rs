//! Identity-function caches.
//!
//! Zero-like and one-like generator subgraphs are memoized per abstract
//! type signature, as is the gradient-accumulation "add" subgraph. A hit
//! returns a fresh structural clone of the cached instance, never the
//! instance itself, so every graph node keeps exactly one owner.
//!
//! The caches are explicit injectable objects; a session borrows them
//! mutably for its lifetime, which gives the single-writer-at-a-time
//! discipline for free. Entries are never mutated after insertion.

use log::debug;
use rustc_hash::FxHashMap;

use crate::{error::Result, graph::Graph, graph::TypeSig, registry::BpropRegistry};

/// Two independent caches for zero-filled and one-filled "like" graphs.
#[derive(Debug, Default)]
pub struct LikeCache {
    zeros: FxHashMap<TypeSig, Graph>,
    ones: FxHashMap<TypeSig, Graph>,
}

impl LikeCache {
    pub fn new() -> Self {
        LikeCache::default()
    }

    /// A zero-like subgraph for `sig`. Built at most once per signature.
    pub fn zeros_like(&mut self, registry: &BpropRegistry, sig: &TypeSig) -> Result<Graph> {
        if let Some(cached) = self.zeros.get(sig) {
            debug!("cache hit for zeros_like: {sig}");
            return Ok(cached.clone());
        }
        let built = registry.build_zeros_like(sig)?;
        self.zeros.insert(sig.clone(), built.clone());
        Ok(built)
    }

    /// A one-like subgraph for `sig`. Built at most once per signature.
    pub fn ones_like(&mut self, registry: &BpropRegistry, sig: &TypeSig) -> Result<Graph> {
        if let Some(cached) = self.ones.get(sig) {
            debug!("cache hit for ones_like: {sig}");
            return Ok(cached.clone());
        }
        let built = registry.build_ones_like(sig)?;
        self.ones.insert(sig.clone(), built.clone());
        Ok(built)
    }

    /// Number of distinct signatures with a cached zero-like graph.
    pub fn zeros_entries(&self) -> usize {
        self.zeros.len()
    }

    /// Number of distinct signatures with a cached one-like graph.
    pub fn ones_entries(&self) -> usize {
        self.ones.len()
    }
}

/// Cache of gradient-accumulation subgraphs, keyed by signature.
#[derive(Debug, Default)]
pub struct AddCache {
    map: FxHashMap<TypeSig, Graph>,
}

impl AddCache {
    pub fn new() -> Self {
        AddCache::default()
    }

    /// The "add" subgraph combining two gradients of type `sig`.
    pub fn add_for(&mut self, registry: &BpropRegistry, sig: &TypeSig) -> Result<Graph> {
        if let Some(cached) = self.map.get(sig) {
            debug!("cache hit for hyper_add: {sig}");
            return Ok(cached.clone());
        }
        let built = registry.build_add(sig)?;
        self.map.insert(sig.clone(), built.clone());
        Ok(built)
    }

    pub fn entries(&self) -> usize {
        self.map.len()
    }
}

/// The caches a differentiation session draws from, bundled for
/// injection.
#[derive(Debug, Default)]
pub struct GradCaches {
    pub like: LikeCache,
    pub add: AddCache,
}

impl GradCaches {
    pub fn new() -> Self {
        GradCaches::default()
    }
}
