//! Remapping from batch inputs to canonical vertex IDs.
//!
//! Each batch reports where its input vertices ended up in the canonical
//! mesh, so callers can rewrite their own references. Flat inputs key the
//! remap by input index; block inputs key it by `(block index, offset
//! within block)` because that is how upstream consumers address vertices.
//!
//! Both flavors are fed through the [`RemapSink`] trait: the compressor
//! records `(input index, vertex id)` pairs, and each sink decides how to
//! key them. This keeps the batch algorithm independent of the input shape.

use std::collections::{BTreeMap, HashMap};

use crate::mesh::{BlockIndex, VertexId};

/// Destination for input-to-canonical remap entries produced by a batch.
pub trait RemapSink {
    /// Record that input vertex `input_index` maps to canonical `id`.
    fn record(&mut self, input_index: usize, id: VertexId);
}

/// Remap for flat input: input vertex index to canonical [`VertexId`].
///
/// Contains an entry for every input vertex referenced by a surviving
/// triangle, including inputs that collapsed onto the same committed
/// vertex.
#[derive(Debug, Clone, Default)]
pub struct FlatRemap {
    map: HashMap<usize, VertexId>,
}

impl FlatRemap {
    /// Look up the canonical ID an input vertex was mapped to.
    pub fn get(&self, input_index: usize) -> Option<VertexId> {
        self.map.get(&input_index).copied()
    }

    /// The number of remapped input vertices.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no input vertex was remapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(input index, canonical id)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, VertexId)> + '_ {
        self.map.iter().map(|(&i, &id)| (i, id))
    }
}

impl RemapSink for FlatRemap {
    fn record(&mut self, input_index: usize, id: VertexId) {
        self.map.insert(input_index, id);
    }
}

/// Remap for block input: `(block index, offset)` to canonical [`VertexId`].
///
/// Every block present in the input batch appears, even when none of its
/// vertices survived; such blocks carry an empty offset map.
#[derive(Debug, Clone, Default)]
pub struct BlockRemap {
    blocks: HashMap<BlockIndex, BTreeMap<usize, VertexId>>,
    /// Input index to `(block, offset)`, built while flattening the batch.
    layout: Vec<(BlockIndex, usize)>,
}

impl BlockRemap {
    /// Create a remap covering the given blocks, with the given flattened
    /// input layout.
    pub(crate) fn for_layout(
        block_order: impl Iterator<Item = BlockIndex>,
        layout: Vec<(BlockIndex, usize)>,
    ) -> Self {
        let mut blocks: HashMap<BlockIndex, BTreeMap<usize, VertexId>> = HashMap::new();
        for index in block_order {
            blocks.entry(index).or_default();
        }
        Self { blocks, layout }
    }

    /// Look up the canonical ID for a vertex addressed by block and offset.
    pub fn get(&self, block: BlockIndex, offset: usize) -> Option<VertexId> {
        self.blocks.get(&block)?.get(&offset).copied()
    }

    /// The offset map of a single block, if the block was in the batch.
    pub fn block(&self, index: BlockIndex) -> Option<&BTreeMap<usize, VertexId>> {
        self.blocks.get(&index)
    }

    /// The number of blocks covered (including empty ones).
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate over blocks and their offset maps in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockIndex, &BTreeMap<usize, VertexId>)> + '_ {
        self.blocks.iter().map(|(&b, m)| (b, m))
    }
}

impl RemapSink for BlockRemap {
    fn record(&mut self, input_index: usize, id: VertexId) {
        let (block, offset) = self.layout[input_index];
        self.blocks.entry(block).or_default().insert(offset, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_remap_records_latest() {
        let mut remap = FlatRemap::default();
        assert!(remap.is_empty());
        remap.record(3, VertexId::new(7));
        remap.record(3, VertexId::new(9));
        assert_eq!(remap.get(3), Some(VertexId::new(9)));
        assert_eq!(remap.get(4), None);
        assert_eq!(remap.len(), 1);
    }

    #[test]
    fn test_block_remap_routes_through_layout() {
        let a = BlockIndex::new(0, 0, 0);
        let b = BlockIndex::new(1, 0, 0);
        let layout = vec![(a, 0), (a, 1), (a, 2), (b, 0), (b, 1), (b, 2)];
        let mut remap = BlockRemap::for_layout([a, b].into_iter(), layout);

        remap.record(1, VertexId::new(5));
        remap.record(4, VertexId::new(5));

        assert_eq!(remap.get(a, 1), Some(VertexId::new(5)));
        assert_eq!(remap.get(b, 1), Some(VertexId::new(5)));
        assert_eq!(remap.get(a, 0), None);
        assert_eq!(remap.get(BlockIndex::new(9, 9, 9), 0), None);
    }

    #[test]
    fn test_block_remap_keeps_empty_blocks() {
        let a = BlockIndex::new(0, 0, 0);
        let b = BlockIndex::new(1, 0, 0);
        let remap = BlockRemap::for_layout([a, b].into_iter(), Vec::new());

        assert_eq!(remap.num_blocks(), 2);
        assert!(remap.block(b).unwrap().is_empty());
    }
}
