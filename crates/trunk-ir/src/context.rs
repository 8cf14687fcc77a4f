//! `IrContext`: arena storage for every IR entity.
//!
//! Operations, values, blocks and regions live in `PrimaryMap`s owned by the
//! context. Operand and result lists are `EntityList`s backed by shared
//! `ListPool`s. Use-chains are maintained on every mutation that touches an
//! operand list, so `replace_all_uses` never has to scan the IR.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::location::Location;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::*;

/// A single use of a value: which operation reads it, at which operand index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

/// Data for a single operation.
pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 2]>,
    pub parent_block: Option<BlockRef>,
}

impl OperationData {
    /// Whether this operation is `dialect.name`.
    pub fn is(&self, dialect: Symbol, name: Symbol) -> bool {
        self.dialect == dialect && self.name == name
    }
}

/// Data for a single SSA value.
pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

/// Data for a basic block.
pub struct BlockData {
    pub location: Location,
    pub arg_types: Vec<TypeRef>,
    pub ops: SmallVec<[OpRef; 8]>,
    pub parent_region: Option<RegionRef>,
}

impl BlockData {
    /// An empty, unattached block with the given argument types.
    pub fn new(location: Location, arg_types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            location,
            arg_types: arg_types.into_iter().collect(),
            ops: SmallVec::new(),
            parent_region: None,
        }
    }
}

/// Data for a region (list of blocks).
pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 2]>,
    pub parent_op: Option<OpRef>,
}

/// Arena-based mutable IR context.
pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    pub types: TypeInterner,
    pub paths: PathInterner,

    value_pool: ListPool<ValueRef>,
    type_pool: ListPool<TypeRef>,

    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self {
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            regions: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            types: TypeInterner::new(),
            paths: PathInterner::new(),
            value_pool: ListPool::new(),
            type_pool: ListPool::new(),
            result_values: SecondaryMap::new(),
            block_arg_values: SecondaryMap::new(),
        }
    }

    /// Location rooted at `path` with an empty span. Handy for synthesized IR.
    pub fn location(&mut self, path: &str) -> Location {
        let path = self.paths.intern(path.to_owned());
        Location::new(path, Default::default())
    }

    // ========================================================================
    // Operation
    // ========================================================================

    /// Create a detached operation and allocate its result values.
    ///
    /// # Panics
    ///
    /// Panics if `data.parent_block` is set or if one of `data.regions`
    /// already belongs to another operation.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: operation must not have parent_block set; \
             use push_op to attach it after creation",
        );

        let operands: SmallVec<[ValueRef; 8]> = data.operands.as_slice(&self.value_pool).into();
        let result_types: SmallVec<[TypeRef; 4]> = data.results.as_slice(&self.type_pool).into();
        let regions = data.regions.clone();

        let op = self.ops.push(data);

        for &r in &regions {
            if let Some(owner) = self.regions[r].parent_op {
                panic!("create_op: region {r} already belongs to operation {owner}");
            }
            self.regions[r].parent_op = Some(op);
        }

        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].push(Use {
                user: op,
                operand_index: idx as u32,
            });
        }

        let mut results = EntityList::new();
        for (idx, &ty) in result_types.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::OpResult(op, idx as u32),
                ty,
            });
            results.push(v, &mut self.value_pool);
        }
        self.result_values[op] = results;

        op
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    /// Mutable access to operation data.
    ///
    /// Editing `operands` through this desyncs the use-chain; go through
    /// `replace_all_uses` instead.
    pub fn op_mut(&mut self, op: OpRef) -> &mut OperationData {
        &mut self.ops[op]
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.result_values[op].as_slice(&self.value_pool)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    /// `dialect.name` of an operation, for diagnostics.
    pub fn op_full_name(&self, op: OpRef) -> String {
        let data = &self.ops[op];
        format!("{}.{}", data.dialect, data.name)
    }

    /// Drop an operation's operand uses.
    ///
    /// The operation must already be detached from its block.
    ///
    /// # Panics
    ///
    /// Panics if the op is still attached or any of its results still has uses.
    pub fn remove_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            panic!("remove_op: operation {op} is still attached to block {block}");
        }

        for &val in self.result_values[op].as_slice(&self.value_pool) {
            assert!(
                self.uses[val].is_empty(),
                "remove_op: result value {val} still has {} use(s)",
                self.uses[val].len()
            );
        }

        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].retain(|u| !(u.user == op && u.operand_index == idx as u32));
        }
    }

    // ========================================================================
    // Value
    // ========================================================================

    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// The operation defining `v`, if it is an op result.
    pub fn defining_op(&self, v: ValueRef) -> Option<OpRef> {
        self.values[v].def.op()
    }

    // ========================================================================
    // Block
    // ========================================================================

    /// Create a block and allocate its argument values.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let arg_types = data.arg_types.clone();
        let block = self.blocks.push(data);

        let mut args = EntityList::new();
        for (idx, ty) in arg_types.into_iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::BlockArg(block, idx as u32),
                ty,
            });
            args.push(v, &mut self.value_pool);
        }
        self.block_arg_values[block] = args;

        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_arg_values[b].as_slice(&self.value_pool)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// Append a new argument to an existing block.
    pub fn add_block_arg(&mut self, b: BlockRef, ty: TypeRef) -> ValueRef {
        let index = self.blocks[b].arg_types.len() as u32;
        self.blocks[b].arg_types.push(ty);
        let v = self.values.push(ValueData {
            def: ValueDef::BlockArg(b, index),
            ty,
        });
        self.block_arg_values[b].push(v, &mut self.value_pool);
        v
    }

    /// Append an operation to the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        if let Some(owner) = self.ops[op].parent_block {
            panic!("push_op: operation {op} already belongs to block {owner}");
        }
        self.ops[op].parent_block = Some(block);
        self.blocks[block].ops.push(op);
    }

    /// Insert an operation right before `before` in `block`.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block or `before` is not
    /// in `block`.
    pub fn insert_op_before(&mut self, block: BlockRef, before: OpRef, op: OpRef) {
        if let Some(owner) = self.ops[op].parent_block {
            panic!("insert_op_before: operation {op} already belongs to block {owner}");
        }
        let ops = &mut self.blocks[block].ops;
        let Some(pos) = ops.iter().position(|&o| o == before) else {
            panic!("insert_op_before: {before} is not in {block}");
        };
        ops.insert(pos, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Unlink an operation from `block` without destroying it.
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) {
        self.blocks[block].ops.retain(|o| *o != op);
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
    }

    /// Unlink an operation from whatever block holds it.
    pub fn detach_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            self.remove_op_from_block(block, op);
        }
    }

    // ========================================================================
    // Region
    // ========================================================================

    /// Create a region over `data.blocks`.
    ///
    /// # Panics
    ///
    /// Panics if any block already belongs to another region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let blocks = data.blocks.clone();
        let region = self.regions.push(data);
        for &b in &blocks {
            if let Some(owner) = self.blocks[b].parent_region {
                panic!("create_region: block {b} already belongs to region {owner}");
            }
            self.blocks[b].parent_region = Some(region);
        }
        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    // ========================================================================
    // Use-chain
    // ========================================================================

    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Rewrite every operand reading `old` to read `new`.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let old_uses = std::mem::take(&mut self.uses[old]);
        for u in old_uses {
            let slice = self.ops[u.user]
                .operands
                .as_mut_slice(&mut self.value_pool);
            debug_assert_eq!(slice[u.operand_index as usize], old);
            slice[u.operand_index as usize] = new;
            self.uses[new].push(u);
        }
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `OperationData`.
///
/// Operands and result types are collected into `Vec`s and packed into the
/// context's pools on `build()`.
pub struct OperationDataBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: Vec<ValueRef>,
    results: Vec<TypeRef>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 2]>,
}

impl OperationDataBuilder {
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: Vec::new(),
            results: Vec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.results.push(ty);
        self
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.results.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn attrs(mut self, attrs: impl IntoIterator<Item = (Symbol, Attribute)>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        operands.extend(self.operands, &mut ctx.value_pool);
        let mut results = EntityList::new();
        results.extend(self.results, &mut ctx.type_pool);
        OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            operands,
            results,
            attributes: self.attributes,
            regions: self.regions,
            parent_block: None,
        }
    }
}
