//! Moving tensors into and out of templates
//!
//! ```text
//! inject:   tensor (canonical) ──gather(perm⁻¹, loop stride 0)──► template block
//! extract:  template block ──gather(perm, loop index fixed)──► tensor (canonical)
//! ```
//!
//! Both directions are a single [`strided_gather`] whose source strides are
//! derived from the template's [`Permutation`]. A zero stride on every loop
//! axis tiles the tensor across all loop iterations on injection; extraction
//! reads one loop iteration (index 0 unless selected with [`extract_at`]).

use crate::axis::{AxisMap, CoreAxis};
use crate::error::{KspaceError, KspaceResult};
use crate::remap::{row_major_strides, strided_gather};
use crate::template::RawContainer;
use crate::types::{KSpaceShape, KSpaceTensor, Sample};

/// Resolve the core axes of a template.
pub fn discover_axes<C: RawContainer + ?Sized>(template: &C) -> KspaceResult<AxisMap> {
    let map = AxisMap::discover(&template.labels())?;
    tracing::debug!(
        labels = ?template.labels(),
        permutation = ?map.permutation().as_array(),
        loops = map.loop_axes().len(),
        "resolved template axes"
    );
    Ok(map)
}

/// Check that every core extent of the template equals the tensor's.
pub fn validate_shape<C: RawContainer + ?Sized>(template: &C, tensor: &KSpaceTensor) -> KspaceResult<AxisMap> {
    let map = discover_axes(template)?;
    let extents = template.extents();
    let shape = tensor.shape();
    for axis in CoreAxis::CANONICAL {
        let required = extents[map.position(axis)];
        let supplied = shape.extent(axis);
        if required != supplied {
            return Err(KspaceError::shape_mismatch(axis, required, supplied));
        }
    }
    Ok(map)
}

/// Template position of each canonical axis, routed through the permutation.
fn core_positions(map: &AxisMap) -> [usize; 4] {
    let sorted = map.core_positions_sorted();
    let perm = map.permutation();
    let mut positions = [0usize; 4];
    for (k, slot) in positions.iter_mut().enumerate() {
        *slot = sorted[perm[k]];
    }
    positions
}

fn gather_into_template(map: &AxisMap, extents: &[usize], tensor: &KSpaceTensor) -> Vec<Sample> {
    if !map.has_loops() && map.permutation().is_identity() {
        return tensor.as_slice().to_vec();
    }

    let tensor_strides = tensor.shape().strides();
    let sorted = map.core_positions_sorted();
    let inverse = map.permutation().inverse();

    // loop axes keep stride 0 and broadcast
    let mut src_strides = vec![0usize; extents.len()];
    for (rank, &position) in sorted.iter().enumerate() {
        src_strides[position] = tensor_strides[inverse[rank]];
    }
    strided_gather(tensor.as_slice(), 0, extents, &src_strides)
}

/// Build a block shaped like the template holding `tensor`, tiled over loop axes.
pub fn inject<C: RawContainer + ?Sized>(template: &C, tensor: &KSpaceTensor) -> KspaceResult<Vec<Sample>> {
    let map = validate_shape(template, tensor)?;
    Ok(gather_into_template(&map, &template.extents(), tensor))
}

/// Validate, inject and write the result back. The template is untouched on error.
pub fn inject_into_template<C: RawContainer + ?Sized>(template: &mut C, tensor: &KSpaceTensor) -> KspaceResult<()> {
    let map = validate_shape(&*template, tensor)?;
    let block = gather_into_template(&map, &template.extents(), tensor);
    template.write_block(block)?;
    tracing::info!(
        shape = %tensor.shape(),
        tiles = template.block_len() / tensor.shape().len(),
        "injected tensor into template"
    );
    Ok(())
}

/// Read the tensor back out of a template at loop index 0 on every loop axis.
///
/// Later loop iterations are not read; use [`extract_at`] to pick one.
pub fn extract<C: RawContainer + ?Sized>(template: &C) -> KspaceResult<KSpaceTensor> {
    let map = discover_axes(template)?;
    let selection = vec![0usize; map.loop_axes().len()];
    extract_with_map(template, &map, &selection)
}

/// Read the tensor at an explicit index along each loop axis (in template order).
pub fn extract_at<C: RawContainer + ?Sized>(template: &C, selection: &[usize]) -> KspaceResult<KSpaceTensor> {
    let map = discover_axes(template)?;
    extract_with_map(template, &map, selection)
}

fn extract_with_map<C: RawContainer + ?Sized>(
    template: &C,
    map: &AxisMap,
    selection: &[usize],
) -> KspaceResult<KSpaceTensor> {
    let extents = template.extents();
    let labels = template.labels();
    if selection.len() != map.loop_axes().len() {
        return Err(KspaceError::shape_mismatch(
            "loop selection length",
            map.loop_axes().len(),
            selection.len(),
        ));
    }

    let template_strides = row_major_strides(&extents);
    let mut base = 0;
    for (&position, &index) in map.loop_axes().iter().zip(selection) {
        if index >= extents[position] {
            return Err(KspaceError::shape_mismatch(labels[position], extents[position], index));
        }
        base += index * template_strides[position];
    }

    let positions = core_positions(map);
    let shape = KSpaceShape::from_extents(positions.map(|p| extents[p]))?;

    // tensor storage is row-major over the canonical axes reversed
    let dst_shape: Vec<usize> = shape.extents().into_iter().rev().collect();
    let src_strides: Vec<usize> = positions.iter().rev().map(|&p| template_strides[p]).collect();

    let block = template.read_block()?;
    if block.len() != template.block_len() {
        return Err(KspaceError::InvalidDimensions(format!(
            "template block holds {} samples, axes declare {}",
            block.len(),
            template.block_len()
        )));
    }
    let data = strided_gather(&block, base, &dst_shape, &src_strides);
    tracing::debug!(%shape, ?selection, "extracted tensor from template");
    KSpaceTensor::from_vec(shape, data)
}
