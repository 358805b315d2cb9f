//! OpenCL kernel source for the complex-to-arg conversion.

use crate::Sample;
use std::mem::size_of;

/// Kernel entry point name.
pub const ENTRY_POINT: &str = "complextoarg";

/// Address space of the kernel's input argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegime {
    /// `__constant`: cached reads, limited by the constant-memory budget.
    Constant,
    /// `__global`: no size limit beyond device memory.
    Global,
}

impl MemoryRegime {
    /// Regime for a batch of `item_count` samples under `max_const_items`.
    pub fn for_items(item_count: usize, max_const_items: usize) -> Self {
        if item_count <= max_const_items {
            MemoryRegime::Constant
        } else {
            MemoryRegime::Global
        }
    }

    /// OpenCL declaration of the input parameter for this regime.
    fn input_param(self) -> &'static str {
        match self {
            MemoryRegime::Constant => "__constant SComplex * a",
            MemoryRegime::Global => "__global SComplex * restrict a",
        }
    }
}

/// Number of samples that fit in a constant-memory budget of `budget_bytes`.
pub fn max_const_items(budget_bytes: u64) -> usize {
    let items = budget_bytes / size_of::<Sample>() as u64;
    usize::try_from(items).unwrap_or(usize::MAX)
}

/// Kernel source for `regime`; one work-item per sample.
pub fn kernel_source(regime: MemoryRegime) -> String {
    let mut src = String::with_capacity(320);
    src.push_str("struct ComplexStruct {\n");
    src.push_str("float real;\n");
    src.push_str("float imag; };\n");
    src.push_str("typedef struct ComplexStruct SComplex;\n");
    src.push_str(&format!(
        "__kernel void {}({}, __global float * restrict c) {{\n",
        ENTRY_POINT,
        regime.input_param()
    ));
    src.push_str("    size_t index =  get_global_id(0);\n");
    src.push_str("    c[index] = atan2(a[index].imag,a[index].real);\n");
    src.push_str("}\n");
    src
}

/// Regime declared by a kernel source, if it is one of ours.
pub fn regime_of(source: &str) -> Option<MemoryRegime> {
    if source.contains(MemoryRegime::Constant.input_param()) {
        Some(MemoryRegime::Constant)
    } else if source.contains(MemoryRegime::Global.input_param()) {
        Some(MemoryRegime::Global)
    } else {
        None
    }
}
