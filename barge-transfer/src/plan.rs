use serde::{Deserialize, Serialize};

use crate::{TransferError, TransferResult};

/// Deterministic decomposition of a file into fixed-size parts.
///
/// Computed once at session start and immutable afterwards. Recomputing the
/// plan for the same inputs always yields the same part boundaries, which is
/// what makes a crashed upload resumable: recompute, then diff against the
/// parts already committed on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePlan {
    pub total_size: u64,
    pub chunk_size: u64,
    pub part_count: u32,
}

/// Byte range of a single part within the planned file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based part number
    pub part_number: u32,
    pub offset: u64,
    pub length: u64,
}

impl FilePlan {
    /// Plan the part decomposition of a file.
    ///
    /// Fails with `InvalidInput` when either size is zero.
    pub fn new(total_size: u64, chunk_size: u64) -> TransferResult<Self> {
        if total_size == 0 {
            return Err(TransferError::invalid_input("total size must be non-zero"));
        }
        if chunk_size == 0 {
            return Err(TransferError::invalid_input("chunk size must be non-zero"));
        }

        let count = total_size.div_ceil(chunk_size);
        let part_count = u32::try_from(count).map_err(|_| {
            TransferError::invalid_input(format!(
                "{total_size} bytes in {chunk_size}-byte chunks needs {count} parts, beyond the u32 part-number space"
            ))
        })?;

        Ok(Self {
            total_size,
            chunk_size,
            part_count,
        })
    }

    /// Byte range of one part; `None` when the part number is outside the plan
    pub fn part(&self, part_number: u32) -> Option<PartSpec> {
        if part_number == 0 || part_number > self.part_count {
            return None;
        }
        let offset = (u64::from(part_number) - 1) * self.chunk_size;
        let length = self.chunk_size.min(self.total_size - offset);
        Some(PartSpec {
            part_number,
            offset,
            length,
        })
    }

    /// All parts in ascending part-number order
    pub fn parts(&self) -> impl Iterator<Item = PartSpec> + '_ {
        let plan = *self;
        (1..=plan.part_count).map(move |part_number| {
            let offset = (u64::from(part_number) - 1) * plan.chunk_size;
            PartSpec {
                part_number,
                offset,
                length: plan.chunk_size.min(plan.total_size - offset),
            }
        })
    }

    /// Whether a part number falls inside this plan
    pub fn contains_part(&self, part_number: u32) -> bool {
        part_number >= 1 && part_number <= self.part_count
    }
}
