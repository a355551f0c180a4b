/// Default column cap for contact sheets.
pub const DEFAULT_MAX_COLUMNS: u32 = 5;

/// Row/column tiling for a contact sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub rows: u32,
    pub columns: u32,
}

impl GridShape {
    pub fn cells(self) -> u64 {
        u64::from(self.rows) * u64::from(self.columns)
    }

    /// `(row, column)` of the `idx`-th tile, filled row by row.
    pub fn position(self, idx: u32) -> (u32, u32) {
        let cols = self.columns.max(1);
        (idx / cols, idx % cols)
    }
}

/// Smallest row count whose ceil-divided column count is both `<= rows` and `<= max_columns`.
///
/// `n == 0` yields an empty `0x0` grid.
pub fn compute_grid(n: u32, max_columns: u32) -> GridShape {
    if n == 0 {
        return GridShape {
            rows: 0,
            columns: 0,
        };
    }
    let max_columns = max_columns.max(1);
    let mut rows = 1u32;
    loop {
        let columns = n.div_ceil(rows);
        if columns <= rows && columns <= max_columns {
            return GridShape { rows, columns };
        }
        rows += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/grid.rs"]
mod tests;
