//! Fixed-capacity per-iteration statistics table.
//!
//! Row `i` holds the data recorded at inner iteration `i` of the most recent
//! `evaluate` call: `[qp_status, qp_iter, (qp residuals)?, (nlp residuals)?]`.
//! The column layout is fixed at `assign` time from `rti_log_residuals` and
//! `ext_qp_res` and never changes afterwards.

use rti_common::residuals::Residuals;
use rti_common::status::QpStatus;

use crate::arena::ByteArena;
use crate::MAX_STAT_ROWS;

/// Column offset where QP residuals begin, if `ext_qp_res` is set.
const QP_RES_COL: usize = 2;

/// A fixed-size, row-major statistics table with `stat_m` rows of `stat_n`
/// columns each, carved once out of the arena and reused (overwritten, not
/// reallocated) by every `evaluate` call.
#[derive(Debug, Clone, Copy)]
pub struct StatsTable<'a> {
    data: &'a mut [f64],
    stat_m: usize,
    stat_n: usize,
    ext_qp_res: bool,
    log_nlp_res: bool,
}

impl<'a> StatsTable<'a> {
    /// Row count: `2 + as_rti_iter` (2 rows cover the standard
    /// linearize+solve pass; each AS-RTI inner iteration adds one).
    pub fn stat_m(as_rti_iter: u32) -> usize {
        2 + as_rti_iter as usize
    }

    /// Column count: 2 fixed columns (`qp_status`, `qp_iter`) plus 4 more for
    /// each of `ext_qp_res` and `rti_log_residuals` that is enabled.
    pub fn stat_n(log_nlp_res: bool, ext_qp_res: bool) -> usize {
        2 + 4 * (log_nlp_res as usize) + 4 * (ext_qp_res as usize)
    }

    pub fn calculate_size(as_rti_iter: u32, log_nlp_res: bool, ext_qp_res: bool) -> usize {
        let rows = Self::stat_m(as_rti_iter).min(MAX_STAT_ROWS);
        let cols = Self::stat_n(log_nlp_res, ext_qp_res);
        ByteArena::size_for::<f64>(rows * cols)
    }

    pub fn assign(
        arena: &mut ByteArena<'a>,
        as_rti_iter: u32,
        log_nlp_res: bool,
        ext_qp_res: bool,
    ) -> Self {
        let stat_m = Self::stat_m(as_rti_iter).min(MAX_STAT_ROWS);
        let stat_n = Self::stat_n(log_nlp_res, ext_qp_res);
        let data = arena.alloc_slice::<f64>(stat_m * stat_n);
        Self { data, stat_m, stat_n, ext_qp_res, log_nlp_res }
    }

    pub fn rows(&self) -> usize {
        self.stat_m
    }

    pub fn cols(&self) -> usize {
        self.stat_n
    }

    fn row_slice_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.stat_n;
        &mut self.data[start..start + self.stat_n]
    }

    /// Zeroes every entry, e.g. at the start of a fresh `evaluate` call.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Records the QP outcome for iteration `row`.
    pub fn record_qp(&mut self, row: usize, status: QpStatus, iters: u32) {
        let r = self.row_slice_mut(row);
        r[0] = status as u8 as f64;
        r[1] = iters as f64;
    }

    /// Records external QP residuals for iteration `row`, when `ext_qp_res`
    /// is enabled; a no-op otherwise.
    pub fn record_qp_residuals(&mut self, row: usize, res: Residuals) {
        if !self.ext_qp_res {
            return;
        }
        let r = self.row_slice_mut(row);
        r[QP_RES_COL..QP_RES_COL + 4].copy_from_slice(&res.as_columns());
    }

    /// Column offset where NLP residuals begin: `2 + 4 * ext_qp_res`.
    fn nlp_res_col(&self) -> usize {
        2 + 4 * (self.ext_qp_res as usize)
    }

    /// Records NLP KKT residuals for iteration `row`, when
    /// `rti_log_residuals` is enabled; a no-op otherwise.
    pub fn record_nlp_residuals(&mut self, row: usize, res: Residuals) {
        if !self.log_nlp_res {
            return;
        }
        let col = self.nlp_res_col();
        let r = self.row_slice_mut(row);
        r[col..col + 4].copy_from_slice(&res.as_columns());
    }

    /// Returns a copy of row `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.stat_n;
        &self.data[start..start + self.stat_n]
    }

    /// Builds the `"statistics"` getter's transposed view: iteration index
    /// prepended as column 0, one row per column of the underlying table,
    /// clipped to `min(stat_m, iter + 1)` rows of actual data.
    ///
    /// Returned as a flat row-major buffer of shape `(stat_n + 1, n_iter)`.
    pub fn transposed(&self, iter: usize, out: &mut [f64]) {
        let n_iter = self.stat_m.min(iter + 1);
        let n_row = self.stat_n + 1;
        debug_assert!(out.len() >= n_row * n_iter);
        for ii in 0..n_iter {
            out[ii] = ii as f64;
        }
        for jj in 0..self.stat_n {
            for ii in 0..n_iter {
                out[ii + (jj + 1) * n_iter] = self.data[ii * self.stat_n + jj];
            }
        }
    }
}
