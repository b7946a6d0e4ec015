//! Client-held, user-editable copy of fetched analysis results.
//!
//! The buffer is a value: every edit returns a new [`EditBuffer`] and leaves
//! the receiver untouched. Plans are shared behind `Arc`, so an edit only
//! copies the one plan it touches and every other plan stays the same
//! allocation as before.

use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::error::BufferError;
use crate::models::{AnalysisPlan, AnalysisRow};

/// Text columns of a row that can be edited in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Chapter,
    StartTime,
    EndTime,
    Content,
}

impl RowField {
    pub const ALL: [RowField; 4] = [
        RowField::Chapter,
        RowField::StartTime,
        RowField::EndTime,
        RowField::Content,
    ];

    pub fn get<'a>(&self, row: &'a AnalysisRow) -> &'a str {
        match self {
            RowField::Chapter => &row.chapter_label,
            RowField::StartTime => &row.start_time,
            RowField::EndTime => &row.end_time,
            RowField::Content => &row.content,
        }
    }

    fn set(&self, row: &mut AnalysisRow, value: String) {
        match self {
            RowField::Chapter => row.chapter_label = value,
            RowField::StartTime => row.start_time = value,
            RowField::EndTime => row.end_time = value,
            RowField::Content => row.content = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditBuffer {
    plans: Vec<Arc<AnalysisPlan>>,
}

impl Serialize for EditBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.plans())
    }
}

impl EditBuffer {
    pub fn new(plans: Vec<AnalysisPlan>) -> Self {
        Self {
            plans: plans.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Plan at `index`.
    ///
    /// Selecting an index outside `0..plan_count()` is a caller error; the
    /// buffer reports it as `None` and never clamps to a neighbouring plan.
    pub fn plan(&self, index: usize) -> Option<&AnalysisPlan> {
        self.plans.get(index).map(Arc::as_ref)
    }

    pub fn plans(&self) -> impl Iterator<Item = &AnalysisPlan> {
        self.plans.iter().map(Arc::as_ref)
    }

    /// True when both buffers hold the very same allocation for plan `index`
    pub fn shares_plan_with(&self, other: &EditBuffer, index: usize) -> bool {
        match (self.plans.get(index), other.plans.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// New buffer with one text field of one row replaced
    pub fn with_field(
        &self,
        plan_index: usize,
        row_index: usize,
        field: RowField,
        value: impl Into<String>,
    ) -> Result<Self, BufferError> {
        let value = value.into();
        self.with_row(plan_index, row_index, |row| {
            field.set(row, value);
            Ok(())
        })
    }

    /// New buffer with the tag at `tag_index` removed from one row.
    ///
    /// `tag_index` addresses the row's full tag list, not the
    /// threshold-filtered view. Remaining tags keep their order.
    pub fn without_tag(
        &self,
        plan_index: usize,
        row_index: usize,
        tag_index: usize,
    ) -> Result<Self, BufferError> {
        self.with_row(plan_index, row_index, |row| {
            if tag_index >= row.tags.len() {
                return Err(BufferError::TagOutOfRange {
                    index: tag_index,
                    len: row.tags.len(),
                });
            }
            row.tags.remove(tag_index);
            Ok(())
        })
    }

    fn with_row<F>(&self, plan_index: usize, row_index: usize, edit: F) -> Result<Self, BufferError>
    where
        F: FnOnce(&mut AnalysisRow) -> Result<(), BufferError>,
    {
        let plan = self
            .plans
            .get(plan_index)
            .ok_or(BufferError::PlanOutOfRange {
                index: plan_index,
                len: self.plans.len(),
            })?;

        let mut plan = AnalysisPlan::clone(plan);
        let len = plan.rows.len();
        let row = plan
            .rows
            .get_mut(row_index)
            .ok_or(BufferError::RowOutOfRange {
                index: row_index,
                len,
            })?;
        edit(row)?;

        let mut plans = self.plans.clone();
        plans[plan_index] = Arc::new(plan);
        Ok(Self { plans })
    }

    /// Owned copy of all plans
    pub fn to_plans(&self) -> Vec<AnalysisPlan> {
        self.plans().cloned().collect()
    }

    /// JSON in the service's wire shape (an array of row arrays)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
