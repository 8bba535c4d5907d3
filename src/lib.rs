//! Core library for the sheet-aggregator command line application.
//!
//! The library combines every sheet of every matching spreadsheet in a
//! directory into a single table tagged with `file_name` and `sheet_name`.
//! File discovery lives in [`sheet::aggregator::select`] and
//! [`sheet::aggregator::dates`], file readers and writers under
//! [`sheet::aggregator::io`], the table representation in
//! [`sheet::aggregator::model`], post-processing steps in
//! [`sheet::aggregator::transform`], and the orchestration in
//! [`sheet::aggregator::aggregate`].

pub mod sheet;

pub use sheet::aggregator::{
    Result, Stage, ToolError, aggregate, config, dates, error, io, model, select, transform,
};
