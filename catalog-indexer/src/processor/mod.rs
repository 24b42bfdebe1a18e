//! Processor module for the catalog indexer.
//!
//! Transforms extracted rows into search documents.

mod catalog_processor;

pub use catalog_processor::CatalogProcessor;
