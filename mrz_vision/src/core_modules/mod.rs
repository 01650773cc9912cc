pub mod artifacts;
pub mod checksum;
pub mod classifier;
pub mod correlation_store;
pub mod document_checker;
pub mod fields;
pub mod frame;
pub mod geometry;
pub mod grouping;
pub mod line_set;
pub mod portrait;
pub mod recognizer;
pub mod td1;
pub mod td2;
pub mod td3;
pub mod visa;
