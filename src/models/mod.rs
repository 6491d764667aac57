//! Core data models for paper records.

mod paper;

pub use paper::{
    PaperRecord, PaperRecordBuilder, SourceType, UnknownSource, NO_ABSTRACT, NO_AUTHORS, NO_TITLE,
    UNKNOWN_DATE,
};
