//! Extraction and classification engine for free-form real-estate listings.
//!
//! Raw text lines go through [`segmenter::segment`], then every listing
//! segment is normalized and run through the field extractors, the
//! neighborhood matcher and the property-type classifier. All behavior is
//! driven by an [`config::AgencyConfig`] compiled once into a
//! [`agency::CompiledAgency`].

pub mod agency;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extractors;
pub mod models;
pub mod neighborhood;
pub mod normalizer;
pub mod pipeline;
pub mod section;
pub mod segmenter;

pub use agency::CompiledAgency;
pub use config::{AgencyConfig, ListingMarker, MultiPricePolicy};
pub use error::{ConfigError, Error, Result};
pub use models::{
    Area, AreaUnit, Classification, ParsedRecord, PropertyType, RawSegment, Segment, Transaction,
};
pub use neighborhood::{NeighborhoodDictionary, NeighborhoodEntry};
pub use normalizer::{normalize, normalize_line, TextVariant};
pub use pipeline::ListingParser;
pub use section::SectionContext;
