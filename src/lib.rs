//! Trip itinerary authoring: an action-driven store of ordered stops, an
//! ingestion pipeline for CSV or free-text place lists, and the projections
//! that turn the authoring state into a publishable map document.

pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod identifier;
pub mod ingest;
pub mod orchestrator;
pub mod selectors;
pub mod services;
pub mod store;

pub use error::{AssociationWarning, GenericError, IngestError, ItineraryError};
