//! Biobank Core - domain model for the biobank specimen-tracking client
//!
//! This crate turns the backend's JSON records into typed, validated
//! values and back:
//!
//! - [`schema`] validates raw records before anything is built from them
//! - [`annotation_type`] and [`annotation`] model administrator-defined
//!   custom fields and their wire/form conversion
//! - [`versioned`] wraps every server record with identity, version and
//!   the optimistic-concurrency update protocol
//! - [`entities`] holds the concrete records (users, specimens, ...)
//!
//! All server traffic goes through the [`rest::RestClient`] seam; this
//! crate never speaks HTTP itself.

pub mod annotation;
pub mod annotation_type;
pub mod entities;
pub mod error;
pub mod holder;
pub mod labels;
pub mod notify;
pub mod paged_list;
pub mod rest;
pub mod schema;
pub mod versioned;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use annotation::{Annotation, AnnotationRecord, AnnotationValue, DateTimeValue, SelectOption, SelectedValue};
pub use annotation_type::{AnnotationType, AnnotationValueType};
pub use entities::{
    CollectionEvent, CollectionEventType, EntityInfo, EntitySet, Membership, NewSpecimen, Participant, Specimen,
    SpecimenState, User, UserState,
};
pub use error::{DomainError, DomainResult, Error, RestError, Result, VERSION_CONFLICT_PATTERN};
pub use holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
pub use labels::{LabelService, Labelled};
pub use notify::{Notifier, Outcome, confirm_then};
pub use paged_list::{DisplayState, ItemSource, ListQuery, PagedList, PagedResult};
pub use rest::{RestClient, RestResult};
pub use schema::{FieldSpec, FieldType, Schema, Validation};
pub use versioned::{RecordPayload, RecordSource, VersionedRecord};
