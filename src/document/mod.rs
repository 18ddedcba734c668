/*!
 * Per-language content documents and their storage.
 */

pub mod model;
pub mod store;

pub use model::{
    merge_metadata, ContentDocument, Metadata, MetadataValue, RenderedDocument, SectionSummary,
};
pub use store::DocumentStore;
