/*!
 * Translation of canonical content into the other supported languages.
 *
 * - `fingerprint`: Normalization and hashing of canonical bodies
 * - `memory`: Content-addressed store of finished translations
 * - `pipeline`: Canonical document to stored translation, calling the provider only on a miss
 */

pub mod fingerprint;
pub mod memory;
pub mod pipeline;

pub use self::fingerprint::{Fingerprint, Fingerprinter};
pub use self::memory::{MemoryKey, MemoryStats, TranslationMemory};
pub use self::pipeline::TranslationPipeline;
