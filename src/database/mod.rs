/*!
 * Database module for persistent storage of content and translation memory.
 *
 * This module provides SQLite-based persistence for:
 * - Content documents, one row per (section, language)
 * - The translation memory, one row per (fingerprint, target language)
 */

pub mod connection;
pub mod schema;

pub use connection::DatabaseConnection;
