/*!
 * # BookwAI - book translation with AI
 *
 * A Rust library for paragraph-by-paragraph translation of books using
 * language models behind OpenAI-compatible endpoints.
 *
 * ## Features
 *
 * - Read books as directories of XHTML parts and write them back translated
 * - Lossless-enough conversion between rich text and structured markup
 * - Persistent SQLite translation store that doubles as a cache, so
 *   interrupted runs resume where they stopped
 * - Sliding context windows that keep names and terms consistent
 * - Direct or pivot translation through an intermediate language
 * - Heuristic and model-rated quality reports
 * - CSV backup and restore of the translation store
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `database`: Translation store
 * - `translation`: AI-powered translation services:
 *   - `translation::document`: Structural text codec
 *   - `translation::context`: Context window manager
 *   - `translation::pipeline`: Scan, translation and build passes
 *   - `translation::quality`: Quality evaluator
 * - `file_utils`: File system operations and the directory document
 * - `language_utils`: ISO language code utilities
 * - `providers`: OpenAI-compatible client and a scripted mock
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, TranslateOptions};
pub use database::{Repository, TranslationRecord};
pub use errors::{AppError, ProviderError, SelectorError, StoreError, TranslationError};
pub use language_utils::{language_code, languages_match, normalize_language_name};
pub use translation::TranslationService;
