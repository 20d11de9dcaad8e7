#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every crate of the workspace.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! shroud-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every wrapped source type.
/// * **Standard Conversions**: Implements `From<Source>` for variants containing a source field,
///   enabling the use of the `?` operator for upstream errors.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` when an
///   `Internal` variant is present.
/// * **Kind Accessor**: Generates `fn kind(&self) -> &'static str` returning the variant name,
///   meant for structured log fields (`error_kind = err.kind()`).
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. Variants wrapping another error must carry a `source` field (or a field marked
///    `#[source]`/`#[from]`) and a `context: Option<Cow<'static, str>>` field.
///
/// # Example
///
/// ```rust,ignore
/// use shroud_derive::shroud_error;
/// use std::borrow::Cow;
///
/// #[shroud_error]
/// pub enum StoreError {
///     #[error("Serialization error{}: {source}", format_context(.context))]
///     Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn parse(raw: &str) -> Result<serde_json::Value, StoreError> {
///     serde_json::from_str(raw).context("Parsing stored document")
/// }
/// ```
#[proc_macro_attribute]
pub fn shroud_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
