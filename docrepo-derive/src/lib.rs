#![recursion_limit = "128"]
//! # docrepo Derive Macros
//!
//! Procedural macros for deriving docrepo traits.
//!
//! ## Macros
//!
//! ### `Convertible`
//!
//! Derives `docrepo::common::Convertible` for structs with named fields and for enums
//! whose variants are all unit variants.
//!
//! - **Struct attribute**: `#[converter(ignored = "a, b")]` leaves the listed fields out
//! - **Field attributes**:
//!   - `#[converter(rename = "_id")]` stores the field under another key
//!   - `#[converter(flatten)]` merges an embedded struct's fields into the parent document
//!   - `#[converter(skip)]` leaves the field out
//!
//! Fields that are missing or null in a stored document decode to `Default::default()`,
//! so every stored field type must implement `Default`. Unit enums are stored as the
//! variant name.
//!
//! ```rust,ignore
//! use docrepo::repository::DefaultFields;
//! use docrepo_derive::Convertible;
//!
//! #[derive(Default, Convertible)]
//! pub struct Paper {
//!     #[converter(flatten)]
//!     pub meta: DefaultFields,
//!     pub number_id: i64,
//!     #[converter(rename = "headline")]
//!     pub title: String,
//!     #[converter(skip)]
//!     pub summary: String,
//! }
//!
//! #[derive(Default, Convertible)]
//! pub enum Status {
//!     #[default]
//!     Draft,
//!     Published,
//! }
//! ```
//!
//! ### `Indexes`
//!
//! Derives `docrepo::repository::Indexes` from compact index expressions.
//!
//! ```rust,ignore
//! #[derive(Default, Convertible, Indexes)]
//! #[indexes(unique = "number_id", index = "title,-created_at")]
//! pub struct Paper { /* ... */ }
//! ```

extern crate proc_macro;
mod convertible;
mod indexes;

use crate::convertible::{generate_convertible_for_enum, generate_convertible_for_struct};
use crate::indexes::generate_indexes;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Convertible` trait for conversion to and from documents.
///
/// # Errors
///
/// Returns a compile error if:
/// - The struct has unnamed fields
/// - An enum variant carries data
/// - The type is a union
#[proc_macro_derive(Convertible, attributes(converter))]
pub fn derive_convert(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => {
            let result = generate_convertible_for_struct(&ast, data);
            match result {
                Ok(token_stream) => token_stream,
                Err(e) => {
                    let error = syn::Error::new_spanned(
                        &ast,
                        format!(
                            "Failed to derive Convertible for struct '{}': {}.\n\
                             Make sure all fields implement Convertible and Default.",
                            ast.ident, e
                        ),
                    );
                    error.to_compile_error().into()
                }
            }
        }
        Data::Enum(ref data) => {
            let result = generate_convertible_for_enum(&ast, data);
            match result {
                Ok(token_stream) => token_stream,
                Err(e) => {
                    let error = syn::Error::new_spanned(
                        &ast,
                        format!("Failed to derive Convertible for enum '{}': {}.", ast.ident, e),
                    );
                    error.to_compile_error().into()
                }
            }
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Convertible for unions. Unions are not supported by the Convertible derive macro.",
            );
            error.to_compile_error().into()
        }
    }
}

/// Derives the `Indexes` trait from `#[indexes(unique = "...")]` and
/// `#[indexes(index = "...")]` attributes. Both may be repeated.
#[proc_macro_derive(Indexes, attributes(indexes))]
pub fn derive_indexes(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match generate_indexes(&ast) {
        Ok(token_stream) => token_stream,
        Err(e) => {
            let error = syn::Error::new_spanned(
                &ast,
                format!("Failed to derive Indexes for '{}': {}.", ast.ident, e),
            );
            error.to_compile_error().into()
        }
    }
}
