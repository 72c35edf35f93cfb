//! Procedural macros for generating table metadata
//!
//! This crate provides the `#[model]` macro and `TableMetadata` derive. Together they
//! describe a struct's table, its foreign keys and whether it carries lifecycle columns.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod model_macro;
mod parsing;

use codegen::{generate_helper_impl, generate_soft_deletable_impl, generate_table_metadata_impl};
use model_macro::model_attribute;
use parsing::{parse_field_attributes, parse_table_attributes};

/// Derive macro for the `TableMetadata` trait
///
/// Note: It's recommended to use the `#[model]` attribute macro instead,
/// which adds this derive along with the serde derives and lifecycle flattening.
///
/// Recommended usage:
/// ```ignore
/// use softhaus::prelude::*;
///
/// #[model]
/// #[table(name = "children")]
/// pub struct Child {
///     #[primary_key]
///     pub id: Uuid,
///
///     #[field(create, update)]
///     pub name: String,
///
///     #[field(create)]
///     #[index]
///     #[foreign_key(references = "parents", on_delete = "cascade")]
///     pub parent_id: Uuid,
///
///     #[lifecycle]
///     pub lifecycle: Lifecycle,
/// }
/// ```
#[proc_macro_derive(
    TableMetadata,
    attributes(table, primary_key, field, readonly, index, unique, foreign_key, lifecycle)
)]
pub fn derive_table_metadata(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let table_info = match parse_table_attributes(&input.attrs) {
        Ok(attrs) => attrs,
        Err(e) => return e.to_compile_error().into(),
    };

    let field_info = match parse_field_attributes(&input.data) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let table_metadata_impl = generate_table_metadata_impl(name, &table_info, &field_info);
    let soft_deletable_impl = generate_soft_deletable_impl(name, &field_info);
    let helper_impl = generate_helper_impl(name, &field_info);

    let expanded = quote::quote! {
        #table_metadata_impl
        #soft_deletable_impl
        #helper_impl
    };

    TokenStream::from(expanded)
}

/// Convenience attribute macro that adds all necessary derives for a model
///
/// Usage:
/// ```ignore
/// use softhaus::prelude::*;
///
/// #[model]
/// #[table(name = "parents")]
/// pub struct Parent {
///     #[primary_key]
///     pub id: Uuid,
///     #[field(create, update)]
///     pub name: String,
///     #[lifecycle]
///     pub lifecycle: Lifecycle,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
