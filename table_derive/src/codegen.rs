//! Code generation for model metadata
//!
//! Column types are resolved here, at expansion time, so the generated `schema()`
//! is a plain builder chain with string literals.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use crate::parsing::{ColumnInfo, FieldInfo, TableInfo};

fn column_tokens(column: &ColumnInfo, is_primary_key: bool) -> TokenStream {
    let name = &column.name;
    let sql_type = type_mapping::rust_type_to_pg_type(&column.rust_type);
    let nullable = !is_primary_key && type_mapping::is_optional_type(&column.rust_type);

    let unique = column.unique.then(|| quote! { .unique() });
    let indexed = column.indexed.then(|| quote! { .indexed() });

    quote! {
        .column(
            ::softhaus::store_object::ColumnDef::new(#name, #sql_type, #nullable)
                #unique
                #indexed
        )
    }
}

fn foreign_key_tokens(column: &ColumnInfo) -> Option<TokenStream> {
    let fk = column.foreign_key.as_ref()?;
    let name = &column.name;
    let references = &fk.references;
    let references_column = &fk.references_column;
    let on_delete = format_ident!("{}", fk.on_delete);

    Some(quote! {
        .foreign_key(::softhaus::store_object::ForeignKey::new(
            #name,
            #references,
            #references_column,
            ::softhaus::store_object::OnDelete::#on_delete,
        ))
    })
}

pub fn generate_table_metadata_impl(
    name: &Ident,
    table_info: &TableInfo,
    field_info: &FieldInfo,
) -> TokenStream {
    let table_name = &table_info.name;
    let primary_key_field = &field_info.primary_key_field;
    let primary_key_name = primary_key_field.to_string();
    let primary_key_type = &field_info.primary_key_type;
    let create_fields = &field_info.create_fields;
    let update_fields = &field_info.update_fields;
    let has_lifecycle = field_info.lifecycle_field.is_some();

    let columns: Vec<_> = field_info
        .columns
        .iter()
        .map(|c| column_tokens(c, c.ident == *primary_key_field))
        .collect();
    let foreign_keys: Vec<_> = field_info
        .columns
        .iter()
        .filter_map(foreign_key_tokens)
        .collect();
    let lifecycle = has_lifecycle.then(|| quote! { .with_lifecycle() });

    quote! {
        impl ::softhaus::store_object::TableMetadata for #name {
            type Id = #primary_key_type;

            fn table_name() -> &'static str {
                #table_name
            }

            fn primary_key_field() -> &'static str {
                #primary_key_name
            }

            fn extract_id(&self) -> Self::Id {
                self.#primary_key_field.clone()
            }

            fn schema() -> ::softhaus::store_object::TableSchema {
                ::softhaus::store_object::TableSchema::new(#table_name, #primary_key_name)
                    #(#columns)*
                    #(#foreign_keys)*
                    #lifecycle
            }

            fn create_fields() -> Vec<&'static str> {
                vec![#(#create_fields),*]
            }

            fn update_fields() -> Vec<&'static str> {
                vec![#(#update_fields),*]
            }

            fn supports_soft_delete() -> bool {
                #has_lifecycle
            }
        }
    }
}

pub fn generate_soft_deletable_impl(name: &Ident, field_info: &FieldInfo) -> TokenStream {
    let Some(lifecycle_field) = &field_info.lifecycle_field else {
        return TokenStream::new();
    };

    quote! {
        impl ::softhaus::store_object::SoftDeletable for #name {
            fn lifecycle(&self) -> &::softhaus::store_object::Lifecycle {
                &self.#lifecycle_field
            }

            fn lifecycle_mut(&mut self) -> &mut ::softhaus::store_object::Lifecycle {
                &mut self.#lifecycle_field
            }
        }
    }
}

/// `new(...)` over every column field; the lifecycle starts empty
pub fn generate_helper_impl(name: &Ident, field_info: &FieldInfo) -> TokenStream {
    let idents: Vec<_> = field_info.columns.iter().map(|c| &c.ident).collect();
    let types: Vec<_> = field_info.columns.iter().map(|c| &c.ty).collect();
    let lifecycle_init = field_info.lifecycle_field.as_ref().map(|field| {
        quote! { #field: ::softhaus::store_object::Lifecycle::new(), }
    });

    quote! {
        impl #name {
            #[allow(clippy::too_many_arguments)]
            pub fn new(#(#idents: #types),*) -> Self {
                Self {
                    #(#idents,)*
                    #lifecycle_init
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{parse_field_attributes, parse_table_attributes};
    use syn::{parse_quote, DeriveInput};

    fn expand(input: DeriveInput) -> String {
        let table = parse_table_attributes(&input.attrs).expect("table");
        let fields = parse_field_attributes(&input.data).expect("fields");
        let mut out = generate_table_metadata_impl(&input.ident, &table, &fields);
        out.extend(generate_soft_deletable_impl(&input.ident, &fields));
        out.extend(generate_helper_impl(&input.ident, &fields));
        out.to_string().replace(' ', "")
    }

    #[test]
    fn schema_uses_mapped_types_and_foreign_keys() {
        let code = expand(parse_quote! {
            #[table(name = "children")]
            struct Child {
                #[primary_key]
                id: Uuid,
                #[field(create)]
                #[foreign_key(references = "parents", on_delete = "cascade")]
                parent_id: Option<Uuid>,
                #[lifecycle]
                lifecycle: Lifecycle,
            }
        });

        assert!(code.contains("ColumnDef::new(\"id\",\"UUID\",false)"));
        assert!(code.contains("ColumnDef::new(\"parent_id\",\"UUID\",true)"));
        assert!(code.contains("OnDelete::Cascade"));
        assert!(code.contains("with_lifecycle"));
        assert!(code.contains("impl::softhaus::store_object::SoftDeletableforChild"));
    }

    #[test]
    fn no_soft_deletable_without_lifecycle() {
        let code = expand(parse_quote! {
            #[table(name = "settings")]
            struct Setting {
                #[primary_key]
                name: String,
                #[field(create, update)]
                value: String,
            }
        });

        assert!(!code.contains("SoftDeletable"));
        assert!(!code.contains("with_lifecycle"));
        assert!(code.contains("fnsupports_soft_delete()->bool{false}"));
    }
}
