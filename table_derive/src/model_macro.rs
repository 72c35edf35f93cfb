use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Error, Fields};

/// Adds the derives every model needs and flattens the `#[lifecycle]` field
///
/// The lifecycle field serializes as the three `__*_at__` columns, so a record
/// round-trips through a storage row without any per-model glue.
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let DeriveInput {
        attrs,
        vis,
        ident: name,
        generics,
        data,
    } = parse_macro_input!(item as DeriveInput);

    let mut data = match data {
        Data::Struct(data) => data,
        _ => {
            return Error::new_spanned(&name, "model can only be used on structs")
                .to_compile_error()
                .into()
        }
    };

    if let Fields::Named(named) = &mut data.fields {
        for field in named.named.iter_mut() {
            if field.attrs.iter().any(|a| a.path().is_ident("lifecycle")) {
                field.attrs.push(parse_quote!(#[serde(flatten)]));
            }
        }
    }

    let fields = &data.fields;
    let expanded = quote! {
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, TableMetadata)]
        #(#attrs)*
        #vis struct #name #generics #fields
    };

    TokenStream::from(expanded)
}
