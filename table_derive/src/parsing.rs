//! Parsing utilities for table and field attributes
//!
//! This module handles the parsing of `#[table]`, `#[field]` and `#[foreign_key]`
//! attributes and validation of table and column names.

use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, Attribute, Data, Error, Fields, Ident, LitStr, Meta, Result,
    Token, Type,
};

const LIFECYCLE_COLUMNS: [&str; 3] = ["__created_at__", "__updated_at__", "__deleted_at__"];

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Validate field name and return syn::Error for better proc macro error handling
pub fn validate_field_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    if LIFECYCLE_COLUMNS.contains(&name) {
        return Err(Error::new(
            span,
            format!(
                "Invalid field name '{}': lifecycle columns come from the #[lifecycle] field",
                name
            ),
        ));
    }

    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid field name '{}': {}", name, e)))
}

/// Same rules as `store_object::validation`, checked at expansion time
fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    if name.len() > 63 {
        return Err(format!(
            "Name '{}' is too long: {} characters (max 63)",
            name,
            name.len()
        ));
    }

    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Name '{}' must start with a letter or underscore",
            name
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed", name));
    }

    if is_reserved_keyword(name) {
        return Err(format!("Name '{}' is a reserved SQL keyword", name));
    }

    Ok(())
}

fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "INNER", "LEFT",
        "RIGHT", "FULL", "OUTER", "ON", "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE",
        "CASE", "WHEN", "THEN", "ELSE", "END", "IF", "EXISTS", "IN", "LIKE", "BETWEEN",
        "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT",
        "CREATE", "DROP", "ALTER", "TABLE", "INDEX", "VIEW", "DATABASE", "SCHEMA", "PRIMARY",
        "KEY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT", "COLUMN",
        "CASCADE", "RESTRICT", "RETURNING", "USER", "TO",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

/// Operations listed in `#[field(create, update)]`
struct FieldOperations {
    operations: Vec<Ident>,
}

impl Parse for FieldOperations {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut operations = Vec::new();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "create" | "update" | "readonly" => operations.push(ident),
                other => {
                    return Err(Error::new(
                        ident.span(),
                        format!(
                            "unknown field operation '{}': expected create, update or readonly",
                            other
                        ),
                    ))
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(FieldOperations { operations })
    }
}

pub struct TableInfo {
    pub name: String,
}

/// `#[foreign_key(references = "...", column = "...", on_delete = "...")]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyInfo {
    pub references: String,
    pub references_column: String,
    /// Variant name of `OnDelete`
    pub on_delete: &'static str,
}

pub struct ColumnInfo {
    pub ident: Ident,
    pub ty: Type,
    pub name: String,
    pub rust_type: String,
    pub unique: bool,
    pub indexed: bool,
    pub foreign_key: Option<ForeignKeyInfo>,
}

pub struct FieldInfo {
    pub primary_key_field: Ident,
    pub primary_key_type: Type,
    /// Every non-lifecycle field in declaration order
    pub columns: Vec<ColumnInfo>,
    pub create_fields: Vec<String>,
    pub update_fields: Vec<String>,
    pub lifecycle_field: Option<Ident>,
}

pub fn parse_table_attributes(attrs: &[Attribute]) -> Result<TableInfo> {
    let mut table_name: Option<(String, proc_macro2::Span)> = None;

    for attr in attrs {
        if !attr.path().is_ident("table") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                table_name = Some((value.value(), value.span()));
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute: expected name = \"...\""))
            }
        })?;
    }

    let (name, span) = table_name.ok_or_else(|| {
        Error::new(
            proc_macro2::Span::call_site(),
            "table attribute is required: add #[table(name = \"table_name\")] to your struct",
        )
    })?;

    validate_table_name_syn(&name, span)?;

    Ok(TableInfo { name })
}

pub fn parse_foreign_key(attr: &Attribute) -> Result<ForeignKeyInfo> {
    let mut references = None;
    let mut references_column = "id".to_string();
    let mut on_delete = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("references") {
            let value: LitStr = meta.value()?.parse()?;
            validate_table_name_syn(&value.value(), value.span())?;
            references = Some(value.value());
        } else if meta.path.is_ident("column") {
            let value: LitStr = meta.value()?.parse()?;
            validate_field_name_syn(&value.value(), value.span())?;
            references_column = value.value();
        } else if meta.path.is_ident("on_delete") {
            let value: LitStr = meta.value()?.parse()?;
            on_delete = Some(parse_on_delete(&value.value()).ok_or_else(|| {
                Error::new(
                    value.span(),
                    format!(
                        "unknown on_delete action '{}': expected cascade, restrict, set_null or no_action",
                        value.value()
                    ),
                )
            })?);
        } else {
            return Err(meta.error(
                "unsupported foreign_key attribute: expected references, column or on_delete",
            ));
        }
        Ok(())
    })?;

    let references = references.ok_or_else(|| {
        Error::new_spanned(attr, "foreign_key requires references = \"table_name\"")
    })?;
    let on_delete = on_delete.ok_or_else(|| {
        Error::new_spanned(
            attr,
            "foreign_key requires on_delete = \"cascade\" | \"restrict\" | \"set_null\" | \"no_action\"",
        )
    })?;

    Ok(ForeignKeyInfo {
        references,
        references_column,
        on_delete,
    })
}

fn parse_on_delete(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().replace(' ', "_").as_str() {
        "cascade" => Some("Cascade"),
        "restrict" => Some("Restrict"),
        "set_null" => Some("SetNull"),
        "no_action" => Some("NoAction"),
        _ => None,
    }
}

pub fn parse_field_attributes(data: &Data) -> Result<FieldInfo> {
    let fields_named = match data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields_named) => fields_named,
            _ => {
                return Err(Error::new(
                    proc_macro2::Span::call_site(),
                    "TableMetadata can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                proc_macro2::Span::call_site(),
                "TableMetadata can only be derived for structs with named fields",
            ))
        }
    };

    let mut primary_key = None;
    let mut columns = Vec::new();
    let mut create_fields = Vec::new();
    let mut update_fields = Vec::new();
    let mut lifecycle_field = None;

    for field in &fields_named.named {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;

        if has_attribute(&field.attrs, "lifecycle") {
            if lifecycle_field.is_some() {
                return Err(Error::new_spanned(
                    field_name,
                    "only one #[lifecycle] field is allowed",
                ));
            }
            lifecycle_field = Some(field_name.clone());
            continue;
        }

        let field_name_str = field_name.to_string();
        validate_field_name_syn(&field_name_str, field_name.span())?;

        let ty = &field.ty;
        let rust_type = type_mapping::normalize_type(&quote!(#ty).to_string());

        if has_attribute(&field.attrs, "primary_key") {
            if primary_key.is_some() {
                return Err(Error::new_spanned(
                    field_name,
                    "only one #[primary_key] field is allowed",
                ));
            }
            primary_key = Some((field_name.clone(), ty.clone()));
        }

        let is_readonly = has_attribute(&field.attrs, "readonly");
        if let Some(field_ops) = parse_field_operations(&field.attrs)? {
            if field_ops.iter().any(|op| op == "create") {
                create_fields.push(field_name_str.clone());
            }
            if field_ops.iter().any(|op| op == "update")
                && !is_readonly
                && !field_ops.iter().any(|op| op == "readonly")
            {
                update_fields.push(field_name_str.clone());
            }
        }

        let foreign_key = match field.attrs.iter().find(|a| a.path().is_ident("foreign_key")) {
            Some(attr) => Some(parse_foreign_key(attr)?),
            None => None,
        };

        columns.push(ColumnInfo {
            ident: field_name.clone(),
            ty: ty.clone(),
            name: field_name_str,
            rust_type,
            unique: has_attribute(&field.attrs, "unique"),
            indexed: has_attribute(&field.attrs, "index"),
            foreign_key,
        });
    }

    let (primary_key_field, primary_key_type) = primary_key.ok_or_else(|| {
        Error::new(
            proc_macro2::Span::call_site(),
            "a #[primary_key] field is required",
        )
    })?;

    Ok(FieldInfo {
        primary_key_field,
        primary_key_type,
        columns,
        create_fields,
        update_fields,
        lifecycle_field,
    })
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Operations named by `#[field(...)]`, if the attribute is present
///
/// A bare `#[field]` means create and update.
pub fn parse_field_operations(attrs: &[Attribute]) -> Result<Option<Vec<String>>> {
    for attr in attrs {
        if !attr.path().is_ident("field") {
            continue;
        }

        return match &attr.meta {
            Meta::List(meta_list) => {
                let field_ops = meta_list.parse_args::<FieldOperations>()?;
                Ok(Some(
                    field_ops
                        .operations
                        .iter()
                        .map(|ident| ident.to_string())
                        .collect(),
                ))
            }
            Meta::Path(_) => Ok(Some(vec!["create".to_string(), "update".to_string()])),
            Meta::NameValue(_) => Err(Error::new_spanned(
                attr,
                "expected #[field(create, update)] or #[field]",
            )),
        };
    }

    Ok(None)
}


#[cfg(test)]
mod attribute_tests {
    use super::*;
    use syn::{parse_quote, DeriveInput};

    fn child() -> DeriveInput {
        parse_quote! {
            #[table(name = "children")]
            struct Child {
                #[primary_key]
                id: Uuid,
                #[field(create, update)]
                #[unique]
                name: String,
                #[field(create)]
                #[index]
                #[foreign_key(references = "parents", on_delete = "cascade")]
                parent_id: Uuid,
                #[field(create, update)]
                #[foreign_key(references = "owners", column = "code", on_delete = "set_null")]
                owner_code: Option<String>,
                #[lifecycle]
                lifecycle: Lifecycle,
            }
        }
    }

    #[test]
    fn parses_table_name() {
        let input = child();
        let table = parse_table_attributes(&input.attrs).expect("table attribute");
        assert_eq!(table.name, "children");
    }

    #[test]
    fn missing_table_attribute_is_an_error() {
        let input: DeriveInput = parse_quote! { struct Bare { #[primary_key] id: i64 } };
        assert!(parse_table_attributes(&input.attrs).is_err());
    }

    #[test]
    fn parses_columns_and_lifecycle() {
        let info = parse_field_attributes(&child().data).expect("fields");

        assert_eq!(info.primary_key_field.to_string(), "id");
        assert_eq!(
            info.lifecycle_field.as_ref().map(|i| i.to_string()),
            Some("lifecycle".to_string())
        );

        let names: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "parent_id", "owner_code"]);
        assert_eq!(info.create_fields, vec!["name", "parent_id", "owner_code"]);
        assert_eq!(info.update_fields, vec!["name", "owner_code"]);

        assert!(info.columns[1].unique);
        assert!(info.columns[2].indexed);
        assert_eq!(info.columns[3].rust_type, "Option<String>");
    }

    #[test]
    fn parses_foreign_keys() {
        let info = parse_field_attributes(&child().data).expect("fields");

        assert_eq!(
            info.columns[2].foreign_key,
            Some(ForeignKeyInfo {
                references: "parents".to_string(),
                references_column: "id".to_string(),
                on_delete: "Cascade",
            })
        );
        assert_eq!(
            info.columns[3].foreign_key,
            Some(ForeignKeyInfo {
                references: "owners".to_string(),
                references_column: "code".to_string(),
                on_delete: "SetNull",
            })
        );
        assert!(info.columns[0].foreign_key.is_none());
    }

    #[test]
    fn foreign_key_requires_on_delete() {
        let input: DeriveInput = parse_quote! {
            struct Child {
                #[primary_key]
                id: Uuid,
                #[foreign_key(references = "parents")]
                parent_id: Uuid,
            }
        };
        let err = parse_field_attributes(&input.data).err().expect("missing on_delete");
        assert!(err.to_string().contains("on_delete"));
    }

    #[test]
    fn rejects_unknown_on_delete_action() {
        let input: DeriveInput = parse_quote! {
            struct Child {
                #[primary_key]
                id: Uuid,
                #[foreign_key(references = "parents", on_delete = "explode")]
                parent_id: Uuid,
            }
        };
        let err = parse_field_attributes(&input.data).err().expect("bad action");
        assert!(err.to_string().contains("unknown on_delete action"));
    }

    #[test]
    fn primary_key_is_required() {
        let input: DeriveInput = parse_quote! {
            struct NoKey {
                #[field(create)]
                name: String,
            }
        };
        assert!(parse_field_attributes(&input.data).is_err());
    }

    #[test]
    fn readonly_fields_are_not_updated() {
        let input: DeriveInput = parse_quote! {
            struct Account {
                #[primary_key]
                id: Uuid,
                #[field(create, update)]
                #[readonly]
                email: String,
                #[field]
                nickname: String,
            }
        };
        let info = parse_field_attributes(&input.data).expect("fields");
        assert_eq!(info.create_fields, vec!["email", "nickname"]);
        assert_eq!(info.update_fields, vec!["nickname"]);
    }
}
