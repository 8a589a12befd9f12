use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{DataEnum, DataStruct, DeriveInput, Field, LitStr, Result, Type};

/// How one struct field takes part in conversion.
enum FieldMode {
    /// Stored under `key`.
    Keyed(String),
    /// The field's own document is merged into the parent document.
    Flatten,
    /// Never stored; decoded as `Default::default()`.
    Skip,
}

struct FieldSpec<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    mode: FieldMode,
}

fn parse_ignored(ast: &DeriveInput) -> Result<Vec<String>> {
    let mut ignored_fields: Vec<String> = vec![];
    for attr in &ast.attrs {
        if attr.path().is_ident("converter") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("ignored") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    let field_str = s.value();
                    for field in field_str.split(',') {
                        let field = field.trim();
                        if !field.is_empty() {
                            ignored_fields.push(field.to_string());
                        }
                    }
                    Ok(())
                } else {
                    Err(meta.error("Unknown converter attribute, expected `ignored`"))
                }
            })?;
        }
    }
    Ok(ignored_fields)
}

fn parse_field<'a>(field: &'a Field, ignored_fields: &[String]) -> Result<FieldSpec<'a>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "Only named fields are supported"))?;

    let mut mode = if ignored_fields.contains(&ident.to_string()) {
        FieldMode::Skip
    } else {
        FieldMode::Keyed(ident.to_string())
    };

    for attr in &field.attrs {
        if attr.path().is_ident("converter") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    if !matches!(mode, FieldMode::Skip) {
                        mode = FieldMode::Keyed(s.value());
                    }
                    Ok(())
                } else if meta.path.is_ident("flatten") {
                    if !matches!(mode, FieldMode::Skip) {
                        mode = FieldMode::Flatten;
                    }
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    mode = FieldMode::Skip;
                    Ok(())
                } else {
                    Err(meta.error(
                        "Unknown converter attribute, expected `rename`, `flatten` or `skip`",
                    ))
                }
            })?;
        }
    }

    Ok(FieldSpec {
        ident,
        ty: &field.ty,
        mode,
    })
}

pub(crate) fn generate_convertible_for_struct(
    ast: &DeriveInput,
    data: &DataStruct,
) -> Result<TokenStream> {
    let ignored_fields = parse_ignored(ast)?;

    let fields: Vec<&Field> = match &data.fields {
        syn::Fields::Named(ref fields) => fields.named.iter().collect(),
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "Only structs with named fields are supported",
            ))
        }
    };

    let specs = fields
        .iter()
        .map(|f| parse_field(f, &ignored_fields))
        .collect::<Result<Vec<FieldSpec>>>()?;

    let writers: Vec<proc_macro2::TokenStream> = specs
        .iter()
        .filter_map(|spec| {
            let ident = spec.ident;
            match &spec.mode {
                FieldMode::Keyed(key) => Some(quote! {
                    doc.put(#key, docrepo::common::Convertible::to_value(&self.#ident)?);
                }),
                FieldMode::Flatten => Some(quote! {
                    doc.merge(docrepo::common::to_document(&self.#ident)?);
                }),
                FieldMode::Skip => None,
            }
        })
        .collect();

    let initializers: Vec<proc_macro2::TokenStream> = specs
        .iter()
        .map(|spec| {
            let ident = spec.ident;
            let ty = spec.ty;
            match &spec.mode {
                FieldMode::Keyed(key) => quote! {
                    #ident: docrepo::common::field_or_default::<#ty>(doc, #key)?
                },
                FieldMode::Flatten => quote! {
                    #ident: <#ty as docrepo::common::Convertible>::from_value(value)?
                },
                FieldMode::Skip => quote! { #ident: Default::default() },
            }
        })
        .collect();

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> docrepo::errors::RepoResult<docrepo::common::Value> {
                let mut doc = docrepo::common::Document::new();
                #(#writers)*
                Ok(docrepo::common::Value::Document(doc))
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::RepoResult<Self::Output> {
                match value {
                    docrepo::common::Value::Document(doc) => {
                        Ok(#name {
                            #(#initializers,)*
                        })
                    },
                    _ => Err(docrepo::errors::RepoError::new(
                        "Value is not a document",
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}

pub(crate) fn generate_convertible_for_enum(ast: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut to_value_variants = Vec::with_capacity(data.variants.len());
    let mut from_value_variants = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Only unit variants are supported",
            ));
        }

        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();

        to_value_variants.push(quote! {
            #name::#variant_ident => Ok(docrepo::common::Value::from(#variant_name))
        });
        from_value_variants.push(quote! {
            #variant_name => Ok(#name::#variant_ident)
        });
    }

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> docrepo::errors::RepoResult<docrepo::common::Value> {
                match self {
                    #(#to_value_variants),*
                }
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::RepoResult<Self::Output> {
                match value {
                    docrepo::common::Value::String(variant) => match variant.as_str() {
                        #(#from_value_variants,)*
                        other => Err(docrepo::errors::RepoError::new(
                            &format!("'{}' is not a variant of {}", other, stringify!(#name)),
                            docrepo::errors::ErrorKind::ObjectMappingError,
                        )),
                    },
                    _ => Err(docrepo::errors::RepoError::new(
                        "Value is not an enum variant name",
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}
