use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, Result};

pub(crate) fn generate_indexes(ast: &DeriveInput) -> Result<TokenStream> {
    let mut uniques: Vec<String> = vec![];
    let mut indexes: Vec<String> = vec![];

    for attr in &ast.attrs {
        if attr.path().is_ident("indexes") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("unique") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    uniques.push(s.value());
                    Ok(())
                } else if meta.path.is_ident("index") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    indexes.push(s.value());
                    Ok(())
                } else {
                    Err(meta.error("Unknown indexes attribute, expected `unique` or `index`"))
                }
            })?;
        }
    }

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let gen = quote! {
        impl #impl_generics docrepo::repository::Indexes for #name #ty_generics #where_clause {
            fn uniques(&self) -> Vec<String> {
                vec![#(#uniques.to_string()),*]
            }

            fn indexes(&self) -> Vec<String> {
                vec![#(#indexes.to_string()),*]
            }
        }
    };

    Ok(TokenStream::from(gen))
}
