use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, spanned::Spanned};

#[derive(Default)]
struct FieldAttrs {
    default: Option<LitStr>,
    nested: bool,
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("ignite") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                out.default = Some(meta.value()?.parse::<LitStr>()?);
            } else if meta.path.is_ident("nested") {
                out.nested = true;
            } else {
                return Err(meta.error("unknown `ignite` field attribute, expected `default` or `nested`"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

pub fn derive(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "Defaults can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            input.span(),
            "Defaults requires named fields",
        ));
    };

    let mut stmts = Vec::new();
    for field in &named.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        let ident = field.ident.as_ref().expect("named field");
        let field_name = ident.to_string();

        if attrs.nested && attrs.default.is_some() {
            return Err(syn::Error::new(
                ident.span(),
                "a field cannot be both `nested` and carry a `default`",
            ));
        }

        if attrs.nested {
            stmts.push(quote! {
                ::ignite_config::defaults::ApplyDefaults::apply_defaults(&mut self.#ident)?;
            });
        } else if let Some(tag) = attrs.default {
            stmts.push(quote! {
                if ::ignite_config::defaults::IsZeroValue::is_zero_value(&self.#ident) {
                    self.#ident = ::ignite_config::defaults::ParseDefault::parse_default(
                        #tag, #field_name,
                    )?;
                }
            });
        }
    }

    Ok(quote! {
        impl ::ignite_config::defaults::ApplyDefaults for #name {
            fn apply_defaults(&mut self) -> ::std::result::Result<(), ::ignite_config::error::ConfigError> {
                #(#stmts)*
                Ok(())
            }
        }
    })
}
