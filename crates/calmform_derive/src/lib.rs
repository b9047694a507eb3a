use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, LitStr, parse_macro_input};

/// Generates one zero-sized lens per named field plus a `<Model>Fields`
/// accessor, so forms can address fields without stringly-typed paths.
///
/// Field attributes:
/// - `#[form(skip)]` keeps the field out of the form entirely.
/// - `#[form(key = "...")]` overrides the field key (defaults to the field name).
#[proc_macro_derive(FormModel, attributes(form))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

struct FieldAttrs {
    skip: bool,
    key: Option<LitStr>,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormModel derive supports only non-generic structs",
        ));
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            ));
        }
    };

    let calmform = calmform_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut keys = Vec::new();

    for field in named_fields {
        let attrs = field_attrs(&field)?;
        if attrs.skip {
            continue;
        }
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let key = attrs
            .key
            .map(|lit| lit.value())
            .unwrap_or_else(|| field_ident.to_string());
        let lens_ident = format_ident!(
            "{model_ident}{}Lens",
            to_pascal_case(&field_ident.to_string())
        );

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #calmform::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #calmform::form::FieldKey {
                    #calmform::form::FieldKey::new(#key)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });
        keys.push(quote!(#calmform::form::FieldKey::new(#key)));
    }

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            pub const KEYS: &'static [#calmform::form::FieldKey] = &[#(#keys),*];

            #(#fields_methods)*
        }

        impl #calmform::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn field_keys() -> ::std::vec::Vec<#calmform::form::FieldKey> {
                #fields_struct_ident::KEYS.to_vec()
            }
        }

        #(#lens_defs)*
    })
}

fn field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs {
        skip: false,
        key: None,
    };
    for attr in &field.attrs {
        if !attr.path().is_ident("form") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
                Ok(())
            } else if meta.path.is_ident("key") {
                attrs.key = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported form attribute, expected `skip` or `key`"))
            }
        })?;
    }
    Ok(attrs)
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmform),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
