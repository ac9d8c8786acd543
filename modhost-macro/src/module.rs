use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, Expr, ItemStruct, LitBool,
    LitStr, Path, Token,
};

struct DependencyItem {
    attrs: Vec<Attribute>,
    path: Path,
}

impl Parse for DependencyItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path = input.parse()?;
        Ok(DependencyItem { attrs, path })
    }
}

#[derive(Default)]
struct ModuleArgs {
    dependencies: Vec<DependencyItem>,
    name: Option<LitStr>,
    description: Option<LitStr>,
    priority: Option<Expr>,
    load_on_demand: bool,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;

            if name == "load_on_demand" {
                // Bare flag, or `load_on_demand = true|false`
                if input.peek(Token![=]) {
                    input.parse::<Token![=]>()?;
                    let value: LitBool = input.parse()?;
                    args.load_on_demand = value.value;
                } else {
                    args.load_on_demand = true;
                }
            } else {
                input.parse::<Token![=]>()?;

                if name == "dependencies" {
                    // Parse array: [Module1, Module2, ...]
                    let content;
                    syn::bracketed!(content in input);
                    let items = content.parse_terminated(DependencyItem::parse, Token![,])?;
                    args.dependencies = items.into_iter().collect();
                } else if name == "name" {
                    args.name = Some(input.parse()?);
                } else if name == "description" {
                    args.description = Some(input.parse()?);
                } else if name == "priority" {
                    args.priority = Some(input.parse()?);
                } else {
                    return Err(syn::Error::new(
                        name.span(),
                        format!(
                            "unknown module argument `{}`; expected one of \
                             dependencies, name, description, priority, load_on_demand",
                            name
                        ),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let expanded = generate_module_impl(&args, &input);

    TokenStream::from(expanded)
}

fn generate_module_impl(args: &ModuleArgs, input: &ItemStruct) -> TokenStream2 {
    let module_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let name = args.name.as_ref().map(|name| {
        quote! { metadata = metadata.with_name(#name); }
    });

    let description = args.description.as_ref().map(|description| {
        quote! { metadata = metadata.with_description(#description); }
    });

    let priority = args.priority.as_ref().map(|priority| {
        quote! { metadata = metadata.with_priority(#priority); }
    });

    let load_on_demand = args.load_on_demand;

    // Dependencies keep declaration order
    let dependency_declarations = args.dependencies.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            let metadata = metadata.depends_on::<#path>();
        }
    });

    quote! {
        #input

        impl #impl_generics ::modhost::ModuleDefinition for #module_name #ty_generics #where_clause {
            fn metadata() -> ::modhost::ModuleMetadata {
                let mut metadata = ::modhost::ModuleMetadata::for_type::<Self>();
                #name
                #description
                #priority
                metadata = metadata.on_demand(#load_on_demand);
                #(#dependency_declarations)*
                metadata
            }

            fn create() -> Self {
                <Self as ::core::default::Default>::default()
            }
        }
    }
}
