mod target;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;

/// One entry of `#[multiversion(...)]`, written as `"level"` or
/// `"level:feature:feature"`. A leading `@` refers to a hand-written
/// specialization named `<function>_<level>` instead of compiling the body.
struct Version {
    level: &'static target::Level,
    extra: Vec<String>,
    suffix: String,
    handwritten: bool,
}

impl Parse for Version {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let handwritten = input.peek(syn::Token![@]);
        if handwritten {
            let _: syn::Token![@] = input.parse()?;
        }
        let literal: syn::LitStr = input.parse()?;
        let value = literal.value();
        let mut parts = value.split(':');
        let name = parts.next().unwrap_or_default();
        let level = target::find(name);
        let extra = parts.map(str::to_string).collect::<Vec<_>>();
        let suffix = value.replace([':', '.'], "_");
        Ok(Self {
            level,
            extra,
            suffix,
            handwritten,
        })
    }
}

struct Versions(Punctuated<Version, syn::Token![,]>);

impl Parse for Versions {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self(Punctuated::parse_terminated(input)?))
    }
}

fn argument_names(sig: &syn::Signature) -> Vec<syn::Ident> {
    sig.inputs
        .iter()
        .map(|input| match input {
            syn::FnArg::Typed(typed) => match &*typed.pat {
                syn::Pat::Ident(pat) => pat.ident.clone(),
                _ => panic!("patterns on parameters are not supported"),
            },
            syn::FnArg::Receiver(_) => panic!("receiver parameters are not supported"),
        })
        .collect()
}

fn check_signature(sig: &syn::Signature) {
    if sig.constness.is_some() {
        panic!("const functions are not supported");
    }
    if sig.asyncness.is_some() {
        panic!("async functions are not supported");
    }
    if sig.variadic.is_some() {
        panic!("variadic parameters are not supported");
    }
    if sig
        .generics
        .params
        .iter()
        .any(|param| !matches!(param, syn::GenericParam::Lifetime(_)))
    {
        panic!("generic parameters are not supported");
    }
}

/// Compiles the function body once per listed CPU level plus a portable
/// fallback, and dispatches to the best one detected at runtime. The
/// selection is cached after the first call.
#[proc_macro_attribute]
pub fn multiversion(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let versions = syn::parse_macro_input!(attr as Versions).0;
    let syn::ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = syn::parse::<syn::ItemFn>(item).expect("not a function item");
    check_signature(&sig);
    let base = sig.ident.to_string();
    let params = sig.generics.params.clone();
    let where_clause = sig.generics.where_clause.clone();
    let inputs = sig.inputs.clone();
    let output = sig.output.clone();
    let arguments = argument_names(&sig);
    let mut specialized = TokenStream::new();
    let mut dispatch = TokenStream::new();
    for version in versions {
        let ident = syn::Ident::new(
            &format!("{base}_{}", version.suffix),
            Span::mixed_site(),
        );
        let arch = version.level.arch;
        let level = version.level.name;
        let extra = &version.extra;
        if !version.handwritten {
            specialized.extend(quote! {
                #[inline]
                #[cfg(target_arch = #arch)]
                #[crate::target_cpu(enable = #level)]
                #(#[target_feature(enable = #extra)])*
                fn #ident < #params > (#inputs) #output #where_clause #block
            });
        }
        dispatch.extend(quote! {
            #[cfg(target_arch = #arch)]
            if crate::is_cpu_detected!(#level) #(&& crate::is_feature_detected!(#extra))* {
                let selected: unsafe fn(#inputs) #output = #ident;
                SELECTED.store(selected as *mut (), core::sync::atomic::Ordering::Relaxed);
                return unsafe { selected(#(#arguments,)*) };
            }
        });
    }
    quote! {
        #specialized
        fn fallback < #params > (#inputs) #output #where_clause #block
        #[inline(always)]
        #(#attrs)* #vis #sig {
            static SELECTED: core::sync::atomic::AtomicPtr<()> =
                core::sync::atomic::AtomicPtr::new(core::ptr::null_mut());
            let cached = SELECTED.load(core::sync::atomic::Ordering::Relaxed);
            if !cached.is_null() {
                let selected = unsafe {
                    core::mem::transmute::<*mut (), unsafe fn(#inputs) #output>(cached)
                };
                return unsafe { selected(#(#arguments,)*) };
            }
            #dispatch
            let selected: unsafe fn(#inputs) #output = fallback;
            SELECTED.store(selected as *mut (), core::sync::atomic::Ordering::Relaxed);
            unsafe { selected(#(#arguments,)*) }
        }
    }
    .into()
}

struct Enable(String);

impl Parse for Enable {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let _: syn::Ident = input.parse()?;
        let _: syn::Token![=] = input.parse()?;
        let value: syn::LitStr = input.parse()?;
        Ok(Self(value.value()))
    }
}

/// Expands `#[target_cpu(enable = "v3")]` into the target features of that
/// level.
#[proc_macro_attribute]
pub fn target_cpu(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let Enable(enable) = syn::parse_macro_input!(attr as Enable);
    let mut result = TokenStream::new();
    for name in enable.split(',') {
        let features = target::find(name).features;
        result.extend(quote! {
            #(#[target_feature(enable = #features)])*
        });
    }
    result.extend(TokenStream::from(item));
    result.into()
}

/// Defines `is_<arch>_cpu_detected!("level")`, forwarding to
/// `$crate::internal::is_<level>_detected()`.
#[proc_macro]
pub fn define_is_cpu_detected(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let arch = syn::parse_macro_input!(input as syn::LitStr).value();
    let arms = target::LEVELS
        .iter()
        .filter(|level| level.arch == arch)
        .map(|level| {
            let name = level.name;
            let detect = syn::Ident::new(&format!("is_{name}_detected"), Span::mixed_site());
            quote! { (#name) => { $crate::internal::#detect() }; }
        });
    let ident = syn::Ident::new(&format!("is_{arch}_cpu_detected"), Span::mixed_site());
    quote! {
        #[macro_export]
        macro_rules! #ident {
            #(#arms)*
        }
    }
    .into()
}
