mod target;

use proc_macro2::{Span, TokenStream};
use quote::quote;

struct MultiversionVersion {
    target: syn::LitStr,
    import: bool,
}

impl syn::parse::Parse for MultiversionVersion {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let import = if input.peek(syn::Token![@]) {
            let _: syn::Token![@] = input.parse()?;
            true
        } else {
            false
        };
        let target: syn::LitStr = input.parse()?;
        Ok(Self { target, import })
    }
}

struct Multiversion {
    versions: syn::punctuated::Punctuated<MultiversionVersion, syn::Token![,]>,
}

impl syn::parse::Parse for Multiversion {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        Ok(Multiversion {
            versions: syn::punctuated::Punctuated::parse_terminated(input)?,
        })
    }
}

/// Splits `"v4:avx512vnni"` into the target cpu and the additional target features.
fn split_version(lit: &syn::LitStr) -> syn::Result<(&'static target::TargetCpu, Vec<String>)> {
    let value = lit.value();
    let mut parts = value.split(':');
    let head = parts.next().unwrap_or_default();
    let Some(target_cpu) = target::find(head) else {
        return Err(syn::Error::new_spanned(
            lit,
            format!("unknown target_cpu `{head}`"),
        ));
    };
    Ok((target_cpu, parts.map(str::to_string).collect()))
}

fn check_signature(sig: &syn::Signature) -> syn::Result<Vec<syn::PatIdent>> {
    if let Some(constness) = sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "const functions are not supported",
        ));
    }
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "async functions are not supported",
        ));
    }
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new_spanned(
            variadic,
            "variadic parameters are not supported",
        ));
    }
    for param in sig.generics.params.iter() {
        if !matches!(param, syn::GenericParam::Lifetime(_)) {
            return Err(syn::Error::new_spanned(
                param,
                "generic parameters are not supported",
            ));
        }
    }
    let mut arguments = Vec::new();
    for input in sig.inputs.iter() {
        match input {
            syn::FnArg::Typed(typed) => match &*typed.pat {
                syn::Pat::Ident(ident) => arguments.push(ident.clone()),
                pat => {
                    return Err(syn::Error::new_spanned(
                        pat,
                        "patterns on parameters are not supported",
                    ));
                }
            },
            syn::FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "receiver parameters are not supported",
                ));
            }
        }
    }
    Ok(arguments)
}

fn expand_multiversion(attr: Multiversion, item_fn: syn::ItemFn) -> syn::Result<TokenStream> {
    let syn::ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = item_fn;
    let arguments = check_signature(&sig)?;
    let name = sig.ident.to_string();
    let generics_params = &sig.generics.params;
    let generics_where = &sig.generics.where_clause;
    let inputs = &sig.inputs;
    let output = &sig.output;
    let mut versions = quote! {};
    let mut branches = quote! {};
    for version in attr.versions.iter() {
        let (target_cpu, additional_target_features) = split_version(&version.target)?;
        let ident = syn::Ident::new(
            &format!(
                "{name}_{}",
                version.target.value().replace([':', '.'], "_")
            ),
            Span::mixed_site(),
        );
        let target_arch = target_cpu.target_arch;
        let target_cpu = target_cpu.target_cpu;
        if !version.import {
            versions.extend(quote! {
                #[inline]
                #[cfg(target_arch = #target_arch)]
                #[crate::target_cpu(enable = #target_cpu)]
                #(#[target_feature(enable = #additional_target_features)])*
                fn #ident < #generics_params > (#inputs) #output #generics_where #block
            });
        }
        branches.extend(quote! {
            #[cfg(target_arch = #target_arch)]
            if crate::is_cpu_detected!(#target_cpu) #(&& crate::is_feature_detected!(#additional_target_features))* {
                let _multiversion_internal: unsafe fn(#inputs) #output = #ident;
                CACHE.store(_multiversion_internal as *mut (), core::sync::atomic::Ordering::Relaxed);
                return unsafe { _multiversion_internal(#(#arguments,)*) };
            }
        });
    }
    Ok(quote! {
        #versions
        fn fallback < #generics_params > (#inputs) #output #generics_where #block
        #[inline(always)]
        #(#attrs)* #vis #sig {
            static CACHE: core::sync::atomic::AtomicPtr<()> = core::sync::atomic::AtomicPtr::new(core::ptr::null_mut());
            let cache = CACHE.load(core::sync::atomic::Ordering::Relaxed);
            if !cache.is_null() {
                let f = unsafe { core::mem::transmute::<*mut (), unsafe fn(#inputs) #output>(cache) };
                return unsafe { f(#(#arguments,)*) };
            }
            #branches
            let _multiversion_internal: unsafe fn(#inputs) #output = fallback;
            CACHE.store(_multiversion_internal as *mut (), core::sync::atomic::Ordering::Relaxed);
            unsafe { _multiversion_internal(#(#arguments,)*) }
        }
    })
}

/// Compiles a function once per listed target cpu and dispatches at runtime.
///
/// A target written as `@"v3"` means the module already defines `name_v3` by hand;
/// a bare `"v3"` recompiles the body of the annotated function with the features
/// of `v3` enabled. The body itself is always kept as `fallback`. The first call
/// detects the cpu and caches the chosen function pointer.
#[proc_macro_attribute]
pub fn multiversion(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = syn::parse_macro_input!(attr as Multiversion);
    let item_fn = syn::parse_macro_input!(item as syn::ItemFn);
    expand_multiversion(attr, item_fn)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct TargetCpu {
    enable: syn::LitStr,
}

impl syn::parse::Parse for TargetCpu {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let key: syn::Ident = input.parse()?;
        if key != "enable" {
            return Err(syn::Error::new_spanned(key, "expected `enable`"));
        }
        let _: syn::Token![=] = input.parse()?;
        let enable: syn::LitStr = input.parse()?;
        Ok(Self { enable })
    }
}

#[proc_macro_attribute]
pub fn target_cpu(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = syn::parse_macro_input!(attr as TargetCpu);
    let mut result = quote! {};
    for s in attr.enable.value().split(',') {
        let Some(target_cpu) = target::find(s) else {
            return syn::Error::new_spanned(&attr.enable, format!("unknown target_cpu `{s}`"))
                .into_compile_error()
                .into();
        };
        let target_features = target_cpu.target_features;
        result.extend(quote!(
            #(#[target_feature(enable = #target_features)])*
        ));
    }
    result.extend(TokenStream::from(item));
    result.into()
}

#[proc_macro]
pub fn define_is_cpu_detected(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let target_arch = syn::parse_macro_input!(input as syn::LitStr).value();
    let mut arms = quote! {};
    for target_cpu in target::TARGET_CPUS {
        if target_cpu.target_arch != target_arch {
            continue;
        }
        let target_cpu = target_cpu.target_cpu;
        let ident = syn::Ident::new(
            &format!("is_{}_detected", target_cpu.replace('.', "_")),
            Span::mixed_site(),
        );
        arms.extend(quote! {
            (#target_cpu) => { $crate::internal::#ident() };
        });
    }
    let ident = syn::Ident::new(
        &format!("is_{target_arch}_cpu_detected"),
        Span::mixed_site(),
    );
    quote! {
        #[macro_export]
        macro_rules! #ident {
            #arms
        }
    }
    .into()
}

/// Raises the visibility of a function or module to `pub`.
#[proc_macro_attribute]
pub fn public(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "`public` takes no arguments")
            .into_compile_error()
            .into();
    }
    let mut item = syn::parse_macro_input!(item as syn::Item);
    match &mut item {
        syn::Item::Fn(item_fn) => item_fn.vis = syn::parse_quote!(pub),
        syn::Item::Mod(item_mod) => item_mod.vis = syn::parse_quote!(pub),
        _ => {
            return syn::Error::new_spanned(&item, "expected a function or a module")
                .into_compile_error()
                .into();
        }
    }
    quote!(#item).into()
}
