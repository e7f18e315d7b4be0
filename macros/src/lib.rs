use proc_macro::TokenStream;
use quote::quote;
use syn::{Ident, ItemFn, LitStr, parse_macro_input, spanned::Spanned};

/// Test attribute for the rxbus test suite.
///
/// - `#[rxbus_macro::test]` on a sync fn expands to `#[test]`.
/// - On an async fn it expands to `#[tokio::test]`; `local` selects the
///   current-thread runtime and `shared` the multi-thread one.
///
/// Every test installs a `tracing` subscriber writing through the test
/// harness, filtered by `RUST_LOG`, so runtime logs show up next to failing
/// assertions.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let tokio_args = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else {
    if !is_async {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "rxbus_macro::test flavor args are only supported for async tests. Use \
           #[rxbus_macro::test] for sync tests, or make the function async.",
        )
        .to_compile_error(),
      );
    }

    let flavor = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      (ident.to_string(), ident.span())
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      (lit.value(), lit.span())
    } else {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "rxbus_macro::test only accepts: #[rxbus_macro::test], #[rxbus_macro::test(local)], \
           #[rxbus_macro::test(shared)], or string equivalents",
        )
        .to_compile_error(),
      );
    };

    match flavor.0.as_str() {
      "local" => quote!(flavor = "current_thread"),
      "shared" => quote!(flavor = "multi_thread"),
      _ => {
        return TokenStream::from(
          syn::Error::new(flavor.1, "rxbus_macro::test only accepts: local or shared")
            .to_compile_error(),
        );
      }
    }
  };

  let native_attr = if is_async { quote!(tokio::test(#tokio_args)) } else { quote!(test) };

  let ItemFn { attrs, vis, sig, block } = input;
  let expanded = quote! {
      #[#native_attr]
      #(#attrs)*
      #vis #sig {
        let _ = ::tracing_subscriber::fmt()
          .with_env_filter(::tracing_subscriber::EnvFilter::from_default_env())
          .with_test_writer()
          .try_init();
        #block
      }
  };

  TokenStream::from(expanded)
}
